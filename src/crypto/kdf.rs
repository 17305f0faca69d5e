//! Key schedule and auth tokens.
//!
//! The record keys come from a single HKDF-SHA512 chain: the shared secret
//! is the input keying material, the handshake salt is the HKDF salt, and
//! 32 bytes of output are split into the two directional subkeys. The client
//! writes with K0 and reads with K1; the server does the reverse. That
//! asymmetry is what keeps the two directions from ever sharing a
//! (key, nonce) pair, since both nonce counters start at zero.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use zeroize::Zeroize;

use crate::crypto::{PublicKey, RecordKey, SharedSecret, RECORD_KEY_SIZE, TOKEN_SIZE};
use crate::error::{Error, Result};

/// Derive the two directional record subkeys from a shared secret and salt.
///
/// Returns `(K0, K1)`: the first and second 16 bytes of the HKDF output.
pub fn derive_record_keys(
    shared: &SharedSecret,
    salt: &[u8],
) -> Result<(RecordKey, RecordKey)> {
    let hk = Hkdf::<Sha512>::new(Some(salt), shared.as_bytes());

    let mut okm = [0u8; RECORD_KEY_SIZE * 2];
    hk.expand(&[], &mut okm).map_err(|_| Error::CryptoInit)?;

    let k0 = RecordKey::from_bytes(okm[..RECORD_KEY_SIZE].try_into().expect("split is 16 bytes"));
    let k1 = RecordKey::from_bytes(okm[RECORD_KEY_SIZE..].try_into().expect("split is 16 bytes"));
    okm.zeroize();

    Ok((k0, k1))
}

/// Compute the auth token for a public key: HMAC-SHA256 of the key bytes
/// under the current shared secret.
///
/// Tokens are functions of the unauthenticated handshake outputs; comparing
/// them over a trust-anchored channel detects a man-in-the-middle on the
/// handshake.
pub fn auth_token(shared: &SharedSecret, public: &PublicKey) -> [u8; TOKEN_SIZE] {
    let mut mac = Hmac::<Sha256>::new_from_slice(shared.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(public.as_bytes());
    mac.finalize().into_bytes().into()
}
