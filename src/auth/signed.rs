//! Signed-token authentication.
//!
//! The sender signs its session auth token with a long-term Ed25519 key and
//! transmits the token, a key identifier, and the signature. The verifier
//! checks the token against its own view of the session, resolves the
//! verifying key through a [`KeyProvider`], and verifies the signature.

use bytes::BytesMut;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use super::{get_field, put_field, Error, MessageConnection, Result};

/// Resolves long-term Ed25519 verifying keys by identifier.
pub trait KeyProvider {
    /// Look up the verifying key registered under `id`.
    fn key(&self, id: &str) -> Result<VerifyingKey>;
}

struct SignedToken {
    token: Vec<u8>,
    key_id: String,
    signature: Vec<u8>,
}

impl SignedToken {
    fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        put_field(&mut buf, &self.token);
        put_field(&mut buf, self.key_id.as_bytes());
        put_field(&mut buf, &self.signature);
        buf.to_vec()
    }

    fn decode(msg: &[u8]) -> Result<Self> {
        let mut slice = msg;
        let token = get_field(&mut slice)?;
        let key_id = String::from_utf8(get_field(&mut slice)?)
            .map_err(|_| Error::Malformed("key id is not utf-8"))?;
        let signature = get_field(&mut slice)?;
        if !slice.is_empty() {
            return Err(Error::Malformed("trailing bytes"));
        }
        Ok(Self {
            token,
            key_id,
            signature,
        })
    }
}

/// Prove our identity by signing the session token with `key`, labelled
/// `id` for the verifier's key lookup.
pub fn send_signed_token(conn: &impl MessageConnection, id: &str, key: &SigningKey) -> Result<()> {
    let token = conn.auth_token()?;
    let signature = key.sign(&token);

    let msg = SignedToken {
        token: token.to_vec(),
        key_id: id.to_string(),
        signature: signature.to_bytes().to_vec(),
    }
    .encode();
    conn.send_message(&msg)?;
    Ok(())
}

/// Verify the peer's identity against the keys known to `keys`.
///
/// Fails with [`Error::WrongToken`] if the presented token does not match
/// this session, or [`Error::InvalidSignature`] if the signature does not
/// verify under the resolved key.
pub fn verify_signed_token(conn: &impl MessageConnection, keys: &impl KeyProvider) -> Result<()> {
    let msg = conn.get_message()?;
    let signed = SignedToken::decode(&msg)?;

    if signed.token.as_slice() != conn.peer_auth_token()? {
        return Err(Error::WrongToken);
    }

    let key = keys.key(&signed.key_id)?;
    let signature = Signature::from_bytes(
        signed
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| Error::Malformed("signature length"))?,
    );

    key.verify(&signed.token, &signature)
        .map_err(|_| Error::InvalidSignature)
}
