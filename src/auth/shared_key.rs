//! Shared-key authentication.
//!
//! Both sides hold the same pre-shared key. The sender transmits its session
//! auth token together with an HMAC-SHA256 of the token under the key; the
//! verifier checks that the token matches its own view of the session before
//! checking the proof, so a relayed handshake fails even with the right key.

use bytes::BytesMut;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{get_field, put_field, Error, MessageConnection, Result};

type HmacSha256 = Hmac<Sha256>;

struct SignedShared {
    token: Vec<u8>,
    signature: Vec<u8>,
}

impl SignedShared {
    fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        put_field(&mut buf, &self.token);
        put_field(&mut buf, &self.signature);
        buf.to_vec()
    }

    fn decode(msg: &[u8]) -> Result<Self> {
        let mut slice = msg;
        let token = get_field(&mut slice)?;
        let signature = get_field(&mut slice)?;
        if !slice.is_empty() {
            return Err(Error::Malformed("trailing bytes"));
        }
        Ok(Self { token, signature })
    }
}

fn prove(key: &[u8], token: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(token);
    mac
}

/// Prove our identity to the peer with the pre-shared `key`.
pub fn send_shared_key(conn: &impl MessageConnection, key: &[u8]) -> Result<()> {
    let token = conn.auth_token()?;
    let signature = prove(key, &token).finalize().into_bytes().to_vec();

    let msg = SignedShared {
        token: token.to_vec(),
        signature,
    }
    .encode();
    conn.send_message(&msg)?;
    Ok(())
}

/// Verify the peer's identity against the pre-shared `key`.
///
/// Fails with [`Error::WrongToken`] if the presented token does not match
/// this session, or [`Error::InvalidSignature`] if the HMAC does not verify.
pub fn verify_shared_key(conn: &impl MessageConnection, key: &[u8]) -> Result<()> {
    let msg = conn.get_message()?;
    let signed = SignedShared::decode(&msg)?;

    if signed.token.as_slice() != conn.peer_auth_token()? {
        return Err(Error::WrongToken);
    }

    prove(key, &signed.token)
        .verify_slice(&signed.signature)
        .map_err(|_| Error::InvalidSignature)
}
