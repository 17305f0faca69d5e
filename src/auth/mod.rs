//! Message-level peer authentication.
//!
//! The transport handshake is deliberately unauthenticated: it establishes a
//! private channel with *somebody*. The schemes here prove who that somebody
//! is by exchanging session auth tokens under long-term key material, over
//! the connection's own message layer:
//!
//! - [`send_shared_key`]/[`verify_shared_key`]: both sides hold a
//!   pre-shared key; the token travels with an HMAC over it.
//! - [`send_signed_token`]/[`verify_signed_token`]: the sender signs its
//!   token with a long-term Ed25519 key that the verifier resolves through
//!   a [`KeyProvider`].
//!
//! Either way, a man-in-the-middle on the handshake presents a token that
//! does not match the verifier's view of the session and is rejected.
//!
//! Wire messages use a fixed length-prefixed encoding: each field is a
//! 32-bit big-endian length followed by the raw bytes, in struct order.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

use crate::carrier::Carrier;
use crate::crypto::TOKEN_SIZE;
use crate::Conn;

mod key_file;
mod shared_key;
mod signed;

pub use key_file::KeyFile;
pub use shared_key::{send_shared_key, verify_shared_key};
pub use signed::{send_signed_token, verify_signed_token, KeyProvider};

#[cfg(test)]
pub(crate) mod mock;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the authentication schemes.
#[derive(Error, Debug)]
pub enum Error {
    /// The presented token does not match this side's view of the session
    #[error("wrong token")]
    WrongToken,

    /// The token's proof (HMAC or signature) failed to verify
    #[error("invalid signature")]
    InvalidSignature,

    /// A wire message could not be decoded
    #[error("malformed auth message: {0}")]
    Malformed(&'static str),

    /// Long-term key material could not be parsed
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Long-term key material could not be loaded
    #[error("key storage error: {0}")]
    KeyStorage(#[from] std::io::Error),

    /// The underlying connection failed
    #[error(transparent)]
    Conn(#[from] crate::Error),
}

/// A connection able to move whole messages and expose session auth tokens.
///
/// [`Conn`] implements this; tests substitute queue-backed doubles.
pub trait MessageConnection {
    /// Send one length-delimited message.
    fn send_message(&self, msg: &[u8]) -> crate::Result<()>;

    /// Receive one length-delimited message.
    fn get_message(&self) -> crate::Result<Vec<u8>>;

    /// This side's session auth token.
    fn auth_token(&self) -> crate::Result<[u8; TOKEN_SIZE]>;

    /// The peer's session auth token.
    fn peer_auth_token(&self) -> crate::Result<[u8; TOKEN_SIZE]>;
}

impl<C: Carrier> MessageConnection for Conn<C> {
    fn send_message(&self, msg: &[u8]) -> crate::Result<()> {
        Conn::send_message(self, msg)
    }

    fn get_message(&self) -> crate::Result<Vec<u8>> {
        Conn::get_message(self)
    }

    fn auth_token(&self) -> crate::Result<[u8; TOKEN_SIZE]> {
        Conn::auth_token(self)
    }

    fn peer_auth_token(&self) -> crate::Result<[u8; TOKEN_SIZE]> {
        Conn::peer_auth_token(self)
    }
}

pub(crate) fn put_field(buf: &mut BytesMut, field: &[u8]) {
    buf.put_u32(field.len() as u32);
    buf.put_slice(field);
}

pub(crate) fn get_field(buf: &mut &[u8]) -> Result<Vec<u8>> {
    if buf.remaining() < 4 {
        return Err(Error::Malformed("truncated field length"));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(Error::Malformed("truncated field"));
    }
    let mut field = vec![0u8; len];
    buf.copy_to_slice(&mut field);
    Ok(field)
}
