//! Error types for the stream overlay.

use thiserror::Error;

/// Result type alias for overlay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur on a secured connection.
///
/// Every variant is fatal to the session: the connection is left in an
/// inconsistent state and must not be reused after an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Carrier-originated I/O failure, propagated verbatim
    #[error("carrier error: {0}")]
    Io(#[from] std::io::Error),

    /// The carrier delivered fewer bytes than a length field demanded
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes the length field demanded
        expected: usize,
        /// Bytes the carrier delivered
        actual: usize,
    },

    /// The carrier accepted fewer bytes than were handed to it
    #[error("short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        /// Bytes handed to the carrier
        expected: usize,
        /// Bytes the carrier accepted
        actual: usize,
    },

    /// AEAD construction refused a key or nonce shape
    #[error("cipher initialization failed")]
    CryptoInit,

    /// A record payload failed authentication
    #[error("bad mac detected")]
    BadMac,

    /// A record header failed authentication
    #[error("bad record header")]
    BadHeader,

    /// Unknown command value or a record arrived in an unexpected state
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A rekey message payload had the wrong length
    #[error("error in rekey processing")]
    BadRekey,

    /// The system RNG failed to yield the requested bytes
    #[error("random source failure")]
    RandomSource,
}

impl Error {
    /// Create a new protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }
}
