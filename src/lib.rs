//! # secstream
//!
//! A framed, authenticated-encrypted byte-stream overlay for any reliable
//! in-order duplex transport. Two endpoints perform an unauthenticated
//! X25519 exchange at session start, derive directional AES-128-GCM keys,
//! and from then on every application byte crosses the carrier sealed inside
//! a record. The server rotates the session keys in-band on a byte-count or
//! time budget, invisibly to the caller.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application (byte stream / length-delimited messages)  │
//! ├─────────────────────────────────────────────────────────┤
//! │  Peer authentication (shared-key / signed auth tokens)  │
//! ├─────────────────────────────────────────────────────────┤
//! │  Connection (handshake, records, in-band rekey)         │
//! ├─────────────────────────────────────────────────────────┤
//! │  Crypto layer (X25519, AES-128-GCM, HKDF-SHA512)        │
//! ├─────────────────────────────────────────────────────────┤
//! │  Carrier (TCP socket or any ordered duplex transport)   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The handshake proves nothing about who the peer is; it only establishes
//! a private channel. The [`auth`] schemes close that gap by exchanging
//! session auth tokens under long-term keys.
//!
//! ## Example
//!
//! ```
//! use secstream::{mocks, Conn};
//!
//! let (client_pipe, server_pipe) = mocks::duplex();
//! let server = std::thread::spawn(move || Conn::server(server_pipe).unwrap());
//! let client = Conn::client(client_pipe).unwrap();
//! let server = server.join().unwrap();
//!
//! server.write(b"hello").unwrap();
//! let mut buf = [0u8; 16];
//! let n = client.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

use std::time::Duration;

pub mod auth;
pub mod carrier;
mod conn;
pub mod crypto;
pub mod error;
pub mod mocks;
pub mod record;

pub use carrier::Carrier;
pub use conn::Conn;
pub use error::{Error, Result};

/// Default payload size of a single data record.
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 128;

/// Default byte budget the server spends before rotating keys (100 MiB).
pub const DEFAULT_REKEY_AFTER_BYTES: u64 = 100 * 1024 * 1024;

/// Default lifetime of a key set before the server rotates keys.
pub const DEFAULT_KEY_VALIDITY: Duration = Duration::from_secs(60 * 60);

/// Configuration for a secured connection.
///
/// Passed at construction; every connection carries its own copy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chunk size for the write path. A single `write` is split into
    /// records of at most this many payload bytes. Must be at least 1.
    pub write_buffer_size: usize,
    /// Bytes the server may send before it proposes fresh keys.
    pub rekey_after_bytes: u64,
    /// How long a key set stays valid before the server proposes fresh
    /// keys, whatever the byte count.
    pub key_validity: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            rekey_after_bytes: DEFAULT_REKEY_AFTER_BYTES,
            key_validity: DEFAULT_KEY_VALIDITY,
        }
    }
}
