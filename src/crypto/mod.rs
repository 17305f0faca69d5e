//! Cryptographic primitives for the stream overlay.
//!
//! This module provides:
//! - X25519 Diffie-Hellman key agreement
//! - AES-128-GCM record sealing with counter nonces
//! - HKDF-SHA512 key schedule
//! - Secure random number generation
//!
//! All secret material is zeroized on drop to prevent memory leakage.

mod aead;
mod kdf;
mod keys;
mod random;

pub use aead::{Half, Nonce, RecordKey};
pub use kdf::{auth_token, derive_record_keys};
pub use keys::{Keypair, PublicKey, SecretKey, SharedSecret};
pub use random::SecureRandom;

/// Size of record subkeys in bytes (AES-128).
pub const RECORD_KEY_SIZE: usize = 16;

/// Size of the AEAD nonce in bytes (96 bits for AES-GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of the AEAD authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Size of X25519 public keys in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of the handshake salt (the wire "IV") in bytes.
pub const SALT_SIZE: usize = 16;

/// Size of an auth token (HMAC-SHA256 output) in bytes.
pub const TOKEN_SIZE: usize = 32;
