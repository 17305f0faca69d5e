//! X25519 key agreement primitives.
//!
//! Type-safe wrappers around X25519 operations with automatic zeroization
//! of secret material on drop.

use rand_core::RngCore;
use x25519_dalek::{PublicKey as DalekPublic, StaticSecret as DalekSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::PUBLIC_KEY_SIZE;
use crate::error::{Error, Result};

/// An X25519 secret key.
///
/// Retained for the lifetime of the session keys it produced (the rekey
/// protocol replaces it wholesale). Holds the raw scalar bytes directly so
/// the zeroize-on-drop is visible here rather than delegated to the dalek
/// internals; the scalar is clamped by `x25519-dalek` at use.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Create a secret key from raw bytes.
    ///
    /// The input must come from a cryptographically secure source.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Perform X25519 Diffie-Hellman key agreement with a peer's public key.
    pub fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
        let secret = DalekSecret::from(self.0);
        SharedSecret(secret.diffie_hellman(&their_public.0).to_bytes())
    }
}

impl From<&SecretKey> for PublicKey {
    fn from(secret: &SecretKey) -> Self {
        PublicKey(DalekPublic::from(&DalekSecret::from(secret.0)))
    }
}

/// An X25519 public key. Safe to share on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(DalekPublic);

impl PublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(DalekPublic::from(bytes))
    }

    /// Get the raw bytes of this public key.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.0.as_bytes()
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// The result of an X25519 key agreement.
///
/// Owned by the connection until the next rekey replaces it; feeds the key
/// schedule and the auth tokens. Zeroized when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Get the raw shared secret bytes.
    ///
    /// Feed these into the key schedule; never use them directly as a key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// A freshly generated (public, secret) pair.
pub struct Keypair {
    /// The public half, sent to the peer.
    pub public: PublicKey,
    /// The secret half, kept local.
    pub secret: SecretKey,
}

impl Keypair {
    /// Generate a new keypair from the OS entropy source.
    ///
    /// Draws 32 bytes of randomness and derives the public key by scalar
    /// base multiplication. Fails with [`Error::RandomSource`] if the RNG
    /// cannot produce the bytes.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| Error::RandomSource)?;

        let secret = SecretKey::from_bytes(bytes);
        bytes.zeroize();

        let public = PublicKey::from(&secret);
        Ok(Self { public, secret })
    }
}
