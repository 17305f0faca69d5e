//! File-backed key provider.

use std::path::PathBuf;

use ed25519_dalek::VerifyingKey;

use super::{Error, KeyProvider, Result};
use crate::crypto::PUBLIC_KEY_SIZE;

/// A [`KeyProvider`] backed by a file holding one raw 32-byte Ed25519
/// verifying key. The key identifier is ignored; whatever the file holds is
/// the trusted key.
pub struct KeyFile {
    path: PathBuf,
}

impl KeyFile {
    /// Create a provider reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyProvider for KeyFile {
    fn key(&self, _id: &str) -> Result<VerifyingKey> {
        let data = std::fs::read(&self.path)?;
        let bytes: [u8; PUBLIC_KEY_SIZE] = data.as_slice().try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "expected {PUBLIC_KEY_SIZE} bytes, got {}",
                data.len()
            ))
        })?;
        VerifyingKey::from_bytes(&bytes).map_err(|e| Error::InvalidKey(e.to_string()))
    }
}
