//! Secure random number generation.
//!
//! Wraps the operating system's entropy source. All failures surface as
//! [`Error::RandomSource`]; the overlay never falls back to a weaker
//! generator.

use rand_core::RngCore;

use crate::error::{Error, Result};

/// Cryptographically secure random number generator.
pub struct SecureRandom;

impl SecureRandom {
    /// Fill a buffer with cryptographically secure random bytes.
    pub fn fill(dest: &mut [u8]) -> Result<()> {
        rand::rngs::OsRng
            .try_fill_bytes(dest)
            .map_err(|_| Error::RandomSource)
    }

    /// Generate a fixed-size array of random bytes.
    pub fn bytes<const N: usize>() -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        Self::fill(&mut buf)?;
        Ok(buf)
    }
}
