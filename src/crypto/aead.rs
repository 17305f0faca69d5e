//! AEAD half-context: one direction's cipher and nonce counter.
//!
//! A connection holds two of these, one per direction. Each half owns an
//! AES-128-GCM instance and an ever-increasing counter nonce; the sender's
//! write half and the receiver's read half are keyed identically and advance
//! their counters in lockstep, one increment per sealed or opened record
//! fragment.

use aes_gcm::{
    aead::{Aead as AeadTrait, KeyInit},
    Aes128Gcm,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{NONCE_SIZE, RECORD_KEY_SIZE};
use crate::error::{Error, Result};

/// A 16-byte AES-128 record subkey. Zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RecordKey([u8; RECORD_KEY_SIZE]);

impl RecordKey {
    /// Create a record key from raw bytes.
    pub fn from_bytes(bytes: [u8; RECORD_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw key bytes. Secret material; handle with care.
    pub fn as_bytes(&self) -> &[u8; RECORD_KEY_SIZE] {
        &self.0
    }
}

/// A counter nonce.
///
/// Starts at all zeros and increments as a little-endian big-integer: byte 0
/// first, each byte wrapping from 255 to 0 and carrying into the next. The
/// counter is never set externally; a fresh key always starts a fresh
/// counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Get the raw nonce bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    /// Advance the counter by one.
    pub fn increment(&mut self) {
        for byte in self.0.iter_mut() {
            *byte = byte.wrapping_add(1);
            if *byte != 0 {
                break;
            }
        }
    }
}

/// One direction's cipher context.
pub struct Half {
    cipher: Aes128Gcm,
    nonce: Nonce,
}

impl Half {
    /// Construct a half-context from a record subkey.
    ///
    /// The nonce counter starts at zero; replacing a half (as rekey does)
    /// therefore resets its counter.
    pub fn new(key: &RecordKey) -> Result<Self> {
        let cipher = Aes128Gcm::new_from_slice(key.as_bytes()).map_err(|_| Error::CryptoInit)?;
        Ok(Self {
            cipher,
            nonce: Nonce::default(),
        })
    }

    /// Seal a plaintext, returning ciphertext with the tag appended.
    ///
    /// No associated data is used. The nonce counter advances by one.
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let sealed = self
            .cipher
            .encrypt(self.nonce.as_bytes().into(), plaintext)
            .map_err(|_| Error::CryptoInit)?;
        self.nonce.increment();
        Ok(sealed)
    }

    /// Open a sealed buffer, returning the plaintext.
    ///
    /// Fails with [`Error::BadMac`] if the tag does not verify; the counter
    /// advances only on success.
    pub fn open(&mut self, sealed: &[u8]) -> Result<Vec<u8>> {
        let plaintext = self
            .cipher
            .decrypt(self.nonce.as_bytes().into(), sealed)
            .map_err(|_| Error::BadMac)?;
        self.nonce.increment();
        Ok(plaintext)
    }

    #[cfg(test)]
    pub(crate) fn nonce(&self) -> Nonce {
        self.nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::TAG_SIZE;

    fn test_key() -> RecordKey {
        RecordKey::from_bytes([
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0x0f,
        ])
    }

    #[test]
    fn test_seal_open_round_trip() {
        let mut writer = Half::new(&test_key()).unwrap();
        let mut reader = Half::new(&test_key()).unwrap();

        let sealed = writer.seal(b"attack at dawn").unwrap();
        assert_eq!(sealed.len(), b"attack at dawn".len() + TAG_SIZE);

        let opened = reader.open(&sealed).unwrap();
        assert_eq!(opened, b"attack at dawn");
    }

    #[test]
    fn test_counters_advance_in_lockstep() {
        let mut writer = Half::new(&test_key()).unwrap();
        let mut reader = Half::new(&test_key()).unwrap();

        for i in 0..300u32 {
            let msg = i.to_be_bytes();
            let sealed = writer.seal(&msg).unwrap();
            assert_eq!(reader.open(&sealed).unwrap(), msg);
            assert_eq!(writer.nonce(), reader.nonce());
        }
    }

    #[test]
    fn test_empty_plaintext() {
        let mut writer = Half::new(&test_key()).unwrap();
        let mut reader = Half::new(&test_key()).unwrap();

        let sealed = writer.seal(b"").unwrap();
        assert_eq!(sealed.len(), TAG_SIZE);
        assert!(reader.open(&sealed).unwrap().is_empty());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut writer = Half::new(&test_key()).unwrap();
        let mut reader = Half::new(&test_key()).unwrap();

        let mut sealed = writer.seal(b"secret data").unwrap();
        sealed[3] ^= 0x01;

        assert!(matches!(reader.open(&sealed), Err(Error::BadMac)));
    }

    #[test]
    fn test_tampered_tag_fails() {
        let mut writer = Half::new(&test_key()).unwrap();
        let mut reader = Half::new(&test_key()).unwrap();

        let mut sealed = writer.seal(b"secret data").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x80;

        assert!(matches!(reader.open(&sealed), Err(Error::BadMac)));
    }

    #[test]
    fn test_wrong_key_fails() {
        let mut writer = Half::new(&test_key()).unwrap();
        let mut reader = Half::new(&RecordKey::from_bytes([0x42u8; RECORD_KEY_SIZE])).unwrap();

        let sealed = writer.seal(b"secret data").unwrap();
        assert!(matches!(reader.open(&sealed), Err(Error::BadMac)));
    }

    #[test]
    fn test_failed_open_does_not_advance_counter() {
        let mut writer = Half::new(&test_key()).unwrap();
        let mut reader = Half::new(&test_key()).unwrap();

        let mut tampered = writer.seal(b"first").unwrap();
        tampered[0] ^= 0xff;
        assert!(reader.open(&tampered).is_err());

        // The reader is still positioned to open a clean re-send of record 0
        let mut writer2 = Half::new(&test_key()).unwrap();
        let sealed = writer2.seal(b"first").unwrap();
        assert_eq!(reader.open(&sealed).unwrap(), b"first");
    }

    #[test]
    fn test_nonce_increment_little_endian_carry() {
        let mut nonce = Nonce::default();
        nonce.increment();
        assert_eq!(nonce.as_bytes()[0], 1);

        // Force the low byte to wrap and carry
        let mut nonce = Nonce::default();
        for _ in 0..=255 {
            nonce.increment();
        }
        assert_eq!(nonce.as_bytes()[0], 0);
        assert_eq!(nonce.as_bytes()[1], 1);

        // Second byte carries into the third
        let mut nonce = Nonce::default();
        for _ in 0..(256 * 256) {
            nonce.increment();
        }
        assert_eq!(nonce.as_bytes()[0], 0);
        assert_eq!(nonce.as_bytes()[1], 0);
        assert_eq!(nonce.as_bytes()[2], 1);
    }

    #[test]
    fn test_nonce_sequence_is_distinct() {
        let mut nonce = Nonce::default();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(*nonce.as_bytes()));
            nonce.increment();
        }
    }
}
