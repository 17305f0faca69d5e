//! Record framing.
//!
//! The wire unit is a record: a sealed 4-byte header followed by a sealed
//! payload, each carrying its own AEAD tag.
//!
//! Header format (before sealing):
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ 32-bit big-endian word                       │
//! │   high 24 bits: payload length N             │
//! │   low 8 bits:   command                      │
//! └──────────────────────────────────────────────┘
//! ```

use crate::error::{Error, Result};

/// Length of the plaintext record header in bytes.
pub const HEADER_LEN: usize = 4;

/// Maximum payload length encodable in the 24-bit length field.
pub const MAX_PAYLOAD: usize = (1 << 24) - 1;

/// Record commands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Application data
    Data = 0,
    /// Server proposes fresh keys: payload is its new public key and salt
    StartRekey = 1,
    /// Client answers with its own new public key
    ClientKeyUpdate = 2,
    /// Server commits the new keys: empty payload
    FinalizeRekey = 3,
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Command::Data),
            1 => Ok(Command::StartRekey),
            2 => Ok(Command::ClientKeyUpdate),
            3 => Ok(Command::FinalizeRekey),
            _ => Err(Error::protocol(format!("unknown command {value}"))),
        }
    }
}

/// A decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// The record command.
    pub command: Command,
    /// Payload byte length, excluding the AEAD tag.
    pub len: usize,
}

impl Header {
    /// Pack the header into its 4-byte wire form.
    ///
    /// # Panics
    ///
    /// Panics if the length exceeds [`MAX_PAYLOAD`]: a truncated header
    /// word must never reach the wire.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        assert!(
            self.len <= MAX_PAYLOAD,
            "record payload exceeds the 24-bit length field"
        );
        ((self.len as u32) << 8 | self.command as u32).to_be_bytes()
    }

    /// Unpack a 4-byte wire header.
    ///
    /// Fails with [`Error::Protocol`] on an unknown command value.
    pub fn decode(bytes: [u8; HEADER_LEN]) -> Result<Self> {
        let word = u32::from_be_bytes(bytes);
        let command = Command::try_from((word & 0xff) as u8)?;
        Ok(Self {
            command,
            len: (word >> 8) as usize,
        })
    }
}
