//! The in-band rekey state machine.
//!
//! Four messages, all sent as ordinary records on whatever keys are current
//! when they are emitted:
//!
//! 1. `StartRekey` (server → client): fresh server public key + fresh salt.
//! 2. `ClientKeyUpdate` (client → server): fresh client public key. The
//!    client switches its write half immediately after sending.
//! 3. `FinalizeRekey` (server → client, empty): sent on the old write half
//!    after the server has switched its read half; the server then switches
//!    its write half and commits.
//! 4. On receiving the finalize, the client switches its read half and
//!    commits.
//!
//! Each side switches its write half right after the rekey message it emits
//! and its read half right after the rekey message it consumes, so every
//! record is sealed and opened under matched keys despite old- and new-key
//! records overlapping on the wire. A replaced half starts its nonce counter
//! back at zero.

use std::time::Instant;

use tracing::debug;

use super::{Conn, ReadState, Session, WriteState};
use crate::carrier::Carrier;
use crate::crypto::{
    derive_record_keys, Half, Keypair, PublicKey, RecordKey, SecureRandom, SharedSecret,
    PUBLIC_KEY_SIZE, SALT_SIZE,
};
use crate::error::{Error, Result};
use crate::record::Command;

/// In-flight rekey state. Which variant is live encodes the protocol phase.
pub(super) enum Rekey {
    /// Server side: keys proposed, awaiting the client's public key.
    Proposed {
        keypair: Keypair,
        salt: [u8; SALT_SIZE],
    },
    /// Client side: reply sent and write half already switched; the read
    /// half switches when the server finalizes.
    Responded {
        keypair: Keypair,
        peer_public: PublicKey,
        shared: SharedSecret,
        read_key: RecordKey,
    },
}

impl<C: Carrier> Conn<C> {
    /// Propose fresh session keys. Server-only, invoked from the write path
    /// with the write lock held; also reseeds the budget and deadline.
    pub(super) fn start_rekey(&self, writer: &mut WriteState) -> Result<()> {
        writer.budget = self.config.rekey_after_bytes as i64;
        writer.deadline = Instant::now() + self.config.key_validity;

        let keypair = Keypair::generate()?;
        let salt = SecureRandom::bytes::<SALT_SIZE>()?;

        let mut payload = [0u8; PUBLIC_KEY_SIZE + SALT_SIZE];
        payload[..PUBLIC_KEY_SIZE].copy_from_slice(keypair.public.as_bytes());
        payload[PUBLIC_KEY_SIZE..].copy_from_slice(&salt);

        self.send_record(writer, Command::StartRekey, &payload)?;
        writer.rekey = Some(Rekey::Proposed { keypair, salt });

        debug!("rekey proposed");
        Ok(())
    }

    /// Client side of message 1: answer with a fresh public key, then
    /// switch the write half to the new keys.
    pub(super) fn handle_start_rekey(&self, reader: &mut ReadState, len: usize) -> Result<()> {
        if self.server {
            return Err(Error::protocol("rekey proposal received by server"));
        }

        let payload = self.read_payload(reader, len)?;
        if payload.len() != PUBLIC_KEY_SIZE + SALT_SIZE {
            return Err(Error::BadRekey);
        }
        let peer_public = PublicKey::from_bytes(
            payload[..PUBLIC_KEY_SIZE]
                .try_into()
                .expect("split is 32 bytes"),
        );
        let salt: [u8; SALT_SIZE] = payload[PUBLIC_KEY_SIZE..]
            .try_into()
            .expect("split is 16 bytes");

        let mut writer = self.writer.lock();
        if writer.rekey.is_some() {
            return Err(Error::protocol("rekey already in flight"));
        }

        let keypair = Keypair::generate()?;
        self.send_record(&mut writer, Command::ClientKeyUpdate, keypair.public.as_bytes())?;

        // The reply above was the last record sealed by the old write half.
        let shared = keypair.secret.diffie_hellman(&peer_public);
        let (k0, k1) = derive_record_keys(&shared, &salt)?;
        writer.half = Some(Half::new(&k0)?);
        writer.rekey = Some(Rekey::Responded {
            keypair,
            peer_public,
            shared,
            read_key: k1,
        });

        Ok(())
    }

    /// Server side of message 2: derive the new keys, switch the read half,
    /// finalize on the old write half, switch it, and commit.
    pub(super) fn handle_client_key_update(&self, reader: &mut ReadState, len: usize) -> Result<()> {
        if !self.server {
            return Err(Error::protocol("key update received by client"));
        }

        let payload = self.read_payload(reader, len)?;
        if payload.len() != PUBLIC_KEY_SIZE {
            return Err(Error::BadRekey);
        }
        let peer_public =
            PublicKey::from_bytes(payload.as_slice().try_into().expect("payload is 32 bytes"));

        let mut writer = self.writer.lock();
        let Some(Rekey::Proposed { keypair, salt }) = writer.rekey.take() else {
            return Err(Error::protocol("key update without a rekey proposal"));
        };

        let shared = keypair.secret.diffie_hellman(&peer_public);
        let (k0, k1) = derive_record_keys(&shared, &salt)?;

        reader.half = Some(Half::new(&k0)?);
        self.send_record(&mut writer, Command::FinalizeRekey, &[])?;
        writer.half = Some(Half::new(&k1)?);
        writer.session = Some(Session {
            keypair,
            peer_public,
            shared,
        });

        debug!("rekey committed");
        Ok(())
    }

    /// Client side of message 3: switch the read half and commit.
    pub(super) fn handle_finalize_rekey(&self, reader: &mut ReadState, len: usize) -> Result<()> {
        if self.server {
            return Err(Error::protocol("rekey finalize received by server"));
        }

        let payload = self.read_payload(reader, len)?;
        if !payload.is_empty() {
            return Err(Error::BadRekey);
        }

        let mut writer = self.writer.lock();
        let Some(Rekey::Responded {
            keypair,
            peer_public,
            shared,
            read_key,
        }) = writer.rekey.take()
        else {
            return Err(Error::protocol("rekey finalize without a response"));
        };

        reader.half = Some(Half::new(&read_key)?);
        writer.session = Some(Session {
            keypair,
            peer_public,
            shared,
        });

        debug!("rekey committed");
        Ok(())
    }
}
