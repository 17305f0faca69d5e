//! The secured connection.
//!
//! A [`Conn`] wraps a carrier and presents the same byte-stream shape back
//! to the caller: `write` splits application bytes into sealed records,
//! `read` opens records and hands plaintext back, buffering any excess. The
//! server periodically renegotiates the session keys in-band; a small
//! length-delimited message layer on top of the stream carries the
//! peer-authentication schemes in [`crate::auth`].
//!
//! One reader and one writer may drive the connection concurrently. The
//! write lock covers the emission of a whole record; the read path re-enters
//! it only to answer rekey messages. Callers must serialize reads
//! themselves.

use std::time::Instant;

use bytes::{Buf, BytesMut};
use parking_lot::Mutex;
use tracing::debug;

use crate::carrier::{read_full, write_full, Carrier};
use crate::crypto::{
    auth_token, derive_record_keys, Half, Keypair, PublicKey, SecureRandom, SharedSecret,
    PUBLIC_KEY_SIZE, SALT_SIZE, TAG_SIZE, TOKEN_SIZE,
};
use crate::error::{Error, Result};
use crate::record::{Command, Header, HEADER_LEN, MAX_PAYLOAD};
use crate::Config;

mod rekey;

use rekey::Rekey;

/// Session key material, established by the handshake and replaced
/// atomically on rekey.
struct Session {
    keypair: Keypair,
    peer_public: PublicKey,
    shared: SharedSecret,
}

struct ReadState {
    half: Option<Half>,
    /// Plaintext from a record that exceeded the caller's buffer, drained
    /// FIFO before the next record is consumed.
    overflow: BytesMut,
}

struct WriteState {
    half: Option<Half>,
    session: Option<Session>,
    /// In-flight rekey, at most one at a time.
    rekey: Option<Rekey>,
    /// Bytes remaining before the server proposes fresh keys.
    budget: i64,
    /// Deadline after which the server proposes fresh keys.
    deadline: Instant,
}

/// A secured connection over a carrier.
///
/// Created blank with [`Conn::new`]; [`Conn::negotiate`] performs the key
/// exchange and must complete before any I/O. [`Conn::client`] and
/// [`Conn::server`] combine the two steps.
pub struct Conn<C> {
    carrier: C,
    config: Config,
    server: bool,
    reader: Mutex<ReadState>,
    writer: Mutex<WriteState>,
}

impl<C: Carrier> Conn<C> {
    /// Create a connection with the default [`Config`].
    ///
    /// [`Conn::negotiate`] must be called before the connection can be used.
    pub fn new(carrier: C) -> Self {
        Self::with_config(carrier, Config::default())
    }

    /// Create a connection with an explicit [`Config`].
    ///
    /// # Panics
    ///
    /// Panics if `config.write_buffer_size` is zero or exceeds the record
    /// length field ([`crate::record::MAX_PAYLOAD`]).
    pub fn with_config(carrier: C, config: Config) -> Self {
        assert!(
            config.write_buffer_size > 0,
            "write buffer must hold at least one byte"
        );
        assert!(
            config.write_buffer_size <= MAX_PAYLOAD,
            "write buffer exceeds the record length field"
        );
        Self {
            carrier,
            config,
            server: false,
            reader: Mutex::new(ReadState {
                half: None,
                overflow: BytesMut::new(),
            }),
            writer: Mutex::new(WriteState {
                half: None,
                session: None,
                rekey: None,
                budget: 0,
                deadline: Instant::now(),
            }),
        }
    }

    /// Create a connection and negotiate as the client.
    pub fn client(carrier: C) -> Result<Self> {
        let mut conn = Self::new(carrier);
        conn.negotiate(false)?;
        Ok(conn)
    }

    /// Create a connection and negotiate as the server.
    pub fn server(carrier: C) -> Result<Self> {
        let mut conn = Self::new(carrier);
        conn.negotiate(true)?;
        Ok(conn)
    }

    /// Exchange keys with the peer and set up record protection.
    ///
    /// Both sides send a length-prefixed ephemeral public key; the client
    /// additionally sends the session salt. The exchange is deliberately
    /// unauthenticated: pair it with one of the [`crate::auth`] schemes to
    /// detect an interposed peer.
    pub fn negotiate(&mut self, server: bool) -> Result<()> {
        self.server = server;

        let keypair = Keypair::generate()?;

        let mut hello = [0u8; 4 + PUBLIC_KEY_SIZE];
        hello[..4].copy_from_slice(&(PUBLIC_KEY_SIZE as u32).to_be_bytes());
        hello[4..].copy_from_slice(keypair.public.as_bytes());
        write_full(&self.carrier, &hello)?;

        let mut len_buf = [0u8; 4];
        read_full(&self.carrier, &mut len_buf)?;
        if u32::from_be_bytes(len_buf) as usize != PUBLIC_KEY_SIZE {
            return Err(Error::protocol("unexpected public key length"));
        }
        let mut peer_bytes = [0u8; PUBLIC_KEY_SIZE];
        read_full(&self.carrier, &mut peer_bytes)?;
        let peer_public = PublicKey::from_bytes(peer_bytes);

        let shared = keypair.secret.diffie_hellman(&peer_public);

        // The client draws the salt and sends it; the salt doubles as the
        // HKDF salt for the key schedule.
        let salt: [u8; SALT_SIZE] = if server {
            read_full(&self.carrier, &mut len_buf)?;
            if u32::from_be_bytes(len_buf) as usize != SALT_SIZE {
                return Err(Error::protocol("unexpected salt length"));
            }
            let mut salt = [0u8; SALT_SIZE];
            read_full(&self.carrier, &mut salt)?;
            salt
        } else {
            let salt = SecureRandom::bytes::<SALT_SIZE>()?;
            let mut msg = [0u8; 4 + SALT_SIZE];
            msg[..4].copy_from_slice(&(SALT_SIZE as u32).to_be_bytes());
            msg[4..].copy_from_slice(&salt);
            write_full(&self.carrier, &msg)?;
            salt
        };

        let (k0, k1) = derive_record_keys(&shared, &salt)?;
        let (write_key, read_key) = if server { (k1, k0) } else { (k0, k1) };

        let reader = self.reader.get_mut();
        reader.half = Some(Half::new(&read_key)?);
        reader.overflow.clear();

        let writer = self.writer.get_mut();
        writer.half = Some(Half::new(&write_key)?);
        writer.session = Some(Session {
            keypair,
            peer_public,
            shared,
        });
        writer.rekey = None;
        writer.budget = self.config.rekey_after_bytes as i64;
        writer.deadline = Instant::now() + self.config.key_validity;

        debug!(
            role = if server { "server" } else { "client" },
            "session negotiated"
        );

        Ok(())
    }

    /// Write data, transparently sealing it into records.
    ///
    /// Length-preserving: returns `buf.len()` on success. The data is split
    /// into records of at most [`Config::write_buffer_size`] payload bytes.
    /// On the server this is also where the rekey budget is spent and, once
    /// exhausted, where a rekey is proposed.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut writer = self.writer.lock();

        if self.server && writer.rekey.is_none() {
            if writer.budget <= 0 || Instant::now() >= writer.deadline {
                self.start_rekey(&mut writer)?;
            } else {
                writer.budget -= buf.len() as i64;
            }
        }

        for chunk in buf.chunks(self.config.write_buffer_size) {
            self.send_record(&mut writer, Command::Data, chunk)?;
        }

        Ok(buf.len())
    }

    /// Read up to `buf.len()` bytes of plaintext.
    ///
    /// Drains buffered plaintext first, then consumes the next record from
    /// the carrier. Rekey records are handled in-band and never surface to
    /// the caller.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut reader = self.reader.lock();
        loop {
            if !reader.overflow.is_empty() {
                let n = buf.len().min(reader.overflow.len());
                buf[..n].copy_from_slice(&reader.overflow[..n]);
                reader.overflow.advance(n);
                return Ok(n);
            }

            let header = self.read_header(&mut reader)?;
            match header.command {
                Command::Data => {
                    if header.len == 0 {
                        return Err(Error::protocol("empty data record"));
                    }
                    let plain = self.read_payload(&mut reader, header.len)?;
                    let n = buf.len().min(plain.len());
                    buf[..n].copy_from_slice(&plain[..n]);
                    if n < plain.len() {
                        reader.overflow.extend_from_slice(&plain[n..]);
                    }
                    return Ok(n);
                }
                Command::StartRekey => self.handle_start_rekey(&mut reader, header.len)?,
                Command::ClientKeyUpdate => {
                    self.handle_client_key_update(&mut reader, header.len)?
                }
                Command::FinalizeRekey => self.handle_finalize_rekey(&mut reader, header.len)?,
            }
        }
    }

    /// Send one message: a 4-byte big-endian length followed by the bytes,
    /// all through the sealed stream.
    pub fn send_message(&self, msg: &[u8]) -> Result<()> {
        let len = u32::try_from(msg.len()).map_err(|_| Error::protocol("message too large"))?;
        self.write(&len.to_be_bytes())?;
        self.write(msg)?;
        Ok(())
    }

    /// Receive one message sent with [`Conn::send_message`].
    pub fn get_message(&self) -> Result<Vec<u8>> {
        let mut len_buf = [0u8; 4];
        self.read_exact_plain(&mut len_buf)?;

        let mut msg = vec![0u8; u32::from_be_bytes(len_buf) as usize];
        self.read_exact_plain(&mut msg)?;
        Ok(msg)
    }

    /// The auth token for this side: HMAC-SHA256 of our public key under
    /// the shared secret.
    ///
    /// Compare against the peer's [`Conn::peer_auth_token`] over a
    /// trust-anchored channel to detect a man-in-the-middle on the
    /// handshake.
    pub fn auth_token(&self) -> Result<[u8; TOKEN_SIZE]> {
        let writer = self.writer.lock();
        let session = writer
            .session
            .as_ref()
            .ok_or_else(|| Error::protocol("connection not negotiated"))?;
        Ok(auth_token(&session.shared, &session.keypair.public))
    }

    /// The auth token of the peer: HMAC-SHA256 of its public key under the
    /// shared secret.
    pub fn peer_auth_token(&self) -> Result<[u8; TOKEN_SIZE]> {
        let writer = self.writer.lock();
        let session = writer
            .session
            .as_ref()
            .ok_or_else(|| Error::protocol("connection not negotiated"))?;
        Ok(auth_token(&session.shared, &session.peer_public))
    }

    /// Exhaust the rekey budget so the next server write proposes fresh
    /// keys.
    pub fn rekey_next(&self) {
        self.writer.lock().budget = 0;
    }

    /// Close the carrier, unblocking any pending I/O.
    pub fn close(&self) -> Result<()> {
        self.carrier.shutdown().map_err(Error::Io)
    }

    /// Seal and emit one record: header first, then payload, each advancing
    /// the write nonce once. Callers hold the write lock.
    fn send_record(&self, writer: &mut WriteState, command: Command, payload: &[u8]) -> Result<()> {
        let half = writer
            .half
            .as_mut()
            .ok_or_else(|| Error::protocol("connection not negotiated"))?;

        let header = Header {
            command,
            len: payload.len(),
        }
        .encode();

        let sealed_header = half.seal(&header)?;
        write_full(&self.carrier, &sealed_header)?;

        let sealed_payload = half.seal(payload)?;
        write_full(&self.carrier, &sealed_payload)?;
        Ok(())
    }

    /// Consume and open the next record header.
    fn read_header(&self, reader: &mut ReadState) -> Result<Header> {
        let mut sealed = [0u8; HEADER_LEN + TAG_SIZE];
        read_full(&self.carrier, &mut sealed)?;

        let half = reader
            .half
            .as_mut()
            .ok_or_else(|| Error::protocol("connection not negotiated"))?;
        let plain = match half.open(&sealed) {
            Ok(plain) => plain,
            Err(_) => {
                reader.overflow.clear();
                return Err(Error::BadHeader);
            }
        };

        Header::decode(plain.as_slice().try_into().map_err(|_| Error::BadHeader)?)
    }

    /// Consume and open a record payload of `len` plaintext bytes.
    fn read_payload(&self, reader: &mut ReadState, len: usize) -> Result<Vec<u8>> {
        let mut sealed = vec![0u8; len + TAG_SIZE];
        read_full(&self.carrier, &mut sealed)?;

        let half = reader
            .half
            .as_mut()
            .ok_or_else(|| Error::protocol("connection not negotiated"))?;
        match half.open(&sealed) {
            Ok(plain) => Ok(plain),
            Err(err) => {
                // Drop staged plaintext so nothing unauthenticated leaks out.
                reader.overflow.clear();
                Err(err)
            }
        }
    }

    fn read_exact_plain(&self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            filled += self.read(&mut buf[filled..])?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn shared_secret_bytes(&self) -> Option<[u8; 32]> {
        self.writer
            .lock()
            .session
            .as_ref()
            .map(|session| *session.shared.as_bytes())
    }

    #[cfg(test)]
    pub(crate) fn rekey_in_flight(&self) -> bool {
        self.writer.lock().rekey.is_some()
    }

    #[cfg(test)]
    pub(crate) fn overflow_len(&self) -> usize {
        self.reader.lock().overflow.len()
    }
}
