//! Test doubles for the authentication schemes.

use std::collections::VecDeque;
use std::thread;

use parking_lot::Mutex;

use super::MessageConnection;
use crate::crypto::TOKEN_SIZE;
use crate::mocks::{self, Pipe};
use crate::Conn;

/// A queue-backed [`MessageConnection`] with fixed tokens.
pub(crate) struct MockMessageConnection {
    token: [u8; TOKEN_SIZE],
    peer_token: [u8; TOKEN_SIZE],
    inbox: Mutex<VecDeque<Vec<u8>>>,
    outbox: Mutex<VecDeque<Vec<u8>>>,
}

impl MockMessageConnection {
    pub fn new(token: [u8; TOKEN_SIZE], peer_token: [u8; TOKEN_SIZE]) -> Self {
        Self {
            token,
            peer_token,
            inbox: Mutex::new(VecDeque::new()),
            outbox: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a raw message for the next `get_message`.
    pub fn push_incoming(&self, msg: Vec<u8>) {
        self.inbox.lock().push_back(msg);
    }

    /// Move everything `other` has sent into our inbox.
    pub fn relay_from(&self, other: &Self) {
        let mut from = other.outbox.lock();
        let mut into = self.inbox.lock();
        into.extend(from.drain(..));
    }
}

impl MessageConnection for MockMessageConnection {
    fn send_message(&self, msg: &[u8]) -> crate::Result<()> {
        self.outbox.lock().push_back(msg.to_vec());
        Ok(())
    }

    fn get_message(&self) -> crate::Result<Vec<u8>> {
        self.inbox
            .lock()
            .pop_front()
            .ok_or_else(|| crate::Error::protocol("no message queued"))
    }

    fn auth_token(&self) -> crate::Result<[u8; TOKEN_SIZE]> {
        Ok(self.token)
    }

    fn peer_auth_token(&self) -> crate::Result<[u8; TOKEN_SIZE]> {
        Ok(self.peer_token)
    }
}

/// Two mock endpoints: `a` reports `a_token` as its own token, `b` reports
/// `b_peer_token` as its peer's. Matching values model a clean session;
/// differing values model an interposed handshake.
pub(crate) fn mock_pair(
    a_token: [u8; TOKEN_SIZE],
    b_peer_token: [u8; TOKEN_SIZE],
) -> (MockMessageConnection, MockMessageConnection) {
    (
        MockMessageConnection::new(a_token, [0u8; TOKEN_SIZE]),
        MockMessageConnection::new([0u8; TOKEN_SIZE], b_peer_token),
    )
}

/// A real client/server pair negotiated over an in-memory carrier.
pub(crate) fn negotiated_pair() -> (Conn<Pipe>, Conn<Pipe>) {
    let (client_pipe, server_pipe) = mocks::duplex();

    let server = thread::spawn(move || Conn::server(server_pipe).unwrap());
    let client = Conn::client(client_pipe).unwrap();

    (client, server.join().unwrap())
}
