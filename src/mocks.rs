//! In-memory test doubles.
//!
//! [`duplex`] builds a pair of connected [`Pipe`] carriers backed by two
//! unbounded byte queues, giving tests and benchmarks a loopback transport
//! with TCP-like semantics: reads block until data or end of stream, writes
//! never block.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::carrier::Carrier;

#[derive(Default)]
struct Queue {
    buf: VecDeque<u8>,
    closed: bool,
}

#[derive(Default)]
struct Channel {
    queue: Mutex<Queue>,
    readable: Condvar,
}

impl Channel {
    fn push(&self, bytes: &[u8]) -> io::Result<usize> {
        let mut queue = self.queue.lock();
        if queue.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        queue.buf.extend(bytes);
        self.readable.notify_one();
        Ok(bytes.len())
    }

    fn pop(&self, dest: &mut [u8]) -> io::Result<usize> {
        let mut queue = self.queue.lock();
        while queue.buf.is_empty() && !queue.closed {
            self.readable.wait(&mut queue);
        }
        if queue.buf.is_empty() {
            return Ok(0);
        }
        let n = dest.len().min(queue.buf.len());
        for slot in dest[..n].iter_mut() {
            *slot = queue.buf.pop_front().expect("queue has n bytes");
        }
        Ok(n)
    }

    fn close(&self) {
        self.queue.lock().closed = true;
        self.readable.notify_all();
    }
}

/// One endpoint of an in-memory duplex connection.
pub struct Pipe {
    incoming: Arc<Channel>,
    outgoing: Arc<Channel>,
}

/// Create a connected pair of in-memory carriers.
///
/// Bytes sent on either endpoint become readable on the other, in order.
pub fn duplex() -> (Pipe, Pipe) {
    let a_to_b = Arc::new(Channel::default());
    let b_to_a = Arc::new(Channel::default());
    (
        Pipe {
            incoming: b_to_a.clone(),
            outgoing: a_to_b.clone(),
        },
        Pipe {
            incoming: a_to_b,
            outgoing: b_to_a,
        },
    )
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.incoming.close();
        self.outgoing.close();
    }
}

impl Carrier for Pipe {
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.incoming.pop(buf)
    }

    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        self.outgoing.push(buf)
    }

    fn shutdown(&self) -> io::Result<()> {
        self.incoming.close();
        self.outgoing.close();
        Ok(())
    }
}
