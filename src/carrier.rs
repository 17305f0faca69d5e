//! The carrier seam.
//!
//! A carrier is any reliable, ordered, bidirectional byte stream with the
//! semantics of a TCP socket. The overlay only moves bytes across it and
//! propagates its errors. Methods take a shared reference so that one
//! reader and one writer can drive the same carrier concurrently; a
//! blocking `recv` must not prevent a concurrent `send`.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use crate::error::{Error, Result};

/// A reliable, ordered, duplex byte transport.
pub trait Carrier {
    /// Read up to `buf.len()` bytes, blocking until at least one byte is
    /// available. Returns 0 only at end of stream.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write up to `buf.len()` bytes, returning how many were accepted.
    fn send(&self, buf: &[u8]) -> io::Result<usize>;

    /// Close both directions, unblocking any pending I/O.
    fn shutdown(&self) -> io::Result<()>;
}

impl Carrier for TcpStream {
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&mut &*self).read(buf)
    }

    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        (&mut &*self).write(buf)
    }

    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Read exactly `buf.len()` bytes from the carrier.
///
/// A premature end of stream fails with [`Error::ShortRead`].
pub(crate) fn read_full<C: Carrier + ?Sized>(carrier: &C, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match carrier.recv(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::ShortRead {
                    expected: buf.len(),
                    actual: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(())
}

/// Write all of `buf` to the carrier.
///
/// A carrier refusing to make progress fails with [`Error::ShortWrite`].
pub(crate) fn write_full<C: Carrier + ?Sized>(carrier: &C, buf: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < buf.len() {
        match carrier.send(&buf[written..]) {
            Ok(0) => {
                return Err(Error::ShortWrite {
                    expected: buf.len(),
                    actual: written,
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks;

    #[test]
    fn test_read_full_assembles_partial_reads() {
        let (a, b) = mocks::duplex();
        a.send(b"he").unwrap();
        a.send(b"llo").unwrap();

        let mut buf = [0u8; 5];
        read_full(&b, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_read_full_reports_truncation() {
        let (a, b) = mocks::duplex();
        a.send(b"hel").unwrap();
        a.shutdown().unwrap();

        let mut buf = [0u8; 5];
        let err = read_full(&b, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            Error::ShortRead {
                expected: 5,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_write_full_round_trip() {
        let (a, b) = mocks::duplex();
        write_full(&a, b"framed bytes").unwrap();

        let mut buf = [0u8; 12];
        read_full(&b, &mut buf).unwrap();
        assert_eq!(&buf, b"framed bytes");
    }
}
