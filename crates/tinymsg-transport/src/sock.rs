//! Cumulative partial recv/send over non-blocking streams.
//!
//! In a readiness-driven loop a socket must never be read or written with a
//! blocking call, and every operation must tolerate "some bytes now, more
//! later". These primitives loop internally, retry transparently on
//! `Interrupted`, and report `WouldBlock` as a tagged outcome so the caller
//! can suspend and resume at any byte boundary without losing data.
//!
//! The functions are generic over [`Read`]/[`Write`] so the partial-I/O
//! paths can be exercised with scripted in-memory streams; production
//! callers pass `mio::net::TcpStream`.

use std::io::{ErrorKind, Read, Write};

use tracing::trace;

use crate::accumulator::Accumulator;

/// Bytes read from the socket per syscall.
const READ_CHUNK: usize = 8 * 1024;

/// Outcome of [`recv_into`].
#[derive(Debug, PartialEq, Eq)]
pub enum RecvStatus {
    /// `max_bytes` new bytes were appended; the socket may hold more.
    Progress(usize),
    /// The socket has no more data right now. `received` bytes (possibly 0)
    /// were appended before it blocked. Normal flow control, not an error.
    WouldBlock { received: usize },
    /// The peer closed its end. `received` bytes were appended first.
    EndOfStream { received: usize },
}

/// Outcome of [`send_from`].
#[derive(Debug, PartialEq, Eq)]
pub enum SendStatus {
    /// Every pending byte was written; the buffer has been cleared.
    Flushed { sent: usize },
    /// The socket cannot take more right now; `sent` bytes were written and
    /// the drain cursor advanced past them.
    WouldBlock { sent: usize },
    /// The peer's end is gone (zero-length write or broken pipe).
    Closed,
}

/// Read up to `max_bytes` new bytes from `stream`, appending each chunk to
/// `acc`.
///
/// Stops when `max_bytes` have been read, the socket would block, the peer
/// closed, or a hard error occurs. Hard errors surface as `Err`; everything
/// else is a [`RecvStatus`].
pub fn recv_into<R: Read>(
    stream: &mut R,
    acc: &mut Accumulator,
    max_bytes: usize,
) -> std::io::Result<RecvStatus> {
    let mut chunk = [0u8; READ_CHUNK];
    let mut received = 0usize;

    while received < max_bytes {
        let want = (max_bytes - received).min(READ_CHUNK);
        match stream.read(&mut chunk[..want]) {
            Ok(0) => {
                trace!(received, "recv: end of stream");
                return Ok(RecvStatus::EndOfStream { received });
            }
            Ok(n) => {
                acc.append(&chunk[..n]);
                received += n;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                trace!(received, "recv: would block");
                return Ok(RecvStatus::WouldBlock { received });
            }
            Err(err) => return Err(err),
        }
    }

    trace!(received, "recv: progress");
    Ok(RecvStatus::Progress(received))
}

/// Write pending bytes from `acc` (drain cursor onward) into `stream`.
///
/// Advances the cursor past each successful partial write. On full drain the
/// buffer is cleared. Writing to a closed peer reports [`SendStatus::Closed`]
/// rather than aborting the process; the Rust runtime already ignores
/// SIGPIPE, so a dead peer surfaces as `BrokenPipe` here.
pub fn send_from<W: Write>(stream: &mut W, acc: &mut Accumulator) -> std::io::Result<SendStatus> {
    let mut sent = 0usize;

    while !acc.is_drained() {
        match stream.write(acc.pending()) {
            Ok(0) => return Ok(SendStatus::Closed),
            Ok(n) => {
                acc.advance(n);
                sent += n;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                trace!(sent, pending = acc.pending().len(), "send: would block");
                return Ok(SendStatus::WouldBlock { sent });
            }
            Err(err)
                if err.kind() == ErrorKind::BrokenPipe
                    || err.kind() == ErrorKind::ConnectionReset =>
            {
                trace!(sent, "send: peer gone");
                return Ok(SendStatus::Closed);
            }
            Err(err) => return Err(err),
        }
    }

    acc.clear();
    trace!(sent, "send: flushed");
    Ok(SendStatus::Flushed { sent })
}
