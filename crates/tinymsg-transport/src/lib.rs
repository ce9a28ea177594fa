//! Byte accumulation and non-blocking socket I/O primitives.
//!
//! This is the lowest layer of tinymsg. It provides:
//! - [`Accumulator`]: a growable owned byte buffer with prefix consumption
//!   and a drain cursor, backing both inbound frame reassembly and pending
//!   outbound writes.
//! - [`sock`]: cumulative partial recv/send over non-blocking streams with
//!   tagged outcomes (`WouldBlock` is flow control, not an error).
//! - [`tcp`]: listener and connector setup.
//!
//! Everything above this layer assumes readiness-driven scheduling: no call
//! here ever blocks on a non-blocking descriptor.

pub mod accumulator;
pub mod error;
pub mod sock;
pub mod tcp;

pub use accumulator::Accumulator;
pub use error::{Result, TransportError};
pub use sock::{recv_into, send_from, RecvStatus, SendStatus};
pub use tcp::{bind_listener, connect};
