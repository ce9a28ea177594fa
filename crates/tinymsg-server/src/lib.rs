//! Readiness-driven connection multiplexer and frame reassembly.
//!
//! One thread, one [`mio::Poll`], many connections. The server blocks only
//! in the readiness wait; every socket is non-blocking, and a connection
//! whose bytes run out mid-frame simply suspends its parse state until the
//! next readiness notification.
//!
//! - [`FrameAssembler`]: the per-connection AwaitHeader/AwaitBody state
//!   machine that turns partial reads into complete typed messages.
//! - [`Server`]: the event loop owning the listener and the connection set.
//! - [`MessageSink`]: the application boundary decoded messages are handed
//!   to, keyed by connection identity.
//!
//! Per-connection errors are contained: a misbehaving client is logged and
//! disconnected, never letting it affect other connections or the process.

pub mod conn;
pub mod error;
pub mod server;
pub mod sink;

pub use conn::{Connection, DriveOutcome, FrameAssembler};
pub use error::{Result, ServerError};
pub use server::{Server, ShutdownHandle};
pub use sink::{ConnId, DisconnectReason, MessageSink};
