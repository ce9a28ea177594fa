use std::net::SocketAddr;

use tinymsg_frame::{FrameError, Message};

/// Identity of one connection, stable for the connection's lifetime and
/// never reused while it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub usize);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Why a connection was removed.
#[derive(Debug)]
pub enum DisconnectReason {
    /// The peer closed its end of the stream.
    PeerClosed,
    /// A socket-level failure.
    IoError(std::io::Error),
    /// Bad signature, unknown message number, or body-length mismatch.
    /// Never resynchronized: there is no safe way to find the next frame
    /// boundary in an unstructured byte stream.
    ProtocolViolation(FrameError),
    /// The server is shutting down and draining connections.
    ServerShutdown,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::PeerClosed => write!(f, "peer closed"),
            DisconnectReason::IoError(err) => write!(f, "I/O error: {err}"),
            DisconnectReason::ProtocolViolation(err) => write!(f, "protocol violation: {err}"),
            DisconnectReason::ServerShutdown => write!(f, "server shutdown"),
        }
    }
}

/// The application boundary.
///
/// The server hands every fully decoded message here, in arrival order per
/// connection, and never interprets message content beyond framing. There
/// is no cross-connection ordering guarantee.
pub trait MessageSink {
    /// A new connection was accepted.
    fn on_connect(&mut self, _id: ConnId, _peer: SocketAddr) {}

    /// A complete frame was decoded on `id`.
    ///
    /// Returning `Some(reply)` queues the reply frame for transmission back
    /// to the originating connection.
    fn on_message(&mut self, id: ConnId, message: Message) -> Option<Message>;

    /// The connection was removed.
    fn on_disconnect(&mut self, _id: ConnId, _reason: &DisconnectReason) {}
}
