use tinymsg_transport::TransportError;

/// Errors that can take down the whole server loop.
///
/// Per-connection failures never surface here; they close one connection
/// and are reported through [`crate::DisconnectReason`].
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Listener setup failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The poll registry or readiness wait failed.
    #[error("event loop I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
