use std::net::SocketAddr;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Bind a non-blocking TCP listener ready for registration with a poll
/// registry.
pub fn bind_listener(addr: SocketAddr) -> Result<mio::net::TcpListener> {
    let listener =
        mio::net::TcpListener::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
    info!(%addr, "listening");
    Ok(listener)
}

/// Connect to a tinymsg server (blocking).
///
/// Client-side I/O has no readiness loop to cooperate with, so a plain
/// blocking stream is the right tool here.
pub fn connect(addr: SocketAddr) -> Result<std::net::TcpStream> {
    let stream = std::net::TcpStream::connect(addr)
        .map_err(|source| TransportError::Connect { addr, source })?;
    debug!(%addr, "connected");
    Ok(stream)
}
