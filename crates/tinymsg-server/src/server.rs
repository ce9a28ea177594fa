use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mio::{Events, Interest, Poll, Token, Waker};
use tracing::{debug, info, warn};

use tinymsg_transport::{bind_listener, SendStatus};

use crate::conn::{Connection, DriveOutcome};
use crate::error::Result;
use crate::sink::{ConnId, DisconnectReason, MessageSink};

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CONN_TOKEN: usize = 2;

const EVENT_CAPACITY: usize = 128;

/// Default agent name written into reply frame headers.
const DEFAULT_AGENT: &str = "tinymsg-server";

/// The connection multiplexer.
///
/// Owns the listening socket and every open connection, and services them
/// all from one thread: the readiness wait is the only call that blocks.
/// Within one readiness batch connections are serviced in the order the
/// poller reports them; each service call only drains bytes currently
/// available, bounded by the socket buffer, before moving on. A client that
/// continuously refills its send buffer ahead of the scan can delay others
/// in this cooperative model — a documented limitation of the design.
pub struct Server {
    poll: Poll,
    listener: mio::net::TcpListener,
    local_addr: SocketAddr,
    conns: HashMap<Token, Connection>,
    next_token: usize,
    agent: String,
    shutdown: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

/// Cloneable handle that tells a running server to stop accepting, drain,
/// and close. Safe to call from another thread (e.g. a signal handler).
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        if let Err(err) = self.waker.wake() {
            warn!(%err, "failed to wake server for shutdown");
        }
    }
}

impl Server {
    /// Bind the listening socket and set up the poll registry.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let poll = Poll::new()?;
        let mut listener = bind_listener(addr)?;
        let local_addr = listener.local_addr()?;

        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);

        Ok(Self {
            poll,
            listener,
            local_addr,
            conns: HashMap::new(),
            next_token: FIRST_CONN_TOKEN,
            agent: DEFAULT_AGENT.to_string(),
            shutdown: Arc::new(AtomicBool::new(false)),
            waker,
        })
    }

    /// Override the agent name written into reply frames.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    /// The actual bound address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A handle for requesting shutdown from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            waker: Arc::clone(&self.waker),
        }
    }

    /// Run the event loop until shutdown is requested.
    ///
    /// Every decoded message is handed to `sink` in per-connection FIFO
    /// order. Per-connection errors close that connection only; this method
    /// returns an error only for failures of the loop itself.
    pub fn run(&mut self, sink: &mut dyn MessageSink) -> Result<()> {
        let mut events = Events::with_capacity(EVENT_CAPACITY);

        info!(addr = %self.local_addr, "server running");
        while !self.shutdown.load(Ordering::SeqCst) {
            if let Err(err) = self.poll.poll(&mut events, None) {
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err.into());
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_pending(sink),
                    WAKER => {} // shutdown flag is checked by the loop condition
                    token => {
                        if event.is_readable() {
                            self.service_readable(token, sink);
                        }
                        if event.is_writable() {
                            self.service_writable(token, sink);
                        }
                    }
                }
            }
        }

        info!("server draining connections");
        let tokens: Vec<Token> = self.conns.keys().copied().collect();
        for token in tokens {
            // Best-effort flush of queued replies before the socket drops.
            // A write the kernel won't take now is abandoned; the loop is
            // no longer polling for writability.
            if let Some(conn) = self.conns.get_mut(&token) {
                if conn.has_pending_writes() {
                    match conn.flush() {
                        Ok(SendStatus::Flushed { .. }) => {}
                        Ok(SendStatus::WouldBlock { sent }) => {
                            warn!(id = %conn.id(), sent, "shutdown flush incomplete");
                        }
                        Ok(SendStatus::Closed) => {}
                        Err(err) => {
                            warn!(id = %conn.id(), %err, "shutdown flush failed");
                        }
                    }
                }
            }
            self.close(token, DisconnectReason::ServerShutdown, sink);
        }
        Ok(())
    }

    /// Accept every immediately pending connection.
    fn accept_pending(&mut self, sink: &mut dyn MessageSink) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    if let Err(err) =
                        self.poll
                            .registry()
                            .register(&mut stream, token, Interest::READABLE)
                    {
                        warn!(%peer, %err, "failed to register connection");
                        continue;
                    }

                    let id = ConnId(token.0);
                    info!(%id, %peer, "connection accepted");
                    self.conns.insert(token, Connection::new(id, stream, peer));
                    sink.on_connect(id, peer);
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    // Contained: a failed accept does not take the loop down.
                    warn!(%err, "accept failed");
                    break;
                }
            }
        }
    }

    /// Drive one connection's state machine until it suspends or dies.
    fn service_readable(&mut self, token: Token, sink: &mut dyn MessageSink) {
        // A connection closed earlier in this batch may still have an event
        // queued; it must not be serviced again.
        let Some(conn) = self.conns.get_mut(&token) else {
            debug!(token = token.0, "event for removed connection ignored");
            return;
        };

        let id = conn.id();
        let mut replies = Vec::new();
        let outcome = conn.drive(&mut |message| {
            debug!(%id, msgno = message.msgno(), "message decoded");
            if let Some(reply) = sink.on_message(id, message) {
                replies.push(reply);
            }
        });

        for reply in &replies {
            if let Err(err) = conn.queue(reply, &self.agent) {
                warn!(%id, %err, "reply frame rejected");
            }
        }
        if conn.has_pending_writes() {
            if let Err(reason) = Self::flush_conn(&self.poll, token, conn) {
                self.close(token, reason, sink);
                return;
            }
        }

        if let DriveOutcome::Closed(reason) = outcome {
            self.close(token, reason, sink);
        }
    }

    /// Resume a blocked outbound drain.
    fn service_writable(&mut self, token: Token, sink: &mut dyn MessageSink) {
        let Some(conn) = self.conns.get_mut(&token) else {
            return;
        };
        if let Err(reason) = Self::flush_conn(&self.poll, token, conn) {
            self.close(token, reason, sink);
        }
    }

    /// Drain the connection's outbound buffer, adjusting interest so a
    /// blocked write resumes on the next writable notification.
    fn flush_conn(
        poll: &Poll,
        token: Token,
        conn: &mut Connection,
    ) -> std::result::Result<(), DisconnectReason> {
        match conn.flush() {
            Ok(SendStatus::Flushed { .. }) => {
                poll.registry()
                    .reregister(conn.stream_mut(), token, Interest::READABLE)
                    .map_err(DisconnectReason::IoError)?;
                Ok(())
            }
            Ok(SendStatus::WouldBlock { .. }) => {
                poll.registry()
                    .reregister(
                        conn.stream_mut(),
                        token,
                        Interest::READABLE | Interest::WRITABLE,
                    )
                    .map_err(DisconnectReason::IoError)?;
                Ok(())
            }
            Ok(SendStatus::Closed) => Err(DisconnectReason::PeerClosed),
            Err(err) => Err(DisconnectReason::IoError(err)),
        }
    }

    /// Remove a connection immediately: deregister, drop, report.
    ///
    /// Runs before the next event in the batch is serviced, so a dead
    /// descriptor is never left registered and never processed twice.
    fn close(&mut self, token: Token, reason: DisconnectReason, sink: &mut dyn MessageSink) {
        let Some(mut conn) = self.conns.remove(&token) else {
            return;
        };
        let id = conn.id();
        let peer = conn.peer();
        if let Err(err) = self.poll.registry().deregister(conn.stream_mut()) {
            warn!(%id, %err, "deregister failed");
        }

        match &reason {
            DisconnectReason::PeerClosed | DisconnectReason::ServerShutdown => {
                info!(%id, %peer, %reason, "connection closed");
            }
            DisconnectReason::IoError(_) | DisconnectReason::ProtocolViolation(_) => {
                warn!(%id, %peer, %reason, "connection closed");
            }
        }
        sink.on_disconnect(id, &reason);
        // conn (and its socket) dropped here.
    }
}
