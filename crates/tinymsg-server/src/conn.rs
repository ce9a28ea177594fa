use std::io::Read;
use std::net::SocketAddr;

use mio::net::TcpStream;
use tracing::trace;

use tinymsg_frame::{FrameError, FrameHeader, Message, HEADER_SIZE};
use tinymsg_transport::{recv_into, send_from, Accumulator, RecvStatus, SendStatus};

use crate::sink::{ConnId, DisconnectReason};

/// Where frame reassembly stands for one connection.
///
/// Signature validation is folded into header receipt; there is no separate
/// await-signature state.
#[derive(Debug)]
enum ParseState {
    /// Collecting the fixed-size header.
    AwaitHeader,
    /// Header parsed and validated; collecting the declared body.
    AwaitBody(FrameHeader),
}

/// How one `drive` call ended.
#[derive(Debug)]
pub enum DriveOutcome {
    /// The socket has no more bytes right now. Parse state and any partial
    /// frame bytes are retained for the next readiness notification.
    Suspended,
    /// The connection must be torn down. No further frames will be emitted.
    Closed(DisconnectReason),
}

/// The resumable frame-reassembly state machine.
///
/// Owns the inbound accumulator and can stop and resume at any byte
/// boundary. Separated from [`Connection`] so the machine can be driven by
/// scripted in-memory streams in tests.
#[derive(Debug)]
pub struct FrameAssembler {
    inbound: Accumulator,
    state: ParseState,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            inbound: Accumulator::new(),
            state: ParseState::AwaitHeader,
        }
    }

    /// Leftover bytes buffered past the last consumed frame boundary.
    pub fn buffered(&self) -> usize {
        self.inbound.len()
    }

    /// Pull available bytes and emit every complete frame.
    ///
    /// Loops until the socket would block or the connection dies: pipelined
    /// frames already buffered are all extracted within one call, never
    /// delayed one readiness notification per frame. Bytes past the last
    /// complete frame stay buffered for the next call.
    pub fn drive<R: Read>(
        &mut self,
        stream: &mut R,
        emit: &mut dyn FnMut(Message),
    ) -> DriveOutcome {
        loop {
            match &self.state {
                ParseState::AwaitHeader => {
                    if self.inbound.len() < HEADER_SIZE {
                        let want = HEADER_SIZE - self.inbound.len();
                        match recv_into(stream, &mut self.inbound, want) {
                            Ok(RecvStatus::Progress(_)) => {}
                            Ok(RecvStatus::WouldBlock { .. }) => return DriveOutcome::Suspended,
                            Ok(RecvStatus::EndOfStream { .. }) => {
                                return DriveOutcome::Closed(DisconnectReason::PeerClosed)
                            }
                            Err(err) => {
                                return DriveOutcome::Closed(DisconnectReason::IoError(err))
                            }
                        }
                    }

                    let header = match FrameHeader::parse(&self.inbound.as_slice()[..HEADER_SIZE]) {
                        Ok(header) => header,
                        Err(err) => {
                            return DriveOutcome::Closed(DisconnectReason::ProtocolViolation(err))
                        }
                    };
                    trace!(msgno = header.msgno, body_len = header.body_len, "header parsed");

                    if header.body_len == 0 {
                        // Empty body: the frame is complete at the header
                        // boundary. Emit and keep scanning buffered bytes.
                        let msgno = header.msgno;
                        match Message::decode_body(msgno, &[]) {
                            Ok(message) => {
                                self.inbound.consume_prefix(HEADER_SIZE);
                                emit(message);
                            }
                            Err(err) => {
                                return DriveOutcome::Closed(DisconnectReason::ProtocolViolation(
                                    err,
                                ))
                            }
                        }
                        continue;
                    }

                    self.state = ParseState::AwaitBody(header);
                }
                ParseState::AwaitBody(header) => {
                    let total = HEADER_SIZE + header.body_len as usize;
                    let msgno = header.msgno;

                    if self.inbound.len() < total {
                        let want = total - self.inbound.len();
                        match recv_into(stream, &mut self.inbound, want) {
                            Ok(RecvStatus::Progress(_)) => {}
                            Ok(RecvStatus::WouldBlock { .. }) => return DriveOutcome::Suspended,
                            Ok(RecvStatus::EndOfStream { .. }) => {
                                return DriveOutcome::Closed(DisconnectReason::PeerClosed)
                            }
                            Err(err) => {
                                return DriveOutcome::Closed(DisconnectReason::IoError(err))
                            }
                        }
                    }

                    let message =
                        match Message::decode_body(msgno, &self.inbound.as_slice()[HEADER_SIZE..total])
                        {
                            Ok(message) => message,
                            Err(err) => {
                                return DriveOutcome::Closed(DisconnectReason::ProtocolViolation(
                                    err,
                                ))
                            }
                        };

                    self.inbound.consume_prefix(total);
                    self.state = ParseState::AwaitHeader;
                    emit(message);
                }
            }
        }
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// One accepted connection: its socket, its reassembly state, and its
/// pending outbound bytes.
///
/// Owned exclusively by the server's connection map and only touched while
/// being serviced; buffers are never shared across connections.
#[derive(Debug)]
pub struct Connection {
    id: ConnId,
    stream: TcpStream,
    peer: SocketAddr,
    assembler: FrameAssembler,
    outbound: Accumulator,
}

impl Connection {
    pub fn new(id: ConnId, stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            id,
            stream,
            peer,
            assembler: FrameAssembler::new(),
            outbound: Accumulator::new(),
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The underlying socket, for poll registry (de)registration.
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Run the reassembly state machine against the socket.
    pub fn drive(&mut self, emit: &mut dyn FnMut(Message)) -> DriveOutcome {
        self.assembler.drive(&mut self.stream, emit)
    }

    /// Encode a frame into the outbound buffer.
    pub fn queue(&mut self, message: &Message, agent: &str) -> Result<(), FrameError> {
        let wire = message.encode(agent)?;
        self.outbound.append(&wire);
        Ok(())
    }

    /// Drain pending outbound bytes into the socket.
    pub fn flush(&mut self) -> std::io::Result<SendStatus> {
        send_from(&mut self.stream, &mut self.outbound)
    }

    /// True while undelivered outbound bytes remain.
    pub fn has_pending_writes(&self) -> bool {
        !self.outbound.is_drained()
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use bytes::BytesMut;
    use tinymsg_frame::{PROTOCOL_VERSION, TEXT_BODY_SIZE};

    use super::*;

    /// Replays a script of reads; `None` entries are WouldBlock.
    struct Feed {
        steps: Vec<Option<Vec<u8>>>,
        eof_at_end: bool,
    }

    impl Feed {
        fn new(steps: Vec<Option<Vec<u8>>>) -> Self {
            let mut steps = steps;
            steps.reverse();
            Self {
                steps,
                eof_at_end: false,
            }
        }

        fn with_eof(steps: Vec<Option<Vec<u8>>>) -> Self {
            let mut feed = Self::new(steps);
            feed.eof_at_end = true;
            feed
        }
    }

    impl Read for Feed {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.steps.pop() {
                Some(Some(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.steps.push(Some(data[n..].to_vec()));
                    }
                    Ok(n)
                }
                Some(None) => Err(ErrorKind::WouldBlock.into()),
                None => {
                    if self.eof_at_end {
                        Ok(0)
                    } else {
                        Err(ErrorKind::WouldBlock.into())
                    }
                }
            }
        }
    }

    fn text_frame(alias: &str, text: &str) -> Vec<u8> {
        Message::Text {
            alias: alias.to_string(),
            text: text.to_string(),
        }
        .encode("tester")
        .unwrap()
        .to_vec()
    }

    fn collect(assembler: &mut FrameAssembler, feed: &mut Feed) -> (Vec<Message>, DriveOutcome) {
        let mut messages = Vec::new();
        let outcome = assembler.drive(feed, &mut |msg| messages.push(msg));
        (messages, outcome)
    }

    #[test]
    fn single_frame_one_delivery() {
        let mut feed = Feed::new(vec![Some(text_frame("rob", "hello"))]);
        let mut assembler = FrameAssembler::new();
        let (messages, outcome) = collect(&mut assembler, &mut feed);

        assert!(matches!(outcome, DriveOutcome::Suspended));
        assert_eq!(
            messages,
            vec![Message::Text {
                alias: "rob".to_string(),
                text: "hello".to_string(),
            }]
        );
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn frame_split_3_250_rest() {
        // Header+body delivered in 3, 250, and the remaining bytes, one
        // readiness callback per delivery.
        let frame = text_frame("rob", "hello");
        let mut assembler = FrameAssembler::new();

        let mut first = Feed::new(vec![Some(frame[..3].to_vec())]);
        let (messages, outcome) = collect(&mut assembler, &mut first);
        assert!(messages.is_empty());
        assert!(matches!(outcome, DriveOutcome::Suspended));
        assert_eq!(assembler.buffered(), 3);

        let mut second = Feed::new(vec![Some(frame[3..253].to_vec())]);
        let (messages, outcome) = collect(&mut assembler, &mut second);
        assert!(messages.is_empty());
        assert!(matches!(outcome, DriveOutcome::Suspended));
        assert_eq!(assembler.buffered(), 253);

        let mut third = Feed::new(vec![Some(frame[253..].to_vec())]);
        let (messages, outcome) = collect(&mut assembler, &mut third);
        assert!(matches!(outcome, DriveOutcome::Suspended));
        assert_eq!(
            messages,
            vec![Message::Text {
                alias: "rob".to_string(),
                text: "hello".to_string(),
            }]
        );
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn state_survives_separate_drive_calls() {
        let frame = text_frame("a", "resumable");

        let mut assembler = FrameAssembler::new();

        // First callback: 10 bytes, then the socket dries up.
        let mut first = Feed::new(vec![Some(frame[..10].to_vec())]);
        let (messages, outcome) = collect(&mut assembler, &mut first);
        assert!(messages.is_empty());
        assert!(matches!(outcome, DriveOutcome::Suspended));
        assert_eq!(assembler.buffered(), 10);

        // Second callback: the rest arrives.
        let mut second = Feed::new(vec![Some(frame[10..].to_vec())]);
        let (messages, _) = collect(&mut assembler, &mut second);
        assert_eq!(messages.len(), 1);
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn pipelined_frames_drain_in_one_call() {
        let mut burst = Vec::new();
        burst.extend_from_slice(&text_frame("one", "first"));
        burst.extend_from_slice(&Message::Leave.encode("tester").unwrap());
        burst.extend_from_slice(&text_frame("two", "second"));

        let mut feed = Feed::new(vec![Some(burst)]);
        let mut assembler = FrameAssembler::new();
        let (messages, outcome) = collect(&mut assembler, &mut feed);

        assert!(matches!(outcome, DriveOutcome::Suspended));
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::Leave);
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn leftover_bytes_preserved() {
        // Two complete frames plus 7 stray bytes of the next header.
        let mut burst = Vec::new();
        burst.extend_from_slice(&text_frame("a", "x"));
        burst.extend_from_slice(&text_frame("b", "y"));
        let next = text_frame("c", "z");
        burst.extend_from_slice(&next[..7]);

        let mut feed = Feed::new(vec![Some(burst)]);
        let mut assembler = FrameAssembler::new();
        let (messages, outcome) = collect(&mut assembler, &mut feed);

        assert!(matches!(outcome, DriveOutcome::Suspended));
        assert_eq!(messages.len(), 2);
        assert_eq!(assembler.buffered(), 7);

        // The stray bytes belong to the next frame and complete normally.
        let mut rest = Feed::new(vec![Some(next[7..].to_vec())]);
        let (messages, _) = collect(&mut assembler, &mut rest);
        assert_eq!(messages.len(), 1);
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn body_length_mismatch_closes_connection() {
        // Declared body length 9999 does not match the table value.
        let mut wire = BytesMut::new();
        let header = FrameHeader {
            version: PROTOCOL_VERSION.to_string(),
            agent: "evil".to_string(),
            msgno: 100,
            body_len: TEXT_BODY_SIZE as u16,
        };
        header.encode(&mut wire).unwrap();
        wire[27..29].copy_from_slice(&9999u16.to_be_bytes());

        let mut feed = Feed::new(vec![Some(wire.to_vec())]);
        let mut assembler = FrameAssembler::new();
        let (messages, outcome) = collect(&mut assembler, &mut feed);

        assert!(messages.is_empty());
        assert!(matches!(
            outcome,
            DriveOutcome::Closed(DisconnectReason::ProtocolViolation(
                FrameError::BodyLengthMismatch { declared: 9999, .. }
            ))
        ));
    }

    #[test]
    fn bad_signature_closes_connection() {
        let mut frame = text_frame("rob", "hi");
        frame[0] = b'J';

        let mut feed = Feed::new(vec![Some(frame)]);
        let mut assembler = FrameAssembler::new();
        let (messages, outcome) = collect(&mut assembler, &mut feed);

        assert!(messages.is_empty());
        assert!(matches!(
            outcome,
            DriveOutcome::Closed(DisconnectReason::ProtocolViolation(
                FrameError::InvalidSignature
            ))
        ));
    }

    #[test]
    fn eof_mid_frame_closes_connection() {
        let frame = text_frame("rob", "cut short");
        let mut feed = Feed::with_eof(vec![Some(frame[..40].to_vec())]);
        let mut assembler = FrameAssembler::new();
        let (messages, outcome) = collect(&mut assembler, &mut feed);

        assert!(messages.is_empty());
        assert!(matches!(
            outcome,
            DriveOutcome::Closed(DisconnectReason::PeerClosed)
        ));
    }

    #[test]
    fn eof_on_idle_connection_closes() {
        let mut feed = Feed::with_eof(vec![]);
        let mut assembler = FrameAssembler::new();
        let (messages, outcome) = collect(&mut assembler, &mut feed);

        assert!(messages.is_empty());
        assert!(matches!(
            outcome,
            DriveOutcome::Closed(DisconnectReason::PeerClosed)
        ));
    }
}
