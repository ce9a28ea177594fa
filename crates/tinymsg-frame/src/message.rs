use bytes::BytesMut;
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::header::{put_padded, read_padded, FrameHeader, HEADER_SIZE, PROTOCOL_VERSION};

/// Message number of [`Message::Text`].
pub const MSGNO_TEXT: u16 = 100;

/// Message number of [`Message::Leave`].
pub const MSGNO_LEAVE: u16 = 101;

/// Fixed width of a text message's alias field.
pub const ALIAS_SIZE: usize = 32;

/// Fixed width of a text message's text field.
pub const TEXT_SIZE: usize = 255;

/// Body size of a text message.
pub const TEXT_BODY_SIZE: usize = ALIAS_SIZE + TEXT_SIZE;

/// The closed message table: expected body length per message number.
///
/// `None` means the message number is not part of the protocol; a header
/// carrying it is a protocol violation.
pub fn expected_body_len(msgno: u16) -> Option<usize> {
    match msgno {
        MSGNO_TEXT => Some(TEXT_BODY_SIZE),
        MSGNO_LEAVE => Some(0),
        _ => None,
    }
}

/// A decoded protocol message.
///
/// One variant per message number. Matches are exhaustive, so adding a
/// message type is a compile-time-checked extension rather than a runtime
/// table edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Message number 100: a fixed-width alias plus text.
    Text { alias: String, text: String },
    /// Message number 101: the sender is going away. Empty body.
    Leave,
}

impl Message {
    /// The message number selecting this variant's body layout.
    pub fn msgno(&self) -> u16 {
        match self {
            Message::Text { .. } => MSGNO_TEXT,
            Message::Leave => MSGNO_LEAVE,
        }
    }

    /// This variant's fixed body length.
    pub fn body_len(&self) -> usize {
        match self {
            Message::Text { .. } => TEXT_BODY_SIZE,
            Message::Leave => 0,
        }
    }

    /// Decode a body whose length has already been validated against the
    /// closed table.
    pub fn decode_body(msgno: u16, body: &[u8]) -> Result<Self> {
        let need = expected_body_len(msgno).ok_or(FrameError::UnknownMessageNumber(msgno))?;
        if body.len() < need {
            return Err(FrameError::TruncatedBody {
                msgno,
                have: body.len(),
                need,
            });
        }

        trace!(msgno, body_len = body.len(), "decoding body");
        match msgno {
            MSGNO_TEXT => Ok(Message::Text {
                alias: read_padded(&body[..ALIAS_SIZE]),
                text: read_padded(&body[ALIAS_SIZE..TEXT_BODY_SIZE]),
            }),
            MSGNO_LEAVE => Ok(Message::Leave),
            _ => unreachable!("message number validated against the closed table"),
        }
    }

    /// Write this message's body bytes, zero-padded to the fixed widths.
    ///
    /// Over-length fields are rejected with [`FrameError::FieldTooLong`].
    pub fn encode_body(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Message::Text { alias, text } => {
                dst.reserve(TEXT_BODY_SIZE);
                put_padded(dst, "alias", alias, ALIAS_SIZE)?;
                put_padded(dst, "text", text, TEXT_SIZE)?;
            }
            Message::Leave => {}
        }
        Ok(())
    }

    /// Encode a complete frame: header plus body, ready to send.
    pub fn encode(&self, agent: &str) -> Result<BytesMut> {
        let header = FrameHeader {
            version: PROTOCOL_VERSION.to_string(),
            agent: agent.to_string(),
            msgno: self.msgno(),
            body_len: self.body_len() as u16,
        };

        let mut wire = BytesMut::with_capacity(HEADER_SIZE + self.body_len());
        header.encode(&mut wire)?;
        self.encode_body(&mut wire)?;
        Ok(wire)
    }
}
