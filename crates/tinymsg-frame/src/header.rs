use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::message::expected_body_len;

/// Constant protocol signature leading every frame.
pub const SIGNATURE: [u8; 4] = *b"TINY";

/// Protocol version written by this implementation.
pub const PROTOCOL_VERSION: &str = "0.9";

/// Fixed width of the version field.
pub const VERSION_SIZE: usize = 5;

/// Fixed width of the sender agent field.
pub const AGENT_SIZE: usize = 16;

/// Total header size: signature + version + agent + msgno + body length.
pub const HEADER_SIZE: usize = 4 + VERSION_SIZE + AGENT_SIZE + 2 + 2;

/// A parsed and validated frame header.
///
/// Construction via [`FrameHeader::parse`] guarantees the signature matched,
/// the message number is in the closed table, and the declared body length
/// equals the table value — so body decoding never branches on unseen
/// message numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Protocol version text, e.g. `"0.9"`.
    pub version: String,
    /// Sender identifier.
    pub agent: String,
    /// Selects the body layout.
    pub msgno: u16,
    /// Body length in bytes; always equals the table value for `msgno`.
    pub body_len: u16,
}

impl FrameHeader {
    /// Parse and validate [`HEADER_SIZE`] bytes.
    ///
    /// Validation order: signature, then message number against the closed
    /// table, then declared body length against the table value. Any
    /// failure is fatal for the connection that produced the bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::TruncatedHeader {
                have: bytes.len(),
                need: HEADER_SIZE,
            });
        }
        if bytes[..4] != SIGNATURE {
            return Err(FrameError::InvalidSignature);
        }

        let version = read_padded(&bytes[4..4 + VERSION_SIZE]);
        let agent = read_padded(&bytes[9..9 + AGENT_SIZE]);
        let msgno = u16::from_be_bytes([bytes[25], bytes[26]]);
        let declared = u16::from_be_bytes([bytes[27], bytes[28]]);

        let expected = expected_body_len(msgno).ok_or(FrameError::UnknownMessageNumber(msgno))?;
        if declared as usize != expected {
            return Err(FrameError::BodyLengthMismatch {
                msgno,
                declared,
                expected: expected as u16,
            });
        }

        Ok(Self {
            version,
            agent,
            msgno,
            body_len: declared,
        })
    }

    /// Write the header's wire bytes to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(HEADER_SIZE);
        dst.put_slice(&SIGNATURE);
        put_padded(dst, "version", &self.version, VERSION_SIZE)?;
        put_padded(dst, "agent", &self.agent, AGENT_SIZE)?;
        dst.put_u16(self.msgno);
        dst.put_u16(self.body_len);
        Ok(())
    }
}

/// Read a fixed-width zero-padded ASCII field, stopping at the first NUL.
pub(crate) fn read_padded(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Write `value` into a `width`-byte field, zero-padded.
///
/// Over-length input is rejected, never silently truncated.
pub(crate) fn put_padded(
    dst: &mut BytesMut,
    field: &'static str,
    value: &str,
    width: usize,
) -> Result<()> {
    let raw = value.as_bytes();
    if raw.len() > width {
        return Err(FrameError::FieldTooLong {
            field,
            len: raw.len(),
            max: width,
        });
    }
    dst.put_slice(raw);
    dst.put_bytes(0, width - raw.len());
    Ok(())
}
