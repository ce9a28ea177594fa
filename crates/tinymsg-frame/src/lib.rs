//! Binary frame header and typed message codec for the tinymsg protocol.
//!
//! Every frame on the wire is a fixed 29-byte header followed by a body
//! whose layout is determined solely by the header's message number:
//! - A 4-byte signature (`"TINY"`) for stream sanity
//! - A 5-byte zero-padded ASCII protocol version
//! - A 16-byte zero-padded ASCII sender agent
//! - A big-endian u16 message number
//! - A big-endian u16 declared body length, which must equal the closed
//!   table's value for that message number
//!
//! Header validation happens before the body length is trusted; a frame
//! whose signature, message number, or declared length fails validation is
//! unrecoverable for its connection (there is no way to resynchronize an
//! unstructured byte stream).

pub mod error;
pub mod header;
pub mod message;

pub use error::{FrameError, Result};
pub use header::{FrameHeader, AGENT_SIZE, HEADER_SIZE, PROTOCOL_VERSION, SIGNATURE, VERSION_SIZE};
pub use message::{
    expected_body_len, Message, ALIAS_SIZE, MSGNO_LEAVE, MSGNO_TEXT, TEXT_BODY_SIZE, TEXT_SIZE,
};
