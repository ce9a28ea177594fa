/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The leading signature bytes are not `"TINY"`.
    #[error("invalid frame signature (expected \"TINY\")")]
    InvalidSignature,

    /// The message number has no entry in the closed message table.
    #[error("unknown message number {0}")]
    UnknownMessageNumber(u16),

    /// The declared body length differs from the table value for this
    /// message number.
    #[error("body length mismatch for message {msgno}: declared {declared}, expected {expected}")]
    BodyLengthMismatch {
        msgno: u16,
        declared: u16,
        expected: u16,
    },

    /// An outbound text field exceeds its fixed wire width.
    #[error("field '{field}' too long ({len} bytes, max {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Fewer bytes than a full header were handed to the parser.
    #[error("truncated header ({have} bytes, need {need})")]
    TruncatedHeader { have: usize, need: usize },

    /// Fewer bytes than the expected body were handed to the decoder.
    #[error("truncated body for message {msgno} ({have} bytes, need {need})")]
    TruncatedBody { msgno: u16, have: usize, need: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
