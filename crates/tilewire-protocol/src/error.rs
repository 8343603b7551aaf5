//! Error types for the protocol layer.
//!
//! Each crate in tilewire defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in framing or parsing, not
//! in networking or game state.

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame does not match the schema of its opcode.
    ///
    /// Covers truncated frames, strings without a terminator, invalid
    /// UTF-8 and trailing bytes after the last declared field.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The opcode has no schema on this side of the protocol.
    ///
    /// The codec only reports this; whether it is fatal is decided by
    /// the session layer.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// A string field contains an embedded NUL byte and cannot be
    /// represented on the wire.
    #[error("string field contains a NUL byte")]
    EmbeddedNul,

    /// The encoded frame is larger than the server accepts.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
}

impl ProtocolError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedFrame(msg.into())
    }
}
