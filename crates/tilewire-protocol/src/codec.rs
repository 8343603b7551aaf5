//! Frame codec: packing typed messages into binary frames and back.
//!
//! Every frame on the wire has the same shape:
//!
//! ```text
//! ┌────────┬─────────┬─────────┬─────┐
//! │ opcode │ field 1 │ field 2 │ ... │
//! └────────┴─────────┴─────────┴─────┘
//!   1 byte   fixed or NUL-terminated, little-endian
//! ```
//!
//! There are no length prefixes. The opcode determines the field schema,
//! and the schema determines exactly how many bytes the frame must have.
//! Anything left over after the last field is an error, as is running out
//! of bytes before it.
//!
//! [`FrameWriter`] and [`FrameReader`] handle the individual field kinds.
//! The [`Frame`] trait ties an opcode-tagged enum to its schema, and the
//! free functions [`encode`] / [`decode`] drive the whole process.

use crate::ProtocolError;
use crate::types::limits;

/// A message type that can be written to and read from a binary frame.
///
/// Implemented by [`ClientMessage`](crate::ClientMessage) and
/// [`ServerMessage`](crate::ServerMessage). The opcode byte is handled by
/// [`encode`]/[`decode`]; implementors only deal with the fields.
pub trait Frame: Sized {
    /// The opcode byte that starts this message's frame.
    fn opcode(&self) -> u8;

    /// Writes the fields (everything after the opcode) in declared order.
    fn write_fields(&self, w: &mut FrameWriter) -> Result<(), ProtocolError>;

    /// Reads the fields for `opcode` from `r`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::UnknownOpcode`] if `opcode` has no schema,
    /// or [`ProtocolError::MalformedFrame`] if a field cannot be read.
    fn read_fields(
        opcode: u8,
        r: &mut FrameReader<'_>,
    ) -> Result<Self, ProtocolError>;
}

/// Encodes a message into a complete frame.
///
/// # Errors
/// - [`ProtocolError::EmbeddedNul`] if a string field contains `\0`
/// - [`ProtocolError::FrameTooLarge`] if the frame exceeds
///   [`limits::MAX_PAYLOAD_SIZE`]
pub fn encode<F: Frame>(message: &F) -> Result<Vec<u8>, ProtocolError> {
    let mut w = FrameWriter::new(message.opcode());
    message.write_fields(&mut w)?;
    w.finish()
}

/// Decodes a complete frame into a message.
///
/// The whole buffer must be consumed by the opcode's schema.
pub fn decode<F: Frame>(data: &[u8]) -> Result<F, ProtocolError> {
    let (opcode, mut r) = FrameReader::new(data)?;
    let message = F::read_fields(opcode, &mut r)?;
    r.finish()?;
    Ok(message)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Builds a frame field by field.
#[derive(Debug)]
pub struct FrameWriter {
    buf: Vec<u8>,
}

impl FrameWriter {
    /// Starts a frame with the given opcode.
    pub fn new(opcode: u8) -> Self {
        let mut buf = Vec::with_capacity(16);
        buf.push(opcode);
        Self { buf }
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Writes an 8-byte identifier blob.
    ///
    /// Identifiers are carried as little-endian 64-bit values, so the
    /// blob is simply `value.to_le_bytes()`.
    pub fn id(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Writes a NUL-terminated UTF-8 string.
    ///
    /// # Errors
    /// Returns [`ProtocolError::EmbeddedNul`] if `value` contains `\0`,
    /// since the terminator would end the field early.
    pub fn string(&mut self, value: &str) -> Result<&mut Self, ProtocolError> {
        if value.as_bytes().contains(&0) {
            return Err(ProtocolError::EmbeddedNul);
        }
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
        Ok(self)
    }

    /// Returns the finished frame.
    pub fn finish(self) -> Result<Vec<u8>, ProtocolError> {
        if self.buf.len() > limits::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                len: self.buf.len(),
                max: limits::MAX_PAYLOAD_SIZE,
            });
        }
        Ok(self.buf)
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Reads fields out of a frame in declared order.
///
/// The reader borrows the input buffer (`'a`), so string fields are
/// validated in place and only copied when converted to `String`.
#[derive(Debug)]
pub struct FrameReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    /// Splits off the opcode and returns a reader over the fields.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MalformedFrame`] for an empty buffer.
    pub fn new(data: &'a [u8]) -> Result<(u8, Self), ProtocolError> {
        let (&opcode, _) = data
            .split_first()
            .ok_or_else(|| ProtocolError::malformed("empty frame"))?;
        Ok((opcode, Self { data, pos: 1 }))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self.pos + n;
        let bytes = self.data.get(self.pos..end).ok_or_else(|| {
            ProtocolError::malformed(format!(
                "frame truncated: needed {n} bytes at offset {}, have {}",
                self.pos,
                self.data.len() - self.pos
            ))
        })?;
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn i16(&mut self) -> Result<i16, ProtocolError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn id(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    /// Reads a NUL-terminated UTF-8 string.
    pub fn string(&mut self) -> Result<String, ProtocolError> {
        let rest = &self.data[self.pos..];
        let len = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            ProtocolError::malformed("string field has no terminator")
        })?;
        let text = std::str::from_utf8(&rest[..len]).map_err(|e| {
            ProtocolError::malformed(format!("string field is not UTF-8: {e}"))
        })?;
        self.pos += len + 1;
        Ok(text.to_owned())
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Checks that every byte of the frame was consumed.
    pub fn finish(self) -> Result<(), ProtocolError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ProtocolError::malformed(format!(
                "{n} trailing bytes after last field"
            ))),
        }
    }
}
