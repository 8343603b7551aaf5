//! Wire protocol for tilewire.
//!
//! This crate defines the "language" the client and the game server speak:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`PersonId`], etc.):
//!   the typed messages that travel on the wire.
//! - **Codec** ([`Frame`] trait, [`FrameWriter`], [`FrameReader`]): how
//!   those messages are packed into compact little-endian binary frames.
//! - **Invite tokens** ([`id_token`]): the 11-character URL-safe form of a
//!   [`ConversationId`] used in shareable links.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (identity, reconnection policy). It does no I/O and keeps no state.
//!
//! ```text
//! Transport (bytes) → Protocol (ServerMessage) → Session → Game state
//! ```

mod codec;
mod error;
pub mod id_token;
mod types;

pub use codec::{Frame, FrameReader, FrameWriter, decode, encode};
pub use error::ProtocolError;
pub use types::{
    ClientMessage, ConversationId, PersonId, PlayerFlags, ServerMessage,
    limits, opcode,
};
