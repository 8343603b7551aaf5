//! Core protocol types for tilewire's wire format.
//!
//! This module defines every message that travels "on the wire" between
//! the client and the game server, along with the small identity types
//! those messages carry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::{Frame, FrameReader, FrameWriter};
use crate::{ProtocolError, id_token};

/// Size limits enforced by the server.
pub mod limits {
    /// Largest frame (opcode + fields) the server will accept.
    pub const MAX_PAYLOAD_SIZE: usize = 1024;

    /// Largest room or player name, in bytes.
    pub const MAX_NAME_LENGTH: usize = 256;

    /// Largest chat message, in bytes.
    pub const MAX_MESSAGE_LENGTH: usize = 1000;
}

/// Opcode bytes for every frame in the protocol.
///
/// Client → server opcodes have the high bit set; server → client opcodes
/// don't. That makes it impossible to confuse the two directions.
pub mod opcode {
    // Client → server
    pub const NEW_PLAYER: u8 = 0x80;
    pub const RECONNECT: u8 = 0x81;
    pub const KEEP_ALIVE: u8 = 0x83;
    pub const LEAVE: u8 = 0x84;
    pub const SEND_MESSAGE: u8 = 0x85;
    pub const START_TYPING: u8 = 0x86;
    pub const STOP_TYPING: u8 = 0x87;
    pub const MOVE_TILE: u8 = 0x88;
    pub const TURN: u8 = 0x89;
    pub const SHOUT: u8 = 0x8a;
    pub const SET_N_TILES: u8 = 0x8b;
    pub const JOIN_CONVERSATION: u8 = 0x8d;

    // Server → client
    pub const PLAYER_ID: u8 = 0x00;
    pub const MESSAGE: u8 = 0x01;
    pub const N_TILES: u8 = 0x02;
    pub const TILE: u8 = 0x03;
    pub const PLAYER_NAME: u8 = 0x04;
    pub const PLAYER: u8 = 0x05;
    pub const PLAYER_SHOUTED: u8 = 0x06;
    pub const SYNC: u8 = 0x07;
    pub const END: u8 = 0x08;
    pub const BAD_PLAYER_ID: u8 = 0x09;
    pub const CONVERSATION_ID: u8 = 0x0a;
    pub const BAD_CONVERSATION_ID: u8 = 0x0b;
    pub const CONVERSATION_FULL: u8 = 0x0d;
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The server-assigned identity of this client within a conversation.
///
/// Newtype over the 8-byte identifier. The client never interprets it; it
/// just sends it back on reconnect to resume the same seat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(pub u64);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Identifies an invite-created conversation (as opposed to a named room).
///
/// Displayed as its 11-character invite token, since that is the form a
/// user ever sees.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConversationId(pub u64);

impl ConversationId {
    /// The 11-character URL-safe token for this id.
    pub fn to_token(self) -> String {
        id_token::encode(self.0)
    }

    /// Parses an 11-character token. Returns `None` if it isn't one.
    pub fn from_token(token: &str) -> Option<Self> {
        id_token::decode(token).map(Self)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

/// Per-player status bits as sent in the player-flags frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerFlags(pub u8);

impl PlayerFlags {
    pub const CONNECTED: PlayerFlags = PlayerFlags(1 << 0);
    pub const TYPING: PlayerFlags = PlayerFlags(1 << 1);
    pub const NEXT_TURN: PlayerFlags = PlayerFlags(1 << 2);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, other: PlayerFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for PlayerFlags {
    type Output = PlayerFlags;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// ClientMessage: client → server
// ---------------------------------------------------------------------------

/// Messages the client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Join a named room as a new player.
    NewPlayer { room: String, player_name: String },

    /// Resume a previous identity after a dropped connection.
    ///
    /// `last_sequence` is a replay cursor: the number of chat messages
    /// already received, so the server can skip them.
    Reconnect { person_id: PersonId, last_sequence: u16 },

    /// No-op to keep an idle connection alive.
    KeepAlive,

    /// "I'm leaving for good."
    Leave,

    SendMessage { text: String },
    StartTyping,
    StopTyping,

    /// Report the position of a tile this client dragged.
    MoveTile { tile: u8, x: i16, y: i16 },

    /// Take a turn (draw the next tile).
    Turn,

    Shout,

    /// Change the total number of tiles in the game.
    SetNTiles { n_tiles: u8 },

    /// Join the conversation behind an invite link.
    JoinConversation {
        conversation_id: ConversationId,
        player_name: String,
    },
}

impl Frame for ClientMessage {
    fn opcode(&self) -> u8 {
        match self {
            Self::NewPlayer { .. } => opcode::NEW_PLAYER,
            Self::Reconnect { .. } => opcode::RECONNECT,
            Self::KeepAlive => opcode::KEEP_ALIVE,
            Self::Leave => opcode::LEAVE,
            Self::SendMessage { .. } => opcode::SEND_MESSAGE,
            Self::StartTyping => opcode::START_TYPING,
            Self::StopTyping => opcode::STOP_TYPING,
            Self::MoveTile { .. } => opcode::MOVE_TILE,
            Self::Turn => opcode::TURN,
            Self::Shout => opcode::SHOUT,
            Self::SetNTiles { .. } => opcode::SET_N_TILES,
            Self::JoinConversation { .. } => opcode::JOIN_CONVERSATION,
        }
    }

    fn write_fields(&self, w: &mut FrameWriter) -> Result<(), ProtocolError> {
        match self {
            Self::NewPlayer { room, player_name } => {
                w.string(room)?.string(player_name)?;
            }
            Self::Reconnect {
                person_id,
                last_sequence,
            } => {
                w.id(person_id.0).u16(*last_sequence);
            }
            Self::SendMessage { text } => {
                w.string(text)?;
            }
            Self::MoveTile { tile, x, y } => {
                w.u8(*tile).i16(*x).i16(*y);
            }
            Self::SetNTiles { n_tiles } => {
                w.u8(*n_tiles);
            }
            Self::JoinConversation {
                conversation_id,
                player_name,
            } => {
                w.id(conversation_id.0).string(player_name)?;
            }
            Self::KeepAlive
            | Self::Leave
            | Self::StartTyping
            | Self::StopTyping
            | Self::Turn
            | Self::Shout => {}
        }
        Ok(())
    }

    fn read_fields(
        op: u8,
        r: &mut FrameReader<'_>,
    ) -> Result<Self, ProtocolError> {
        Ok(match op {
            opcode::NEW_PLAYER => Self::NewPlayer {
                room: r.string()?,
                player_name: r.string()?,
            },
            opcode::RECONNECT => Self::Reconnect {
                person_id: PersonId(r.id()?),
                last_sequence: r.u16()?,
            },
            opcode::KEEP_ALIVE => Self::KeepAlive,
            opcode::LEAVE => Self::Leave,
            opcode::SEND_MESSAGE => Self::SendMessage { text: r.string()? },
            opcode::START_TYPING => Self::StartTyping,
            opcode::STOP_TYPING => Self::StopTyping,
            opcode::MOVE_TILE => Self::MoveTile {
                tile: r.u8()?,
                x: r.i16()?,
                y: r.i16()?,
            },
            opcode::TURN => Self::Turn,
            opcode::SHOUT => Self::Shout,
            opcode::SET_N_TILES => Self::SetNTiles { n_tiles: r.u8()? },
            opcode::JOIN_CONVERSATION => Self::JoinConversation {
                conversation_id: ConversationId(r.id()?),
                player_name: r.string()?,
            },
            other => return Err(ProtocolError::UnknownOpcode(other)),
        })
    }
}

// ---------------------------------------------------------------------------
// ServerMessage: server → client
// ---------------------------------------------------------------------------

/// Messages the server sends to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// "This is who you are." Sent once per successful (re)join.
    PlayerId { person_id: PersonId, player_num: u8 },

    /// A chat message from `player_num`.
    Message { player_num: u8, text: String },

    /// The total number of tiles in this game.
    NTiles { n_tiles: u8 },

    /// Current state of one tile. `last_mover` is the player who last
    /// moved or drew it.
    Tile {
        num: u8,
        x: i16,
        y: i16,
        letter: String,
        last_mover: u8,
    },

    PlayerName { player_num: u8, name: String },

    PlayerFlags { player_num: u8, flags: PlayerFlags },

    PlayerShouted { player_num: u8 },

    /// The initial state replay is complete.
    Sync,

    /// The server ended the session.
    End,

    /// The rejoin identity is unknown to the server.
    BadPlayerId,

    /// The server created a conversation for this client's room and tells
    /// us its id, so we can hand out invite links.
    ConversationId { conversation_id: ConversationId },

    BadConversationId,

    ConversationFull,
}

impl Frame for ServerMessage {
    fn opcode(&self) -> u8 {
        match self {
            Self::PlayerId { .. } => opcode::PLAYER_ID,
            Self::Message { .. } => opcode::MESSAGE,
            Self::NTiles { .. } => opcode::N_TILES,
            Self::Tile { .. } => opcode::TILE,
            Self::PlayerName { .. } => opcode::PLAYER_NAME,
            Self::PlayerFlags { .. } => opcode::PLAYER,
            Self::PlayerShouted { .. } => opcode::PLAYER_SHOUTED,
            Self::Sync => opcode::SYNC,
            Self::End => opcode::END,
            Self::BadPlayerId => opcode::BAD_PLAYER_ID,
            Self::ConversationId { .. } => opcode::CONVERSATION_ID,
            Self::BadConversationId => opcode::BAD_CONVERSATION_ID,
            Self::ConversationFull => opcode::CONVERSATION_FULL,
        }
    }

    fn write_fields(&self, w: &mut FrameWriter) -> Result<(), ProtocolError> {
        match self {
            Self::PlayerId {
                person_id,
                player_num,
            } => {
                w.id(person_id.0).u8(*player_num);
            }
            Self::Message { player_num, text } => {
                w.u8(*player_num).string(text)?;
            }
            Self::NTiles { n_tiles } => {
                w.u8(*n_tiles);
            }
            Self::Tile {
                num,
                x,
                y,
                letter,
                last_mover,
            } => {
                w.u8(*num).i16(*x).i16(*y).string(letter)?.u8(*last_mover);
            }
            Self::PlayerName { player_num, name } => {
                w.u8(*player_num).string(name)?;
            }
            Self::PlayerFlags { player_num, flags } => {
                w.u8(*player_num).u8(flags.bits());
            }
            Self::PlayerShouted { player_num } => {
                w.u8(*player_num);
            }
            Self::ConversationId { conversation_id } => {
                w.id(conversation_id.0);
            }
            Self::Sync
            | Self::End
            | Self::BadPlayerId
            | Self::BadConversationId
            | Self::ConversationFull => {}
        }
        Ok(())
    }

    fn read_fields(
        op: u8,
        r: &mut FrameReader<'_>,
    ) -> Result<Self, ProtocolError> {
        Ok(match op {
            opcode::PLAYER_ID => Self::PlayerId {
                person_id: PersonId(r.id()?),
                player_num: r.u8()?,
            },
            opcode::MESSAGE => Self::Message {
                player_num: r.u8()?,
                text: r.string()?,
            },
            opcode::N_TILES => Self::NTiles { n_tiles: r.u8()? },
            opcode::TILE => Self::Tile {
                num: r.u8()?,
                x: r.i16()?,
                y: r.i16()?,
                letter: r.string()?,
                last_mover: r.u8()?,
            },
            opcode::PLAYER_NAME => Self::PlayerName {
                player_num: r.u8()?,
                name: r.string()?,
            },
            opcode::PLAYER => Self::PlayerFlags {
                player_num: r.u8()?,
                flags: PlayerFlags(r.u8()?),
            },
            opcode::PLAYER_SHOUTED => Self::PlayerShouted {
                player_num: r.u8()?,
            },
            opcode::SYNC => Self::Sync,
            opcode::END => Self::End,
            opcode::BAD_PLAYER_ID => Self::BadPlayerId,
            opcode::CONVERSATION_ID => Self::ConversationId {
                conversation_id: ConversationId(r.id()?),
            },
            opcode::BAD_CONVERSATION_ID => Self::BadConversationId,
            opcode::CONVERSATION_FULL => Self::ConversationFull,
            other => return Err(ProtocolError::UnknownOpcode(other)),
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
