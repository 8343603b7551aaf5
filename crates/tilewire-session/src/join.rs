//! How a fresh session enters a game.

use serde::Serialize;
use tilewire_protocol::ConversationId;

/// What to join when we don't have an identity yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequest {
    /// A named room, e.g. the language-specific public room.
    Room { room: String },
    /// The conversation behind an invite link.
    Conversation { id: ConversationId },
}

impl JoinRequest {
    pub fn room(room: impl Into<String>) -> Self {
        Self::Room { room: room.into() }
    }

    pub fn conversation(id: ConversationId) -> Self {
        Self::Conversation { id }
    }
}

impl Default for JoinRequest {
    fn default() -> Self {
        Self::room("default")
    }
}
