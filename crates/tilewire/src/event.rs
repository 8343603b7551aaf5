//! What the client tells the presentation layer.

use serde::Serialize;
use tilewire_game::{GameEvent, GameState, Player};
use tilewire_protocol::{ConversationId, id_token};
use tilewire_session::{ConnectionState, Session, SessionError, SessionState};

/// A notification from the client driver.
///
/// Serialized with adjacent tagging:
/// `{"kind":"game","data":{"type":"chat_message",...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Something in the game changed.
    Game(GameEvent),

    /// The session moved to a new lifecycle state.
    StateChanged { state: SessionState },

    /// The socket opened or dropped.
    ConnectionChanged { connection: ConnectionState },

    /// The server told us the id of our conversation, so an invite link
    /// can be shown.
    ConversationId {
        conversation_id: ConversationId,
        invite_url: String,
    },

    /// The session ended with a terminal failure.
    Failed {
        key: &'static str,
        message: String,
        #[serde(skip_serializing)]
        error: SessionError,
    },
}

impl ClientEvent {
    pub(crate) fn conversation(conversation_id: ConversationId) -> Self {
        Self::ConversationId {
            conversation_id,
            invite_url: id_token::encode_url(conversation_id.0),
        }
    }

    pub(crate) fn failed(error: SessionError) -> Self {
        Self::Failed {
            key: error.message_key(),
            message: error.to_string(),
            error,
        }
    }
}

/// A copy of everything the client knows, with the derived views a UI
/// needs most.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub session: Session,
    pub game: GameState,
    pub remaining_tiles: usize,
    pub shouting: Option<u8>,
    pub self_player: Option<Player>,
    pub can_take_turn: bool,
    pub can_shout: bool,
}

impl Snapshot {
    pub(crate) fn new(session: &Session, game: GameState) -> Self {
        Self {
            session: session.clone(),
            remaining_tiles: game.remaining_tiles(),
            shouting: game.shouting,
            self_player: game.self_player().cloned(),
            can_take_turn: game.can_take_turn(),
            can_shout: game.can_shout(),
            game,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_event_json_shape() {
        let event = ClientEvent::Game(GameEvent::ChatMessage {
            player_num: 1,
            text: "saluton".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "game");
        assert_eq!(json["data"]["type"], "chat_message");
        assert_eq!(json["data"]["text"], "saluton");
    }

    #[test]
    fn test_failed_event_serializes_key_and_message() {
        let event = ClientEvent::failed(SessionError::ConversationFull);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "failed");
        assert_eq!(json["data"]["key"], "error.conversation_full");
        assert!(json["data"].get("error").is_none());
    }

    #[test]
    fn test_conversation_event_has_invite_url() {
        let event = ClientEvent::conversation(ConversationId(0xcafe_cafe_cafe_cafe));
        assert_eq!(
            event,
            ClientEvent::ConversationId {
                conversation_id: ConversationId(0xcafe_cafe_cafe_cafe),
                invite_url: "https://gemelo.org/j/yv7K_sr-yvO".into(),
            }
        );
    }
}
