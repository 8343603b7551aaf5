//! Change notifications produced by the [`Synchronizer`](crate::Synchronizer).

use serde::Serialize;
use tilewire_protocol::PlayerFlags;

use crate::Tile;

/// Something about the game changed.
///
/// Serialized with an internal `type` tag so a presentation layer can
/// switch on it directly:
///
/// ```json
/// {"type":"tile_moved","tile":{"num":3,"letter":"A","x":130,"y":-40,"last_mover":1},"animate":true}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// The server told us our player number.
    SelfAssigned { player_num: u8 },

    PlayerNameChanged { player_num: u8, name: String },

    PlayerFlagsChanged { player_num: u8, flags: PlayerFlags },

    /// A player's `CONNECTED` flag came on after the initial sync.
    PlayerJoined { player_num: u8 },

    /// A player's `CONNECTED` flag went off after the initial sync.
    PlayerLeft { player_num: u8 },

    ChatMessage { player_num: u8, text: String },

    /// A tile was seen for the first time.
    TileAdded { tile: Tile },

    /// A known tile changed. `animate` is false when we moved it
    /// ourselves, since it's already where we dropped it.
    TileMoved { tile: Tile, animate: bool },

    TileCapacityChanged { total_tiles: u8, remaining: usize },

    /// The result of [`GameState::can_take_turn`](crate::GameState::can_take_turn)
    /// flipped.
    TurnEligibilityChanged { can_take_turn: bool },

    PlayerShouted { player_num: u8 },

    /// The shout's display time ran out.
    ShoutCleared { player_num: u8 },

    /// The initial state replay is complete.
    Synced,
}
