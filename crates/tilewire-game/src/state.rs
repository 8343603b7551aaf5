//! The game state the client mirrors from the server.

use std::collections::BTreeMap;

use serde::Serialize;
use tilewire_protocol::PlayerFlags;

use crate::GameError;

/// Size of the full tile bag. The server won't go above it.
pub const MAX_TILES: u8 = 122;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player as last described by the server.
///
/// Players are created the first time any message mentions them and are
/// never removed; a player who leaves just loses the `CONNECTED` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub num: u8,
    /// Empty until the server sends the player's name.
    pub name: String,
    pub flags: PlayerFlags,
}

impl Player {
    pub(crate) fn new(num: u8) -> Self {
        Self {
            num,
            name: String::new(),
            flags: PlayerFlags::empty(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.flags.contains(PlayerFlags::CONNECTED)
    }

    pub fn is_typing(&self) -> bool {
        self.flags.contains(PlayerFlags::TYPING)
    }

    pub fn has_next_turn(&self) -> bool {
        self.flags.contains(PlayerFlags::NEXT_TURN)
    }
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// A tile on the board. Once drawn, a tile stays on the board; only its
/// position (and in principle its letter) changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub num: u8,
    pub letter: String,
    pub x: i16,
    pub y: i16,
    /// The player who last drew or moved the tile.
    pub last_mover: u8,
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// Everything the client knows about the game.
///
/// Only the [`Synchronizer`](crate::Synchronizer) writes to it. Callers
/// get clones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameState {
    pub players: BTreeMap<u8, Player>,
    pub tiles: BTreeMap<u8, Tile>,
    /// How many tiles the game is played with. Can change mid-game.
    pub total_tiles: u8,
    /// Our own player number, once assigned.
    pub self_num: Option<u8>,
    /// Whether the initial state replay is complete.
    pub synced: bool,
    /// The player whose shout is currently showing.
    pub shouting: Option<u8>,
}

impl GameState {
    pub fn player(&self, num: u8) -> Option<&Player> {
        self.players.get(&num)
    }

    /// Our own player, once assigned and described.
    pub fn self_player(&self) -> Option<&Player> {
        self.self_num.and_then(|num| self.players.get(&num))
    }

    pub fn tile(&self, num: u8) -> Option<&Tile> {
        self.tiles.get(&num)
    }

    /// Tiles still in the bag. Never negative, even if the capacity was
    /// lowered below the number already drawn.
    pub fn remaining_tiles(&self) -> usize {
        usize::from(self.total_tiles).saturating_sub(self.tiles.len())
    }

    pub fn is_board_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn is_board_full(&self) -> bool {
        self.remaining_tiles() == 0
    }

    /// No one is shouting, tiles are left, and either nothing has been
    /// drawn yet or the server says it's our turn.
    pub fn can_take_turn(&self) -> bool {
        self.shouting.is_none()
            && !self.is_board_full()
            && (self.is_board_empty()
                || self.self_player().is_some_and(Player::has_next_turn))
    }

    /// No one is shouting and there is something on the board to shout
    /// about.
    pub fn can_shout(&self) -> bool {
        self.shouting.is_none() && !self.is_board_empty()
    }

    pub fn check_turn(&self) -> Result<(), GameError> {
        if self.can_take_turn() {
            Ok(())
        } else {
            Err(GameError::TurnNotAllowed)
        }
    }

    pub fn check_shout(&self) -> Result<(), GameError> {
        if self.can_shout() {
            Ok(())
        } else {
            Err(GameError::ShoutNotAllowed)
        }
    }
}

/// Validates a tile capacity before asking the server for it.
pub fn check_tile_capacity(n_tiles: u8) -> Result<(), GameError> {
    if (1..=MAX_TILES).contains(&n_tiles) {
        Ok(())
    } else {
        Err(GameError::InvalidTileCapacity {
            requested: n_tiles,
            max: MAX_TILES,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(num: u8) -> Tile {
        Tile {
            num,
            letter: "A".into(),
            x: 0,
            y: 0,
            last_mover: 0,
        }
    }

    fn state_with(total: u8, drawn: u8) -> GameState {
        let mut state = GameState {
            total_tiles: total,
            self_num: Some(0),
            ..GameState::default()
        };
        state.players.insert(0, Player::new(0));
        for num in 0..drawn {
            state.tiles.insert(num, tile(num));
        }
        state
    }

    #[test]
    fn test_remaining_tiles_saturates() {
        let state = state_with(3, 5);
        assert_eq!(state.remaining_tiles(), 0);
        assert!(state.is_board_full());
    }

    #[test]
    fn test_turn_allowed_on_empty_board() {
        let state = state_with(10, 0);
        assert!(state.can_take_turn());
        assert!(state.check_turn().is_ok());
    }

    #[test]
    fn test_turn_needs_next_turn_flag_once_tiles_are_out() {
        let mut state = state_with(10, 2);
        assert!(!state.can_take_turn());

        state.players.get_mut(&0).unwrap().flags = PlayerFlags::NEXT_TURN;
        assert!(state.can_take_turn());
    }

    #[test]
    fn test_turn_blocked_while_shouting() {
        let mut state = state_with(10, 0);
        state.shouting = Some(3);
        assert_eq!(state.check_turn(), Err(GameError::TurnNotAllowed));
    }

    #[test]
    fn test_turn_blocked_when_board_full() {
        let mut state = state_with(2, 2);
        state.players.get_mut(&0).unwrap().flags = PlayerFlags::NEXT_TURN;
        assert!(!state.can_take_turn());
    }

    #[test]
    fn test_turn_with_zero_capacity_is_blocked() {
        let state = state_with(0, 0);
        assert!(!state.can_take_turn());
    }

    #[test]
    fn test_shout_needs_a_tile_and_no_shouter() {
        let mut state = state_with(10, 0);
        assert_eq!(state.check_shout(), Err(GameError::ShoutNotAllowed));

        state.tiles.insert(0, tile(0));
        assert!(state.can_shout());

        state.shouting = Some(1);
        assert!(!state.can_shout());
    }

    #[test]
    fn test_player_flag_helpers() {
        let mut p = Player::new(4);
        assert!(!p.is_connected());
        p.flags = PlayerFlags::CONNECTED | PlayerFlags::TYPING;
        assert!(p.is_connected());
        assert!(p.is_typing());
        assert!(!p.has_next_turn());
    }

    #[test]
    fn test_check_tile_capacity_bounds() {
        assert!(check_tile_capacity(1).is_ok());
        assert!(check_tile_capacity(MAX_TILES).is_ok());
        assert_eq!(
            check_tile_capacity(0),
            Err(GameError::InvalidTileCapacity {
                requested: 0,
                max: MAX_TILES
            })
        );
        assert!(check_tile_capacity(MAX_TILES + 1).is_err());
    }

    #[test]
    fn test_game_state_serializes() {
        let state = state_with(5, 1);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["total_tiles"], 5);
        assert_eq!(json["tiles"]["0"]["letter"], "A");
        assert_eq!(json["players"]["0"]["flags"], 0);
    }
}
