//! The reducer that applies server messages to [`GameState`].

use tilewire_protocol::{PlayerFlags, ServerMessage};
use tracing::debug;

use crate::{GameEvent, GameState, Player, Tile};

/// Applies decoded server messages to the game state, one message at a
/// time, and reports what changed.
///
/// The synchronizer knows nothing about time. When it reports
/// [`GameEvent::PlayerShouted`], the caller is expected to call
/// [`clear_shout`](Self::clear_shout) once the shout has been shown long
/// enough.
#[derive(Debug, Clone, Default)]
pub struct Synchronizer {
    state: GameState,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// A copy of the current state for the presentation layer.
    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    /// Applies one server message.
    ///
    /// Messages with no effect on the game (session-level ones like
    /// `End`) produce no events.
    pub fn apply(&mut self, msg: &ServerMessage) -> Vec<GameEvent> {
        let could_turn = self.state.can_take_turn();
        let mut events = Vec::new();

        match msg {
            ServerMessage::PlayerId { player_num, .. } => {
                self.state.self_num = Some(*player_num);
                self.player_mut(*player_num);
                events.push(GameEvent::SelfAssigned {
                    player_num: *player_num,
                });
            }
            ServerMessage::Message { player_num, text } => {
                self.player_mut(*player_num);
                events.push(GameEvent::ChatMessage {
                    player_num: *player_num,
                    text: text.clone(),
                });
            }
            ServerMessage::NTiles { n_tiles } => {
                self.state.total_tiles = *n_tiles;
                events.push(GameEvent::TileCapacityChanged {
                    total_tiles: *n_tiles,
                    remaining: self.state.remaining_tiles(),
                });
            }
            ServerMessage::Tile {
                num,
                x,
                y,
                letter,
                last_mover,
            } => {
                let tile = Tile {
                    num: *num,
                    letter: letter.clone(),
                    x: *x,
                    y: *y,
                    last_mover: *last_mover,
                };
                events.push(self.apply_tile(tile));
            }
            ServerMessage::PlayerName { player_num, name } => {
                let player = self.player_mut(*player_num);
                if player.name != *name {
                    player.name = name.clone();
                    events.push(GameEvent::PlayerNameChanged {
                        player_num: *player_num,
                        name: name.clone(),
                    });
                }
            }
            ServerMessage::PlayerFlags { player_num, flags } => {
                self.apply_flags(*player_num, *flags, &mut events);
            }
            ServerMessage::PlayerShouted { player_num } => {
                self.player_mut(*player_num);
                self.state.shouting = Some(*player_num);
                events.push(GameEvent::PlayerShouted {
                    player_num: *player_num,
                });
            }
            ServerMessage::Sync => {
                self.state.synced = true;
                events.push(GameEvent::Synced);
            }
            ServerMessage::End
            | ServerMessage::BadPlayerId
            | ServerMessage::ConversationId { .. }
            | ServerMessage::BadConversationId
            | ServerMessage::ConversationFull => {}
        }

        self.push_turn_change(could_turn, &mut events);
        events
    }

    /// Ends the current shout, if there is one.
    pub fn clear_shout(&mut self) -> Vec<GameEvent> {
        let could_turn = self.state.can_take_turn();
        let mut events = Vec::new();
        if let Some(player_num) = self.state.shouting.take() {
            events.push(GameEvent::ShoutCleared { player_num });
        }
        self.push_turn_change(could_turn, &mut events);
        events
    }

    fn apply_tile(&mut self, tile: Tile) -> GameEvent {
        match self.state.tiles.get_mut(&tile.num) {
            Some(existing) => {
                let animate = self.state.self_num != Some(tile.last_mover);
                *existing = tile.clone();
                GameEvent::TileMoved { tile, animate }
            }
            None => {
                debug!(tile = tile.num, letter = %tile.letter, "new tile");
                self.state.tiles.insert(tile.num, tile.clone());
                GameEvent::TileAdded { tile }
            }
        }
    }

    fn apply_flags(
        &mut self,
        player_num: u8,
        flags: PlayerFlags,
        events: &mut Vec<GameEvent>,
    ) {
        let synced = self.state.synced;
        let player = self.player_mut(player_num);
        let old = player.flags;
        if old == flags {
            return;
        }
        player.flags = flags;
        events.push(GameEvent::PlayerFlagsChanged { player_num, flags });

        let was = old.contains(PlayerFlags::CONNECTED);
        let is = flags.contains(PlayerFlags::CONNECTED);
        if synced && was != is {
            events.push(if is {
                GameEvent::PlayerJoined { player_num }
            } else {
                GameEvent::PlayerLeft { player_num }
            });
        }
    }

    fn push_turn_change(&self, could_turn: bool, events: &mut Vec<GameEvent>) {
        let can_turn = self.state.can_take_turn();
        if can_turn != could_turn {
            events.push(GameEvent::TurnEligibilityChanged {
                can_take_turn: can_turn,
            });
        }
    }

    fn player_mut(&mut self, num: u8) -> &mut Player {
        self.state
            .players
            .entry(num)
            .or_insert_with(|| Player::new(num))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrelated_messages_produce_no_events() {
        let mut sync = Synchronizer::new();
        assert!(sync.apply(&ServerMessage::End).is_empty());
        assert!(sync.apply(&ServerMessage::BadPlayerId).is_empty());
        assert_eq!(sync.snapshot(), GameState::default());
    }

    #[test]
    fn test_same_name_twice_reports_once() {
        let mut sync = Synchronizer::new();
        let msg = ServerMessage::PlayerName {
            player_num: 2,
            name: "Zamenhof".into(),
        };
        assert_eq!(sync.apply(&msg).len(), 1);
        assert!(sync.apply(&msg).is_empty());
    }

    #[test]
    fn test_clear_shout_without_shout_is_empty() {
        let mut sync = Synchronizer::new();
        assert!(sync.clear_shout().is_empty());
    }
}
