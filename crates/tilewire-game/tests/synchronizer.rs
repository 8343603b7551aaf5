//! Integration tests for the game state reducer, driven by the message
//! sequences a real server sends.

use tilewire_game::{GameEvent, Synchronizer, Tile};
use tilewire_protocol::{PersonId, PlayerFlags, ServerMessage};

// =========================================================================
// Helpers
// =========================================================================

const SELF: u8 = 0;
const OTHER: u8 = 1;

fn identity(num: u8) -> ServerMessage {
    ServerMessage::PlayerId {
        person_id: PersonId(0x1234),
        player_num: num,
    }
}

fn tile(num: u8, x: i16, y: i16, letter: &str, last_mover: u8) -> ServerMessage {
    ServerMessage::Tile {
        num,
        x,
        y,
        letter: letter.into(),
        last_mover,
    }
}

fn flags(player_num: u8, flags: PlayerFlags) -> ServerMessage {
    ServerMessage::PlayerFlags { player_num, flags }
}

fn n_tiles(n: u8) -> ServerMessage {
    ServerMessage::NTiles { n_tiles: n }
}

/// A synchronizer that has been told who we are and how many tiles the
/// game has, as happens at the start of every join.
fn joined(total: u8) -> Synchronizer {
    let mut sync = Synchronizer::new();
    sync.apply(&identity(SELF));
    sync.apply(&n_tiles(total));
    sync
}

/// Just the events of one kind, so tests don't depend on incidental
/// eligibility notifications.
fn without_turn_changes(events: Vec<GameEvent>) -> Vec<GameEvent> {
    events
        .into_iter()
        .filter(|e| !matches!(e, GameEvent::TurnEligibilityChanged { .. }))
        .collect()
}

// =========================================================================
// Tiles
// =========================================================================

#[test]
fn test_tile_first_sighting_then_move() {
    let mut sync = joined(10);

    let events = without_turn_changes(sync.apply(&tile(3, 120, -40, "A", OTHER)));
    assert_eq!(
        events,
        vec![GameEvent::TileAdded {
            tile: Tile {
                num: 3,
                letter: "A".into(),
                x: 120,
                y: -40,
                last_mover: OTHER,
            }
        }]
    );

    let events = without_turn_changes(sync.apply(&tile(3, 130, -40, "A", OTHER)));
    assert_eq!(
        events,
        vec![GameEvent::TileMoved {
            tile: Tile {
                num: 3,
                letter: "A".into(),
                x: 130,
                y: -40,
                last_mover: OTHER,
            },
            animate: true,
        }]
    );

    let state = sync.state();
    assert_eq!(state.tiles.len(), 1);
    assert_eq!(state.tile(3).map(|t| (t.x, t.y)), Some((130, -40)));
}

#[test]
fn test_own_move_is_not_animated() {
    let mut sync = joined(10);
    sync.apply(&tile(0, 0, 0, "B", OTHER));

    let events = sync.apply(&tile(0, 50, 60, "B", SELF));

    assert!(events.contains(&GameEvent::TileMoved {
        tile: Tile {
            num: 0,
            letter: "B".into(),
            x: 50,
            y: 60,
            last_mover: SELF,
        },
        animate: false,
    }));
}

#[test]
fn test_move_before_identity_is_animated() {
    let mut sync = Synchronizer::new();
    sync.apply(&tile(0, 0, 0, "C", 0));
    let events = sync.apply(&tile(0, 1, 1, "C", 0));
    assert!(matches!(
        events[0],
        GameEvent::TileMoved { animate: true, .. }
    ));
}

#[test]
fn test_tiles_are_never_removed() {
    let mut sync = joined(2);
    sync.apply(&tile(0, 0, 0, "A", OTHER));
    sync.apply(&tile(1, 0, 0, "B", OTHER));

    sync.apply(&n_tiles(1));

    assert_eq!(sync.state().tiles.len(), 2);
    assert_eq!(sync.state().remaining_tiles(), 0);
}

// =========================================================================
// Tile capacity
// =========================================================================

#[test]
fn test_capacity_change_reports_remaining() {
    let mut sync = joined(10);
    sync.apply(&tile(0, 0, 0, "A", OTHER));
    sync.apply(&tile(1, 0, 0, "B", OTHER));

    let events = without_turn_changes(sync.apply(&n_tiles(5)));

    assert_eq!(
        events,
        vec![GameEvent::TileCapacityChanged {
            total_tiles: 5,
            remaining: 3,
        }]
    );
}

#[test]
fn test_capacity_below_drawn_saturates_at_zero() {
    let mut sync = joined(10);
    for num in 0..4 {
        sync.apply(&tile(num, 0, 0, "A", OTHER));
    }

    let events = without_turn_changes(sync.apply(&n_tiles(2)));

    assert_eq!(
        events,
        vec![GameEvent::TileCapacityChanged {
            total_tiles: 2,
            remaining: 0,
        }]
    );
}

#[test]
fn test_capacity_change_re_derives_turn_eligibility() {
    let mut sync = joined(1);
    sync.apply(&flags(SELF, PlayerFlags::CONNECTED | PlayerFlags::NEXT_TURN));
    sync.apply(&tile(0, 0, 0, "A", OTHER));
    assert!(!sync.state().can_take_turn(), "board is full");

    let events = sync.apply(&n_tiles(2));

    assert!(events.contains(&GameEvent::TurnEligibilityChanged {
        can_take_turn: true
    }));
    assert!(sync.state().can_take_turn());
}

// =========================================================================
// Turn eligibility
// =========================================================================

#[test]
fn test_turn_allowed_on_empty_board() {
    let sync = joined(10);
    assert!(sync.state().can_take_turn());
}

#[test]
fn test_turn_follows_next_turn_flag() {
    let mut sync = joined(10);
    let events = sync.apply(&tile(0, 0, 0, "A", OTHER));
    assert!(events.contains(&GameEvent::TurnEligibilityChanged {
        can_take_turn: false
    }));

    let events = sync.apply(&flags(SELF, PlayerFlags::NEXT_TURN));
    assert!(events.contains(&GameEvent::TurnEligibilityChanged {
        can_take_turn: true
    }));

    // Another player's NEXT_TURN doesn't count.
    let mut sync = joined(10);
    sync.apply(&tile(0, 0, 0, "A", OTHER));
    sync.apply(&flags(OTHER, PlayerFlags::NEXT_TURN));
    assert!(!sync.state().can_take_turn());
}

#[test]
fn test_turn_blocked_while_someone_shouts() {
    let mut sync = joined(10);

    let events = sync.apply(&ServerMessage::PlayerShouted { player_num: OTHER });

    assert!(events.contains(&GameEvent::TurnEligibilityChanged {
        can_take_turn: false
    }));
    assert!(!sync.state().can_take_turn());

    let events = sync.clear_shout();
    assert_eq!(
        events,
        vec![
            GameEvent::ShoutCleared { player_num: OTHER },
            GameEvent::TurnEligibilityChanged {
                can_take_turn: true
            },
        ]
    );
}

// =========================================================================
// Shouting
// =========================================================================

#[test]
fn test_newer_shout_replaces_older() {
    let mut sync = joined(10);
    sync.apply(&ServerMessage::PlayerShouted { player_num: 1 });
    sync.apply(&ServerMessage::PlayerShouted { player_num: 2 });

    assert_eq!(sync.state().shouting, Some(2));
    assert_eq!(
        without_turn_changes(sync.clear_shout()),
        vec![GameEvent::ShoutCleared { player_num: 2 }]
    );
    assert_eq!(sync.state().shouting, None);
}

#[test]
fn test_shout_eligibility() {
    let mut sync = joined(10);
    assert!(!sync.state().can_shout(), "nothing on the board");

    sync.apply(&tile(0, 0, 0, "A", OTHER));
    assert!(sync.state().can_shout());

    sync.apply(&ServerMessage::PlayerShouted { player_num: OTHER });
    assert!(!sync.state().can_shout());
}

// =========================================================================
// Players
// =========================================================================

#[test]
fn test_players_created_lazily() {
    let mut sync = Synchronizer::new();
    sync.apply(&ServerMessage::Message {
        player_num: 7,
        text: "saluton".into(),
    });

    let player = sync.state().player(7).expect("player should exist");
    assert_eq!(player.name, "");
    assert_eq!(player.flags, PlayerFlags::empty());
}

#[test]
fn test_chat_message_event() {
    let mut sync = joined(10);
    let events = sync.apply(&ServerMessage::Message {
        player_num: OTHER,
        text: "saluton".into(),
    });
    assert_eq!(
        events,
        vec![GameEvent::ChatMessage {
            player_num: OTHER,
            text: "saluton".into(),
        }]
    );
}

#[test]
fn test_join_and_leave_suppressed_until_sync() {
    let mut sync = joined(10);

    // Initial replay: flags arrive before the sync marker.
    let events = sync.apply(&flags(OTHER, PlayerFlags::CONNECTED));
    assert_eq!(
        events,
        vec![GameEvent::PlayerFlagsChanged {
            player_num: OTHER,
            flags: PlayerFlags::CONNECTED,
        }]
    );

    assert_eq!(sync.apply(&ServerMessage::Sync), vec![GameEvent::Synced]);
    assert!(sync.state().synced);

    let events = sync.apply(&flags(OTHER, PlayerFlags::empty()));
    assert_eq!(
        events,
        vec![
            GameEvent::PlayerFlagsChanged {
                player_num: OTHER,
                flags: PlayerFlags::empty(),
            },
            GameEvent::PlayerLeft { player_num: OTHER },
        ]
    );

    let events = sync.apply(&flags(2, PlayerFlags::CONNECTED));
    assert!(events.contains(&GameEvent::PlayerJoined { player_num: 2 }));
}

#[test]
fn test_typing_flag_does_not_announce_join() {
    let mut sync = joined(10);
    sync.apply(&flags(OTHER, PlayerFlags::CONNECTED));
    sync.apply(&ServerMessage::Sync);

    let events =
        sync.apply(&flags(OTHER, PlayerFlags::CONNECTED | PlayerFlags::TYPING));

    assert_eq!(
        events,
        vec![GameEvent::PlayerFlagsChanged {
            player_num: OTHER,
            flags: PlayerFlags::CONNECTED | PlayerFlags::TYPING,
        }]
    );
    assert!(sync.state().player(OTHER).unwrap().is_typing());
}

#[test]
fn test_self_player_view() {
    let mut sync = joined(10);
    sync.apply(&ServerMessage::PlayerName {
        player_num: SELF,
        name: "Alice".into(),
    });

    let me = sync.state().self_player().expect("self should exist");
    assert_eq!(me.name, "Alice");
    assert_eq!(sync.state().self_num, Some(SELF));
}

#[test]
fn test_event_json_shape() {
    let event = GameEvent::TileMoved {
        tile: Tile {
            num: 3,
            letter: "A".into(),
            x: 130,
            y: -40,
            last_mover: 1,
        },
        animate: true,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "tile_moved");
    assert_eq!(json["tile"]["x"], 130);
    assert_eq!(json["animate"], true);
}
