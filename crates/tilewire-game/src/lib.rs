//! Client-side game state for tilewire.
//!
//! The server is the authority on the board. This crate keeps a mirror
//! of it and turns the server's stream of updates into change
//! notifications:
//!
//! - [`GameState`] with its [`Player`]s and [`Tile`]s, plus the derived
//!   views the UI needs (remaining tiles, turn and shout eligibility)
//! - [`Synchronizer`], the reducer that applies each
//!   [`ServerMessage`](tilewire_protocol::ServerMessage)
//! - [`GameEvent`], what changed
//! - [`GameError`], local actions the current state doesn't allow

use std::time::Duration;

mod error;
mod event;
mod state;
mod synchronizer;

pub use error::GameError;
pub use event::GameEvent;
pub use state::{GameState, MAX_TILES, Player, Tile, check_tile_capacity};
pub use synchronizer::Synchronizer;
pub use tilewire_protocol::PlayerFlags;

/// How long a shout stays up unless a newer one replaces it.
pub const DEFAULT_SHOUT_DURATION: Duration = Duration::from_secs(10);
