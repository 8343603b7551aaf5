//! # tilewire
//!
//! Real-time client for the shared word-tile game.
//!
//! tilewire keeps one long-lived session with the game server: it opens
//! and re-opens the connection, speaks the compact binary protocol,
//! mirrors the authoritative game state, and batches tile drags so they
//! don't swamp the socket. A presentation layer drives it through a
//! [`Client`] handle and renders the [`ClientEvent`]s it emits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tilewire::prelude::*;
//!
//! # async fn demo() -> Result<(), ClientError> {
//! let config = ClientConfig::builder()
//!     .host("gemelo.org")
//!     .secure(true)
//!     .room("eo")
//!     .player_name("Zamenhof")
//!     .build();
//!
//! let (client, mut events) = Client::start(WebSocketConnector, config);
//! client.send_message("Saluton!")?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! | Crate | Role |
//! |---|---|
//! | `tilewire-protocol` | message types, binary codec, invite tokens |
//! | `tilewire-transport` | `Connector`/`Connection` traits, WebSocket |
//! | `tilewire-timer` | cancelable deadlines, retry backoff |
//! | `tilewire-session` | identity, lifecycle, reconnection policy |
//! | `tilewire-game` | game state mirror and reducer |
//! | `tilewire` (this crate) | the client driver tying them together |

mod client;
mod config;
mod connection;
mod error;
mod event;
mod outbound;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use connection::ConnectionManager;
pub use error::ClientError;
pub use event::{ClientEvent, Snapshot};
pub use outbound::{Flush, OutboundBatcher, TypingState};

pub use tilewire_game as game;
pub use tilewire_protocol as protocol;
pub use tilewire_session as session;
pub use tilewire_transport as transport;

/// The types most applications need.
pub mod prelude {
    pub use crate::{Client, ClientConfig, ClientError, ClientEvent, Snapshot};
    pub use tilewire_game::{GameEvent, GameState, Player, Tile};
    pub use tilewire_protocol::{ConversationId, PlayerFlags, id_token};
    pub use tilewire_session::{
        ConnectionState, JoinRequest, SessionConfig, SessionError,
        SessionState,
    };
    pub use tilewire_transport::Endpoint;
    #[cfg(feature = "websocket")]
    pub use tilewire_transport::WebSocketConnector;
}
