//! Session types: what the client knows about its own seat in a game.
//!
//! A "session" outlives individual connections. It remembers:
//! - WHO we are (`PersonId` and player number, once assigned)
//! - WHERE in the lifecycle we are (connecting, in progress, done, error)
//! - HOW the current socket is doing
//! - HOW MANY chat messages we've seen, so a rejoin can skip them

use std::time::Duration;

use serde::Serialize;
use tilewire_protocol::{ConversationId, PersonId};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Reconnection policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    /// Consecutive transport failures after which the session gives up.
    ///
    /// The counter resets whenever the server assigns us an identity.
    /// Default: 10.
    pub max_reconnect_attempts: u32,

    /// Delay before the first reconnect attempt. Default: 2 seconds.
    pub reconnect_delay: Duration,

    /// Ceiling for the doubling reconnect delay. Default: 32 seconds.
    pub max_reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 10,
            reconnect_delay: Duration::from_secs(2),
            max_reconnect_delay: Duration::from_secs(32),
        }
    }
}

impl SessionConfig {
    /// Returns a copy with out-of-range values replaced by the nearest
    /// usable ones.
    pub fn validated(mut self) -> Self {
        if self.max_reconnect_attempts == 0 {
            tracing::warn!("max_reconnect_attempts is 0, clamping to 1");
            self.max_reconnect_attempts = 1;
        }
        if self.max_reconnect_delay < self.reconnect_delay {
            tracing::warn!(
                reconnect_delay = ?self.reconnect_delay,
                max_reconnect_delay = ?self.max_reconnect_delay,
                "max_reconnect_delay below reconnect_delay, raising it"
            );
            self.max_reconnect_delay = self.reconnect_delay;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
///
/// ```text
///   Connecting ──(identity)──→ InProgress ──(leave)──→ Done
///       ↑                          │
///       └─────(transport lost)─────┘
///
///   any state ──(terminal failure)──→ Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the server to assign (or confirm) our identity.
    Connecting,
    InProgress,
    /// We left. Terminal.
    Done,
    /// A terminal failure. The cause is kept by the
    /// [`SessionMachine`](crate::SessionMachine).
    Error,
}

impl SessionState {
    /// `Done` or `Error`.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// State of the current socket, independent of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The client's record of its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Assigned by the server on first join and reused on every rejoin.
    pub person_id: Option<PersonId>,

    /// Our player number in the game. Assigned together with
    /// `person_id`.
    pub player_num: Option<u8>,

    /// Set when the server tells us the id of the conversation we're in.
    pub conversation_id: Option<ConversationId>,

    pub state: SessionState,
    pub connection: ConnectionState,

    /// Consecutive transport failures since the last identity.
    pub reconnect_attempts: u32,

    /// Number of chat messages received, wrapping. Sent on rejoin.
    pub message_sequence: u16,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            person_id: None,
            player_num: None,
            conversation_id: None,
            state: SessionState::Connecting,
            connection: ConnectionState::Disconnected,
            reconnect_attempts: 0,
            message_sequence: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_clamps_zero_attempts() {
        let config = SessionConfig {
            max_reconnect_attempts: 0,
            ..SessionConfig::default()
        }
        .validated();
        assert_eq!(config.max_reconnect_attempts, 1);
    }

    #[test]
    fn test_validated_raises_max_delay() {
        let config = SessionConfig {
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_delay: Duration::from_secs(1),
            ..SessionConfig::default()
        }
        .validated();
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_default_is_already_valid() {
        assert_eq!(
            SessionConfig::default().validated(),
            SessionConfig::default()
        );
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&SessionState::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
