//! Unified error type for the tilewire client.

use tilewire_game::GameError;
use tilewire_protocol::ProtocolError;
use tilewire_session::SessionError;
use tilewire_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `tilewire` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// variants let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The current game state doesn't allow the action.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The action needs an open connection and there isn't one right
    /// now. The session may still be reconnecting.
    #[error("not connected")]
    NotConnected,

    /// The client has shut down, either because it left or because the
    /// session failed.
    #[error("client is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let client_err: ClientError = err.into();
        assert!(matches!(client_err, ClientError::Transport(_)));
        assert!(client_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let client_err: ClientError = ProtocolError::EmbeddedNul.into();
        assert!(matches!(client_err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let client_err: ClientError = SessionError::ConversationFull.into();
        assert!(matches!(
            client_err,
            ClientError::Session(SessionError::ConversationFull)
        ));
    }

    #[test]
    fn test_from_game_error() {
        let client_err: ClientError = GameError::TurnNotAllowed.into();
        assert_eq!(
            client_err.to_string(),
            GameError::TurnNotAllowed.to_string()
        );
    }
}
