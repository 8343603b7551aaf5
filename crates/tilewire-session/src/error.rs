//! Error types for the session layer.

use tilewire_protocol::ProtocolError;

/// Why a session stopped, or why a connection had to be dropped.
///
/// Every variant except [`ProtocolViolation`](Self::ProtocolViolation) is
/// terminal: once the session reports it, no further reconnects happen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The transport kept failing and the reconnect budget is spent.
    #[error("connection failed after {attempts} attempts")]
    TransportFailure { attempts: u32 },

    /// The server sent a frame we couldn't decode. The connection is
    /// dropped and retried like a transport failure.
    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolError),

    /// The server doesn't know the identity we tried to resume.
    #[error("the server rejected our player id")]
    IdentityRejected,

    /// The invite link points at a conversation that doesn't exist.
    #[error("the conversation id is not valid")]
    ConversationInvalid,

    #[error("the conversation is full")]
    ConversationFull,

    /// The server ended the session without us asking to leave.
    #[error("the server ended the session")]
    UnexpectedSessionEnd,

    /// Our own join message couldn't be encoded, so there is nothing
    /// to retry with.
    #[error("join message rejected: {0}")]
    InvalidJoin(ProtocolError),
}

impl SessionError {
    /// A stable key a presentation layer can look up a translated
    /// message with.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::TransportFailure { .. } => "error.transport_failure",
            Self::ProtocolViolation(_) => "error.protocol_violation",
            Self::IdentityRejected => "error.bad_player_id",
            Self::ConversationInvalid => "error.bad_conversation_id",
            Self::ConversationFull => "error.conversation_full",
            Self::UnexpectedSessionEnd => "error.session_ended",
            Self::InvalidJoin(_) => "error.invalid_join",
        }
    }

    /// Whether the session is over once this error is reported.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::ProtocolViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_protocol_violation_is_retryable() {
        let retryable =
            SessionError::from(ProtocolError::MalformedFrame("short".into()));
        assert!(!retryable.is_terminal());

        for err in [
            SessionError::TransportFailure { attempts: 10 },
            SessionError::IdentityRejected,
            SessionError::ConversationInvalid,
            SessionError::ConversationFull,
            SessionError::UnexpectedSessionEnd,
            SessionError::InvalidJoin(ProtocolError::EmbeddedNul),
        ] {
            assert!(err.is_terminal(), "{err:?}");
        }
    }

    #[test]
    fn test_message_keys_are_distinct() {
        let keys = [
            SessionError::TransportFailure { attempts: 1 }.message_key(),
            SessionError::ProtocolViolation(ProtocolError::EmbeddedNul)
                .message_key(),
            SessionError::IdentityRejected.message_key(),
            SessionError::ConversationInvalid.message_key(),
            SessionError::ConversationFull.message_key(),
            SessionError::UnexpectedSessionEnd.message_key(),
            SessionError::InvalidJoin(ProtocolError::EmbeddedNul).message_key(),
        ];
        let mut unique = keys.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn test_display() {
        let err = SessionError::TransportFailure { attempts: 3 };
        assert_eq!(err.to_string(), "connection failed after 3 attempts");
    }
}
