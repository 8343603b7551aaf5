//! The session state machine.
//!
//! [`SessionMachine`] decides what every connection event and every
//! server message means for the session. It does no I/O: the client
//! driver feeds it events and acts on what it returns.
//!
//! | Event | Effect |
//! |---|---|
//! | socket opened | [`hello`](SessionMachine::hello) picks rejoin, conversation join or room join |
//! | identity while connecting | → `InProgress`, retry budget reset |
//! | identity while in progress | ignored |
//! | chat message | message sequence advances |
//! | session end, no local leave | → `Error(UnexpectedSessionEnd)` |
//! | bad id / bad conversation / conversation full | → `Error`, no retry |
//! | undecodable frame | connection dropped, retried |
//! | our hello fails to encode | → `Error(InvalidJoin)`, no retry |
//! | transport lost | → `Connecting`, retry after backoff until the budget is spent |
//! | local leave | → `Done` |

use std::time::Duration;

use tilewire_protocol::{ClientMessage, ProtocolError, ServerMessage};
use tilewire_timer::Backoff;
use tracing::{debug, error, info, warn};

use crate::{
    ConnectionState, JoinRequest, Session, SessionConfig, SessionError,
    SessionState,
};

/// What the driver should do with a server message after the session
/// has seen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Pass it on to the game state.
    Forward,
    /// Drop it.
    Ignore,
    /// Drop the connection and go through the reconnect path.
    Reconnect(SessionError),
    /// The session is over. Tear everything down.
    Stop(SessionError),
}

/// What the driver should do after losing the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    /// Try again after this delay.
    After(Duration),
    /// Don't. The session is finished; see
    /// [`SessionMachine::failure`].
    GiveUp,
}

/// Drives [`Session`] through its lifecycle.
#[derive(Debug)]
pub struct SessionMachine {
    session: Session,
    config: SessionConfig,
    join: JoinRequest,
    player_name: String,
    backoff: Backoff,
    failure: Option<SessionError>,
}

impl SessionMachine {
    pub fn new(
        config: SessionConfig,
        join: JoinRequest,
        player_name: impl Into<String>,
    ) -> Self {
        let config = config.validated();
        let backoff =
            Backoff::new(config.reconnect_delay, config.max_reconnect_delay);
        Self {
            session: Session::new(),
            config,
            join,
            player_name: player_name.into(),
            backoff,
            failure: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    /// The terminal failure, once the session is in `Error`.
    pub fn failure(&self) -> Option<&SessionError> {
        self.failure.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.session.state.is_finished()
    }

    /// Our player number, once the server has assigned one.
    pub fn player_num(&self) -> Option<u8> {
        self.session.player_num
    }

    /// Records that a connection attempt has started.
    pub fn connecting(&mut self) {
        self.session.connection = ConnectionState::Connecting;
    }

    /// Records that the socket is open and returns the first message to
    /// send on it.
    pub fn connected(&mut self) -> ClientMessage {
        self.session.connection = ConnectionState::Connected;
        self.hello()
    }

    /// The message that opens a connection.
    ///
    /// A known identity always wins, so reconnects resume the same seat
    /// and replay only the chat messages we haven't seen.
    pub fn hello(&self) -> ClientMessage {
        if let Some(person_id) = self.session.person_id {
            return ClientMessage::Reconnect {
                person_id,
                last_sequence: self.session.message_sequence,
            };
        }
        match &self.join {
            JoinRequest::Conversation { id } => {
                ClientMessage::JoinConversation {
                    conversation_id: *id,
                    player_name: self.player_name.clone(),
                }
            }
            JoinRequest::Room { room } => ClientMessage::NewPlayer {
                room: room.clone(),
                player_name: self.player_name.clone(),
            },
        }
    }

    /// Applies the session-level meaning of a server message.
    pub fn handle(&mut self, msg: &ServerMessage) -> Dispatch {
        if self.is_finished() {
            return Dispatch::Ignore;
        }

        match msg {
            ServerMessage::PlayerId {
                person_id,
                player_num,
            } => match self.session.state {
                SessionState::Connecting => {
                    info!(%person_id, player = player_num, "identity assigned");
                    self.session.person_id = Some(*person_id);
                    self.session.player_num = Some(*player_num);
                    self.session.state = SessionState::InProgress;
                    self.session.reconnect_attempts = 0;
                    self.backoff.reset();
                    Dispatch::Forward
                }
                _ => {
                    debug!(%person_id, "identity while in progress, ignoring");
                    Dispatch::Ignore
                }
            },
            ServerMessage::Message { .. } => {
                self.session.message_sequence =
                    self.session.message_sequence.wrapping_add(1);
                Dispatch::Forward
            }
            ServerMessage::ConversationId { conversation_id } => {
                info!(%conversation_id, "conversation id received");
                self.session.conversation_id = Some(*conversation_id);
                Dispatch::Forward
            }
            ServerMessage::End => self.fail(SessionError::UnexpectedSessionEnd),
            ServerMessage::BadPlayerId => {
                self.fail(SessionError::IdentityRejected)
            }
            ServerMessage::BadConversationId => {
                self.fail(SessionError::ConversationInvalid)
            }
            ServerMessage::ConversationFull => {
                self.fail(SessionError::ConversationFull)
            }
            _ => Dispatch::Forward,
        }
    }

    /// Decides what a frame that failed to decode means.
    ///
    /// Unknown opcodes come from newer servers and are skipped. Anything
    /// else means we can't trust the stream any more.
    pub fn on_decode_error(&mut self, err: ProtocolError) -> Dispatch {
        if self.is_finished() {
            return Dispatch::Ignore;
        }
        match err {
            ProtocolError::UnknownOpcode(op) => {
                debug!(opcode = op, "skipping frame with unknown opcode");
                Dispatch::Ignore
            }
            other => {
                warn!(error = %other, "undecodable frame, dropping connection");
                Dispatch::Reconnect(SessionError::ProtocolViolation(other))
            }
        }
    }

    /// Records a lost connection or a failed connection attempt and
    /// decides whether to try again.
    pub fn connection_lost(&mut self) -> Retry {
        self.session.connection = ConnectionState::Disconnected;
        if self.is_finished() {
            return Retry::GiveUp;
        }

        self.session.reconnect_attempts += 1;
        let attempts = self.session.reconnect_attempts;
        if self.session.state == SessionState::InProgress {
            self.session.state = SessionState::Connecting;
        }

        if attempts >= self.config.max_reconnect_attempts {
            self.fail(SessionError::TransportFailure { attempts });
            return Retry::GiveUp;
        }

        let delay = self.backoff.next_delay();
        warn!(attempt = attempts, ?delay, "connection lost, retrying");
        Retry::After(delay)
    }

    /// Our hello couldn't be encoded. Every reconnect would send the
    /// same bytes, so the session ends here.
    pub fn hello_rejected(&mut self, err: ProtocolError) -> Dispatch {
        if self.is_finished() {
            return Dispatch::Ignore;
        }
        self.fail(SessionError::InvalidJoin(err))
    }

    /// Local departure.
    ///
    /// Returns `true` if a `Leave` message should go out first, which
    /// is only worth trying on an open connection.
    pub fn leave(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        let connected = self.session.connection == ConnectionState::Connected;
        info!(connected, "leaving session");
        self.session.state = SessionState::Done;
        self.session.connection = ConnectionState::Disconnected;
        connected
    }

    fn fail(&mut self, err: SessionError) -> Dispatch {
        error!(error = %err, key = err.message_key(), "session failed");
        self.session.state = SessionState::Error;
        self.session.connection = ConnectionState::Disconnected;
        self.failure = Some(err.clone());
        Dispatch::Stop(err)
    }
}
