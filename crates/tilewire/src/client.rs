//! The client driver and its handle.
//!
//! [`Client::start`] spawns one Tokio task, the driver, which owns all
//! protocol state: the connection, the session machine, the game state,
//! the outbound batcher and every timer. The outside world talks to it
//! through a command channel and hears back on an event channel. Nothing
//! is shared, so nothing is locked.
//!
//! The driver multiplexes everything in a single `tokio::select!` loop:
//!
//! ```text
//! ┌──────────────┐ commands  ┌─────────────────────────────┐  frames  ┌────────┐
//! │    Client    │ ────────→ │ driver                      │ ←──────→ │ server │
//! │   (handle)   │ ←──────── │  session · game · batcher   │          └────────┘
//! └──────────────┘  events   │  keep-alive · reconnect ·   │
//!                            │  flush retry · shout clear  │
//!                            │  connect attempt            │
//!                            └─────────────────────────────┘
//! ```
//!
//! Connection attempts are polled in the same loop, so commands,
//! including a `Leave`, are still handled while a handshake is pending.
//! Frames are processed in the order they arrive. When the session
//! reaches `Done` or `Error`, the driver cancels its timers, abandons any
//! pending attempt, closes the connection and exits.

use tilewire_game::{GameError, GameEvent, Synchronizer, check_tile_capacity};
use tilewire_protocol::{ClientMessage, ServerMessage, decode, limits};
use tilewire_session::{Dispatch, Retry, SessionMachine, SessionState};
use tilewire_timer::Deadline;
use tilewire_transport::{Connection, Connector, TransportError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::truncate;
use crate::connection::ConnectAttempt;
use crate::outbound::{Flush, OutboundBatcher, TypingState};
use crate::{
    ClientConfig, ClientError, ClientEvent, ConnectionManager, Snapshot,
};

type Reply<T> = oneshot::Sender<Result<T, ClientError>>;

/// Commands sent from the [`Client`] handle to the driver.
///
/// Variants with a `reply` are request/response; the rest are
/// fire-and-forget.
enum Command {
    SendMessage { text: String },
    SetTyping { typing: bool },
    MoveTile { tile: u8, x: i16, y: i16 },
    TakeTurn { reply: Reply<()> },
    Shout { reply: Reply<()> },
    SetTileCapacity { n_tiles: u8, reply: Reply<()> },
    Snapshot { reply: oneshot::Sender<Snapshot> },
    Leave { reply: oneshot::Sender<()> },
}

// ---------------------------------------------------------------------------
// Client handle
// ---------------------------------------------------------------------------

/// Handle to a running client.
///
/// Dropping the handle makes the driver leave the game: it sends a
/// best-effort `Leave` if connected and shuts down.
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl Client {
    /// Starts a client and begins connecting right away.
    ///
    /// Returns the handle and the receiving end of the event channel.
    /// The channel closes when the driver exits.
    pub fn start<C>(
        connector: C,
        config: ClientConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>)
    where
        C: Connector<Error = TransportError>,
        C::Connection: Connection<Error = TransportError>,
    {
        let config = config.validated();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let driver = Driver::new(connector, config, cmd_rx, event_tx);
        let task = tokio::spawn(driver.run());

        (
            Self {
                commands: cmd_tx,
                task,
            },
            event_rx,
        )
    }

    /// Sends a chat message. Messages longer than the protocol allows
    /// are cut on a character boundary.
    ///
    /// While the connection is down, the message is held and sent after
    /// the next rejoin.
    pub fn send_message(&self, text: &str) -> Result<(), ClientError> {
        if text.contains('\0') {
            return Err(tilewire_protocol::ProtocolError::EmbeddedNul.into());
        }
        let cut = truncate(text, limits::MAX_MESSAGE_LENGTH);
        if cut.len() < text.len() {
            warn!(
                len = text.len(),
                max = limits::MAX_MESSAGE_LENGTH,
                "chat message too long, truncating"
            );
        }
        self.command(Command::SendMessage {
            text: cut.to_owned(),
        })
    }

    /// Sets our typing indicator. Only changes reach the server.
    pub fn set_typing(&self, typing: bool) -> Result<(), ClientError> {
        self.command(Command::SetTyping { typing })
    }

    /// Reports that we dragged a tile. Rapid moves of the same tile are
    /// coalesced into one update with the latest position.
    pub fn move_tile(&self, tile: u8, x: i16, y: i16) -> Result<(), ClientError> {
        self.command(Command::MoveTile { tile, x, y })
    }

    /// Takes a turn, if the game state allows it.
    pub async fn take_turn(&self) -> Result<(), ClientError> {
        self.request(|reply| Command::TakeTurn { reply }).await?
    }

    /// Shouts, if the game state allows it.
    pub async fn shout(&self) -> Result<(), ClientError> {
        self.request(|reply| Command::Shout { reply }).await?
    }

    /// Asks the server to play with `n_tiles` tiles.
    pub async fn set_tile_capacity(&self, n_tiles: u8) -> Result<(), ClientError> {
        check_tile_capacity(n_tiles)?;
        self.request(|reply| Command::SetTileCapacity { n_tiles, reply })
            .await?
    }

    /// A copy of the current session and game state.
    pub async fn snapshot(&self) -> Result<Snapshot, ClientError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Leaves the game and waits for the driver to shut down.
    pub async fn leave(self) -> Result<(), ClientError> {
        let result = self.request(|reply| Command::Leave { reply }).await;
        let Self { commands, task } = self;
        drop(commands);
        if let Err(e) = task.await {
            warn!(error = %e, "client driver did not shut down cleanly");
        }
        result
    }

    /// Whether the driver is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    fn command(&self, cmd: Command) -> Result<(), ClientError> {
        self.commands.send(cmd).map_err(|_| ClientError::Closed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(make(reply_tx))?;
        reply_rx.await.map_err(|_| ClientError::Closed)
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// The task that owns all protocol state.
struct Driver<C: Connector> {
    connection: ConnectionManager<C>,
    attempt: Option<ConnectAttempt<C::Connection>>,
    machine: SessionMachine,
    sync: Synchronizer,
    batcher: OutboundBatcher,
    typing: TypingState,
    reconnect: Deadline,
    flush_retry: Deadline,
    shout_clear: Deadline,
    config: ClientConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl<C> Driver<C>
where
    C: Connector<Error = TransportError>,
    C::Connection: Connection<Error = TransportError>,
{
    fn new(
        connector: C,
        config: ClientConfig,
        commands: mpsc::UnboundedReceiver<Command>,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Self {
        let connection = ConnectionManager::new(
            connector,
            config.endpoint.clone(),
            config.keep_alive_interval,
            config.connect_timeout,
        );
        let machine = SessionMachine::new(
            config.session.clone(),
            config.join.clone(),
            config.player_name.clone(),
        );
        Self {
            connection,
            attempt: None,
            machine,
            sync: Synchronizer::new(),
            batcher: OutboundBatcher::new(),
            typing: TypingState::default(),
            reconnect: Deadline::new("reconnect"),
            flush_retry: Deadline::new("flush-retry"),
            shout_clear: Deadline::new("shout-clear"),
            config,
            commands,
            events,
        }
    }

    async fn run(mut self) {
        info!(url = %self.connection.endpoint().url(), "client starting");
        self.connect();

        while !self.machine.is_finished() {
            tokio::select! {
                result = next_attempt(&mut self.attempt) => {
                    self.attempt = None;
                    self.on_connect(result).await;
                }
                frame = self.connection.recv() => {
                    self.on_frame(frame).await;
                }
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd).await,
                    None => {
                        debug!("client handle dropped, leaving");
                        self.leave().await;
                    }
                },
                _ = self.connection.keep_alive().wait() => {
                    if let Err(e) = self.connection.send_keep_alive().await {
                        self.send_failed(e).await;
                    }
                }
                _ = self.reconnect.wait() => {
                    self.reconnect.cancel();
                    self.connect();
                }
                _ = self.flush_retry.wait() => {
                    self.flush_retry.cancel();
                    self.flush().await;
                }
                _ = self.shout_clear.wait() => {
                    self.shout_clear.cancel();
                    let events = self.sync.clear_shout();
                    self.emit_game(events);
                }
            }
        }

        self.teardown().await;
        info!(state = ?self.machine.state(), "client stopped");
    }

    // -- Connection lifecycle ---------------------------------------------

    /// Starts a connection attempt. Its result arrives in
    /// [`on_connect`](Self::on_connect).
    fn connect(&mut self) {
        self.machine.connecting();
        self.emit(ClientEvent::ConnectionChanged {
            connection: self.machine.session().connection,
        });
        self.attempt = Some(self.connection.attempt());
    }

    async fn on_connect(
        &mut self,
        result: Result<C::Connection, TransportError>,
    ) {
        let before = self.machine.state();
        let conn = match result {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.connection_lost(before).await;
                return;
            }
        };

        self.connection.attach(conn);
        let hello = self.machine.connected();
        self.emit(ClientEvent::ConnectionChanged {
            connection: self.machine.session().connection,
        });
        match self.connection.send(&hello).await {
            Ok(()) => self.after_connect().await,
            Err(ClientError::Protocol(e)) => {
                self.machine.hello_rejected(e);
                self.report_state(before);
            }
            Err(e) => self.send_failed(e).await,
        }
    }

    /// Replays local state the server lost with the old connection.
    async fn after_connect(&mut self) {
        if let Some(msg) = self.typing.sync() {
            if !self.send(&msg).await {
                return;
            }
        }
        let queued: Vec<_> = self.batcher.drain_queued().collect();
        for msg in queued {
            if !self.send(&msg).await {
                return;
            }
        }
        self.flush().await;
    }

    /// Handles the loss of the connection or a failed connect attempt.
    async fn connection_lost(&mut self, before: SessionState) {
        self.connection.disconnect();
        self.flush_retry.cancel();
        self.typing.connection_lost();

        match self.machine.connection_lost() {
            Retry::After(delay) => {
                self.reconnect.arm(delay);
            }
            Retry::GiveUp => {
                self.reconnect.cancel();
            }
        }
        self.emit(ClientEvent::ConnectionChanged {
            connection: self.machine.session().connection,
        });
        self.report_state(before);
    }

    async fn teardown(&mut self) {
        self.attempt = None;
        self.reconnect.cancel();
        self.flush_retry.cancel();
        self.shout_clear.cancel();
        self.batcher.clear();
        if self.connection.is_connected() {
            self.connection.close().await;
        }
    }

    /// Sends a message, treating a transport failure as a lost
    /// connection. Returns whether the message went out.
    async fn send(&mut self, msg: &ClientMessage) -> bool {
        match self.connection.send(msg).await {
            Ok(()) => true,
            Err(e) => {
                self.send_failed(e).await;
                false
            }
        }
    }

    async fn send_failed(&mut self, err: ClientError) {
        match err {
            ClientError::Transport(e) => {
                warn!(error = %e, "send failed");
                let before = self.machine.state();
                self.connection_lost(before).await;
            }
            other => warn!(error = %other, "message not sent"),
        }
    }

    // -- Inbound ----------------------------------------------------------

    async fn on_frame(&mut self, frame: Result<Option<Vec<u8>>, TransportError>) {
        let before = self.machine.state();
        let data = match frame {
            Ok(Some(data)) => data,
            Ok(None) => {
                info!("connection closed by server");
                self.connection_lost(before).await;
                return;
            }
            Err(e) => {
                warn!(error = %e, "receive failed");
                self.connection_lost(before).await;
                return;
            }
        };

        let dispatch = match decode::<ServerMessage>(&data) {
            Ok(msg) => {
                debug!(opcode = data[0], len = data.len(), "received");
                let dispatch = self.machine.handle(&msg);
                if dispatch == Dispatch::Forward {
                    self.apply(&msg);
                }
                dispatch
            }
            Err(e) => self.machine.on_decode_error(e),
        };

        match dispatch {
            Dispatch::Forward | Dispatch::Ignore => {}
            Dispatch::Reconnect(err) => {
                warn!(error = %err, "dropping connection");
                self.connection_lost(before).await;
                return;
            }
            Dispatch::Stop(_) => {}
        }
        self.report_state(before);
    }

    fn apply(&mut self, msg: &ServerMessage) {
        if let ServerMessage::ConversationId { conversation_id } = msg {
            self.emit(ClientEvent::conversation(*conversation_id));
        }
        let events = self.sync.apply(msg);
        if events
            .iter()
            .any(|e| matches!(e, GameEvent::PlayerShouted { .. }))
        {
            self.shout_clear.arm(self.config.shout_duration);
        }
        self.emit_game(events);
    }

    // -- Commands ---------------------------------------------------------

    async fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::SendMessage { text } => {
                let msg = ClientMessage::SendMessage { text };
                if self.connection.is_connected() {
                    self.send(&msg).await;
                } else {
                    debug!("not connected, holding chat message");
                    self.batcher.queue(msg);
                }
            }
            Command::SetTyping { typing } => {
                let connected = self.connection.is_connected();
                if let Some(msg) = self.typing.set(typing, connected) {
                    self.send(&msg).await;
                }
            }
            Command::MoveTile { tile, x, y } => {
                self.batcher.mark_dirty(tile, x, y);
                self.flush().await;
            }
            Command::TakeTurn { reply } => {
                let check = self.sync.state().check_turn();
                let result = self.gated_send(ClientMessage::Turn, check).await;
                let _ = reply.send(result);
            }
            Command::Shout { reply } => {
                let check = self.sync.state().check_shout();
                let result = self.gated_send(ClientMessage::Shout, check).await;
                let _ = reply.send(result);
            }
            Command::SetTileCapacity { n_tiles, reply } => {
                let result = self
                    .connection
                    .send(&ClientMessage::SetNTiles { n_tiles })
                    .await;
                let _ = reply.send(self.settle(result).await);
            }
            Command::Snapshot { reply } => {
                let snapshot =
                    Snapshot::new(self.machine.session(), self.sync.snapshot());
                let _ = reply.send(snapshot);
            }
            Command::Leave { reply } => {
                self.leave().await;
                let _ = reply.send(());
            }
        }
    }

    /// Sends a turn or shout if the eligibility check passed.
    async fn gated_send(
        &mut self,
        msg: ClientMessage,
        check: Result<(), GameError>,
    ) -> Result<(), ClientError> {
        if let Err(denied) = check {
            debug!(%denied, "action not allowed");
            return Err(denied.into());
        }
        let result = self.connection.send(&msg).await;
        self.settle(result).await
    }

    /// Passes a send result to the caller, handling a transport failure
    /// on the way.
    async fn settle(
        &mut self,
        result: Result<(), ClientError>,
    ) -> Result<(), ClientError> {
        if let Err(ClientError::Transport(e)) = &result {
            warn!(error = %e, "send failed");
            let before = self.machine.state();
            self.connection_lost(before).await;
        }
        result
    }

    async fn flush(&mut self) {
        if !self.connection.is_connected() {
            return;
        }
        match self.batcher.flush(self.connection.buffered_amount()) {
            Flush::Idle => {}
            Flush::Deferred => {
                self.flush_retry.arm_if_idle(self.config.flush_retry_interval);
            }
            Flush::Sent(moves) => {
                debug!(tiles = moves.len(), "flushing tile moves");
                for msg in moves {
                    if !self.send(&msg).await {
                        return;
                    }
                }
            }
        }
    }

    async fn leave(&mut self) {
        let before = self.machine.state();
        if self.machine.leave() {
            if let Err(e) = self.connection.send(&ClientMessage::Leave).await {
                debug!(error = %e, "leave not sent");
            }
        }
        self.report_state(before);
    }

    // -- Events -----------------------------------------------------------

    fn report_state(&mut self, before: SessionState) {
        let state = self.machine.state();
        if state == before {
            return;
        }
        self.emit(ClientEvent::StateChanged { state });
        if state == SessionState::Error {
            if let Some(err) = self.machine.failure() {
                self.emit(ClientEvent::failed(err.clone()));
            }
        }
    }

    fn emit_game(&self, events: Vec<GameEvent>) {
        for event in events {
            self.emit(ClientEvent::Game(event));
        }
    }

    fn emit(&self, event: ClientEvent) {
        // The receiver may be gone; the driver keeps going regardless.
        let _ = self.events.send(event);
    }
}

/// Resolves with the pending attempt's result. Pends forever when there
/// is none, so it can sit in `tokio::select!` unconditionally.
async fn next_attempt<T>(
    attempt: &mut Option<ConnectAttempt<T>>,
) -> Result<T, TransportError> {
    match attempt {
        Some(attempt) => attempt.await,
        None => std::future::pending().await,
    }
}
