//! Transport abstraction layer for tilewire.
//!
//! Provides the [`Connector`] and [`Connection`] traits that hide which
//! network protocol carries the binary frames, plus the [`Endpoint`] that
//! says where to connect.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
///
/// Every (re)connect gets a fresh id, which makes it easy to tell apart
/// log lines from successive sockets of the same session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where the game server lives.
///
/// The server listens on two ports: one for plain and one for TLS
/// WebSockets. Which one to use follows from whether the embedding page
/// (or app) is itself served securely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or address, without scheme or port.
    pub host: String,
    /// Use `wss` on [`Self::secure_port`] instead of `ws` on
    /// [`Self::plain_port`].
    pub secure: bool,
    pub plain_port: u16,
    pub secure_port: u16,
}

impl Endpoint {
    pub const DEFAULT_PLAIN_PORT: u16 = 5142;
    pub const DEFAULT_SECURE_PORT: u16 = 5143;

    /// An endpoint on the default ports.
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
            plain_port: Self::DEFAULT_PLAIN_PORT,
            secure_port: Self::DEFAULT_SECURE_PORT,
        }
    }

    /// Overrides both ports.
    pub fn with_ports(mut self, plain_port: u16, secure_port: u16) -> Self {
        self.plain_port = plain_port;
        self.secure_port = secure_port;
        self
    }

    /// The WebSocket URL for this endpoint.
    pub fn url(&self) -> String {
        if self.secure {
            format!("wss://{}:{}/", self.host, self.secure_port)
        } else {
            format!("ws://{}:{}/", self.host, self.plain_port)
        }
    }
}

/// Opens connections to the game server.
///
/// The returned futures are `Send` so a client driver generic over the
/// connector can run on a spawned task. Implementations can still use
/// `async fn`.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;
    /// The error type for connect operations.
    type Error: std::error::Error + Send + Sync;

    /// Opens a new connection. Resolves once the connection is usable.
    fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A single connection that can send and receive whole frames.
///
/// Each call to [`recv`](Connection::recv) yields exactly one frame; the
/// transport is responsible for message boundaries.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Queues a frame for sending.
    ///
    /// Returns once the frame is queued, not once it is on the wire. Use
    /// [`buffered_amount`](Connection::buffered_amount) to see how much is
    /// still waiting.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next frame from the server.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Bytes queued by [`send`](Connection::send) that haven't been written
    /// to the socket yet.
    fn buffered_amount(&self) -> usize;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
