//! Owns the transport connection and its keep-alive timer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tilewire_protocol::{ClientMessage, Frame, encode};
use tilewire_timer::Deadline;
use tilewire_transport::{
    Connection, ConnectionId, Connector, Endpoint, TransportError,
};
use tracing::{debug, info};

use crate::ClientError;

/// An in-flight connection attempt. It owns everything it needs, so the
/// driver can poll it alongside its other work.
pub type ConnectAttempt<T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send>>;

/// One connection at a time to the game server.
///
/// Reconnection policy lives in the session machine; this type only
/// opens, uses and drops sockets. While connected, a keep-alive goes out
/// after `keep_alive_interval` without any other outbound message.
///
/// Opening is split in two so the caller never blocks on a handshake:
/// [`attempt`](Self::attempt) returns a future that gives up after
/// `connect_timeout`, and [`attach`](Self::attach) installs its result.
pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    endpoint: Endpoint,
    conn: Option<C::Connection>,
    keep_alive: Deadline,
    keep_alive_interval: Duration,
    connect_timeout: Duration,
}

impl<C> ConnectionManager<C>
where
    C: Connector<Error = TransportError>,
    C::Connection: Connection<Error = TransportError>,
{
    pub fn new(
        connector: C,
        endpoint: Endpoint,
        keep_alive_interval: Duration,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            connector: Arc::new(connector),
            endpoint,
            conn: None,
            keep_alive: Deadline::new("keep-alive"),
            keep_alive_interval,
            connect_timeout,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.conn.as_ref().map(Connection::id)
    }

    /// Starts opening a new connection, dropping any current one.
    ///
    /// The attempt fails with [`TransportError::ConnectTimedOut`] if the
    /// handshake hasn't finished within the connect timeout. Dropping it
    /// abandons the handshake.
    pub fn attempt(&mut self) -> ConnectAttempt<C::Connection> {
        self.disconnect();
        let connector = Arc::clone(&self.connector);
        let endpoint = self.endpoint.clone();
        let timeout = self.connect_timeout;
        debug!(url = %endpoint.url(), ?timeout, "connecting");

        Box::pin(async move {
            match tokio::time::timeout(timeout, connector.connect(&endpoint)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::ConnectTimedOut {
                    url: endpoint.url(),
                    timeout,
                }),
            }
        })
    }

    /// Installs the connection a finished [`attempt`](Self::attempt)
    /// produced.
    pub fn attach(&mut self, conn: C::Connection) -> ConnectionId {
        self.disconnect();
        let conn_id = conn.id();
        info!(%conn_id, url = %self.endpoint.url(), "connected");
        self.conn = Some(conn);
        conn_id
    }

    /// Encodes and queues a message, restarting the keep-alive countdown.
    pub async fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        let conn = self.conn.as_ref().ok_or(ClientError::NotConnected)?;
        let frame = encode(msg)?;
        conn.send(&frame).await?;
        debug!(
            conn_id = %conn.id(),
            opcode = msg.opcode(),
            len = frame.len(),
            "sent"
        );
        self.keep_alive.arm(self.keep_alive_interval);
        Ok(())
    }

    /// Receives the next frame.
    ///
    /// Pends forever while disconnected, so it can sit in a
    /// `tokio::select!` unconditionally.
    pub async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        match &self.conn {
            Some(conn) => conn.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Bytes the transport hasn't written yet. Zero while disconnected.
    pub fn buffered_amount(&self) -> usize {
        self.conn.as_ref().map_or(0, Connection::buffered_amount)
    }

    /// The keep-alive deadline. Only armed while connected.
    pub fn keep_alive(&self) -> &Deadline {
        &self.keep_alive
    }

    /// Sends the keep-alive that [`keep_alive`](Self::keep_alive)
    /// asked for.
    pub async fn send_keep_alive(&mut self) -> Result<(), ClientError> {
        self.keep_alive.cancel();
        debug!("idle, sending keep-alive");
        self.send(&ClientMessage::KeepAlive).await
    }

    /// Drops the connection without a closing handshake.
    pub fn disconnect(&mut self) {
        self.keep_alive.cancel();
        if let Some(conn) = self.conn.take() {
            debug!(conn_id = %conn.id(), "connection dropped");
        }
    }

    /// Closes the connection cleanly. Anything already queued is written
    /// first.
    pub async fn close(&mut self) {
        self.keep_alive.cancel();
        if let Some(conn) = self.conn.take() {
            let conn_id = conn.id();
            if let Err(e) = conn.close().await {
                debug!(%conn_id, error = %e, "close failed");
            } else {
                debug!(%conn_id, "connection closed");
            }
        }
    }
}
