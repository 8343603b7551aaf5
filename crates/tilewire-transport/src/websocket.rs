//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! The socket is split in two. Reads happen on the caller's task through
//! [`Connection::recv`]; writes are handed to a small writer task through
//! an unbounded channel, so [`Connection::send`] never waits on the
//! network. The bytes sitting in that channel are what
//! [`Connection::buffered_amount`] reports.
//!
//! Dropping a connection without [`Connection::close`] aborts the writer,
//! so frames still queued for an abandoned socket are never written.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Connection, ConnectionId, Connector, Endpoint, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A [`Connector`] that opens WebSocket connections.
///
/// `wss` endpoints need one of `tokio-tungstenite`'s TLS features enabled
/// in the final binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Self::Connection, Self::Error> {
        let url = endpoint.url();
        let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed {
                url: url.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ),
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %url, "WebSocket connected");

        Ok(WebSocketConnection::new(id, ws))
    }
}

/// A single WebSocket connection to the game server.
pub struct WebSocketConnection {
    id: ConnectionId,
    outgoing: mpsc::UnboundedSender<Message>,
    incoming: Mutex<SplitStream<WsStream>>,
    buffered: Arc<AtomicUsize>,
    writer: JoinHandle<()>,
    closing: AtomicBool,
}

impl WebSocketConnection {
    fn new(id: ConnectionId, ws: WsStream) -> Self {
        let (sink, stream) = ws.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let buffered = Arc::new(AtomicUsize::new(0));

        // After a clean close the writer drains the queue, sends the
        // close frame and exits. It also stops on the first write error.
        let writer =
            tokio::spawn(write_loop(id, sink, rx, Arc::clone(&buffered)));

        Self {
            id,
            outgoing: tx,
            incoming: Mutex::new(stream),
            buffered,
            writer,
            closing: AtomicBool::new(false),
        }
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        if !self.closing.load(Ordering::Acquire) {
            self.writer.abort();
        }
    }
}

async fn write_loop(
    id: ConnectionId,
    mut sink: SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
    buffered: Arc<AtomicUsize>,
) {
    while let Some(msg) = rx.recv().await {
        let len = match &msg {
            Message::Binary(data) => data.len(),
            _ => 0,
        };
        let closing = matches!(msg, Message::Close(_));
        let result = sink.send(msg).await;
        buffered.fetch_sub(len, Ordering::AcqRel);

        if let Err(e) = result {
            tracing::debug!(%id, error = %e, "WebSocket write failed");
            break;
        }
        if closing {
            break;
        }
    }
    tracing::trace!(%id, "WebSocket writer stopped");
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.buffered.fetch_add(data.len(), Ordering::AcqRel);
        let msg = Message::Binary(data.to_vec().into());
        self.outgoing.send(msg).map_err(|_| {
            self.buffered.fetch_sub(data.len(), Ordering::AcqRel);
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "writer has stopped",
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut incoming = self.incoming.lock().await;
        loop {
            match incoming.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    fn buffered_amount(&self) -> usize {
        self.buffered.load(Ordering::Acquire)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closing.store(true, Ordering::Release);
        self.outgoing.send(Message::Close(None)).map_err(|_| {
            TransportError::ConnectionClosed("already closed".into())
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
