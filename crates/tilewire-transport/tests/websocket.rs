//! Integration tests for the WebSocket transport.
//!
//! These tests spin up a real loopback WebSocket server with
//! `tokio-tungstenite` and connect to it through [`WebSocketConnector`],
//! so frames actually cross a socket.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tilewire_transport::{
        Connection, Connector, Endpoint, WebSocketConnector,
    };
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Helper: binds a listener on a free port and returns an endpoint
    /// pointing at it plus a task that accepts one WebSocket client.
    async fn serve_one() -> (Endpoint, tokio::task::JoinHandle<ServerWs>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let port = listener.local_addr().unwrap().port();
        let endpoint = Endpoint::new("127.0.0.1", false).with_ports(port, port);

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("should accept");
            tokio_tungstenite::accept_async(stream)
                .await
                .expect("handshake should succeed")
        });
        (endpoint, handle)
    }

    #[tokio::test]
    async fn test_connect_send_and_receive() {
        let (endpoint, server) = serve_one().await;

        let conn = WebSocketConnector
            .connect(&endpoint)
            .await
            .expect("client should connect");
        let mut server_ws = server.await.expect("task should complete");

        assert!(conn.id().into_inner() > 0);

        // --- Server sends, client receives ---
        server_ws
            .send(Message::Binary(vec![0x07].into()))
            .await
            .unwrap();
        let frame = conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(frame, vec![0x07]);

        // --- Client sends, server receives ---
        conn.send(&[0x83]).await.expect("send should succeed");
        let msg = server_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), &[0x83]);
    }

    #[tokio::test]
    async fn test_frames_keep_their_boundaries() {
        let (endpoint, server) = serve_one().await;
        let conn = WebSocketConnector.connect(&endpoint).await.unwrap();
        let mut server_ws = server.await.unwrap();

        server_ws
            .send(Message::Binary(vec![0x02, 50].into()))
            .await
            .unwrap();
        server_ws
            .send(Message::Binary(vec![0x06, 1].into()))
            .await
            .unwrap();

        assert_eq!(conn.recv().await.unwrap().unwrap(), vec![0x02, 50]);
        assert_eq!(conn.recv().await.unwrap().unwrap(), vec![0x06, 1]);
    }

    #[tokio::test]
    async fn test_buffered_amount_drains_to_zero() {
        let (endpoint, server) = serve_one().await;
        let conn = WebSocketConnector.connect(&endpoint).await.unwrap();
        let mut server_ws = server.await.unwrap();

        for _ in 0..10 {
            conn.send(&[0x88, 1, 0, 0, 0, 0]).await.unwrap();
        }
        for _ in 0..10 {
            server_ws.next().await.unwrap().unwrap();
        }

        // The writer task decrements after each frame is flushed.
        let drained = tokio::time::timeout(Duration::from_secs(5), async {
            while conn.buffered_amount() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(drained.is_ok(), "buffer should drain");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_server_close() {
        let (endpoint, server) = serve_one().await;
        let conn = WebSocketConnector.connect(&endpoint).await.unwrap();
        let mut server_ws = server.await.unwrap();

        server_ws.close(None).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_client_close_reaches_server() {
        let (endpoint, server) = serve_one().await;
        let conn = WebSocketConnector.connect(&endpoint).await.unwrap();
        let mut server_ws = server.await.unwrap();

        conn.close().await.expect("close should succeed");

        let msg = server_ws.next().await.unwrap().unwrap();
        assert!(msg.is_close());
    }

    #[tokio::test]
    async fn test_close_flushes_queued_frames() {
        let (endpoint, server) = serve_one().await;
        let conn = WebSocketConnector.connect(&endpoint).await.unwrap();
        let mut server_ws = server.await.unwrap();

        conn.send(&[0x84]).await.unwrap();
        conn.close().await.unwrap();
        drop(conn);

        let msg = server_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), &[0x84]);
        assert!(server_ws.next().await.unwrap().unwrap().is_close());
    }

    #[tokio::test]
    async fn test_drop_without_close_discards_queued_frames() {
        let (endpoint, server) = serve_one().await;
        let conn = WebSocketConnector.connect(&endpoint).await.unwrap();
        let mut server_ws = server.await.unwrap();

        // Queued but not yet written: the writer hasn't run since.
        conn.send(&[0x88, 1, 0, 0, 0, 0]).await.unwrap();
        drop(conn);

        let next = tokio::time::timeout(Duration::from_secs(5), server_ws.next())
            .await
            .expect("server should see the socket go away");
        assert!(
            !matches!(next, Some(Ok(Message::Binary(_)))),
            "abandoned frame was written: {next:?}"
        );
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Bind then drop to get a port nobody is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = Endpoint::new("127.0.0.1", false).with_ports(port, port);
        let result = WebSocketConnector.connect(&endpoint).await;
        assert!(result.is_err());
    }
}
