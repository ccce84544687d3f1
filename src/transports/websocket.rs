//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! [`WebSocketTransport`] carries chat frames over a WebSocket connection and
//! [`WebSocketConnector`] dials one per connect attempt. Both `ws://` and
//! `wss://` endpoints are supported; TLS is handled by
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), chatroom_client::ChatError> {
//! use chatroom_client::{Transport, WebSocketTransport};
//!
//! let mut transport =
//!     WebSocketTransport::connect("ws://localhost:3000/ws?room=room1&name=You").await?;
//! transport
//!     .send(r#"{"type":"typing","isTyping":true}"#.to_string())
//!     .await?;
//!
//! if let Some(Ok(frame)) = transport.recv().await {
//!     println!("received: {frame}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::connection::Endpoint;
use crate::error::ChatError;
use crate::transport::{Connector, Transport};

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] implementation backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method is cancel-safe. Dropping the future
/// returned by `recv` before it completes will not lose any frames.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
    /// Set once the read half has failed or seen a close frame.
    ended: bool,
}

impl WebSocketTransport {
    /// Establish a new WebSocket connection to the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Io`] if the URL is invalid or the connection
    /// cannot be established. When the underlying error is an I/O error its
    /// [`ErrorKind`](std::io::ErrorKind) is preserved.
    pub async fn connect(url: &str) -> Result<Self, ChatError> {
        tracing::debug!(url = %url, "connecting to WebSocket server");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            ChatError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "WebSocket connection established");

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
            ended: false,
        }
    }

    /// Establish a new WebSocket connection with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Timeout`] if the deadline elapses, or any error
    /// that [`connect`](Self::connect) may return.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, ChatError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| ChatError::Timeout)?
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: String) -> Result<(), ChatError> {
        if self.closed {
            return Err(ChatError::TransportClosed);
        }
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| ChatError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ChatError>> {
        if self.ended {
            return None;
        }
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    self.ended = true;
                    return Some(Err(ChatError::TransportReceive(e.to_string())));
                }
                None => {
                    self.ended = true;
                    return None;
                }
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    self.ended = true;
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // tungstenite queues the pong reply itself.
                }
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| ChatError::TransportSend(e.to_string()))
    }
}

/// Dials a [`WebSocketTransport`] for each connection attempt.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// Create a connector that gives up on a dial after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, endpoint: &Endpoint) -> Result<WebSocketTransport, ChatError> {
        WebSocketTransport::connect_with_timeout(endpoint.as_str(), self.connect_timeout).await
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    type ServerStream = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Accept one chat client on a local port.
    ///
    /// Returns the `http://` origin to configure and a receiver for the
    /// request path and query the client dialed.
    async fn chat_server<F, Fut>(handler: F) -> (String, oneshot::Receiver<String>)
    where
        F: FnOnce(ServerStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (uri_tx, uri_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let record = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let _ = uri_tx.send(req.uri().to_string());
                Ok(resp)
            };
            let ws = tokio_tungstenite::accept_hdr_async(tcp, record).await.unwrap();
            handler(ws).await;
        });

        (format!("http://{addr}"), uri_rx)
    }

    async fn dial(origin: &str, room: &str, name: &str) -> WebSocketTransport {
        let endpoint = Endpoint::build(origin, room, name).unwrap();
        WebSocketConnector::new(Duration::from_secs(5))
            .connect(&endpoint)
            .await
            .unwrap()
    }

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connector_dials_room_endpoint_path_and_query() {
        let (origin, uri) = chat_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let _transport = dial(&origin, "team chat", "Zoë").await;
        assert_eq!(uri.await.unwrap(), "/ws?room=team%20chat&name=Zo%C3%AB");
    }

    #[tokio::test]
    async fn connector_reports_refused_dial_as_io() {
        let endpoint = Endpoint::build("http://127.0.0.1:1", "room1", "You").unwrap();
        let err = WebSocketConnector::new(Duration::from_secs(5))
            .connect(&endpoint)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Io(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn connector_gives_up_after_connect_timeout() {
        // TEST-NET-1 is non-routable, so the dial never completes.
        let endpoint = Endpoint::build("ws://192.0.2.1:1", "room1", "You").unwrap();
        let err = WebSocketConnector::new(Duration::from_millis(50))
            .connect(&endpoint)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Timeout), "got {err:?}");
    }

    #[tokio::test]
    async fn init_then_typing_round_trip() {
        let (seen_tx, seen_rx) = oneshot::channel::<String>();
        let (origin, _uri) = chat_server(|mut ws| async move {
            ws.send(Message::Text(
                r#"{"type":"init","room":"lobby","name":"Alice","participants":1,"history":[]}"#
                    .into(),
            ))
            .await
            .unwrap();
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = seen_tx.send(text.to_string());
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = dial(&origin, "lobby", "Alice").await;

        let init = transport.recv().await.unwrap().unwrap();
        assert!(matches!(
            crate::codec::decode(&init).unwrap(),
            crate::protocol::ServerMessage::Init { participant_count: 1, .. }
        ));

        let typing = crate::codec::encode(&crate::protocol::ClientMessage::Typing {
            is_typing: true,
        })
        .unwrap();
        transport.send(typing).await.unwrap();
        assert_eq!(seen_rx.await.unwrap(), r#"{"type":"typing","isTyping":true}"#);

        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn control_and_binary_frames_between_chat_frames_are_skipped() {
        let (origin, _uri) = chat_server(|mut ws| async move {
            ws.send(Message::Ping(vec![1].into())).await.unwrap();
            ws.send(Message::Binary(vec![0xDE, 0xAD].into())).await.unwrap();
            ws.send(Message::Text(r#"{"type":"peer-joined","participants":2}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = dial(&origin, "lobby", "Alice").await;
        let frame = transport.recv().await.unwrap().unwrap();
        assert_eq!(frame, r#"{"type":"peer-joined","participants":2}"#);
    }

    #[tokio::test]
    async fn stream_stays_ended_after_server_close() {
        let (origin, _uri) = chat_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = dial(&origin, "lobby", "Alice").await;
        assert!(transport.recv().await.is_none());
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn message_after_client_close_is_rejected() {
        let (origin, _uri) = chat_server(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = dial(&origin, "lobby", "Alice").await;
        transport.close().await.unwrap();

        let err = transport
            .send(r#"{"type":"message","id":"c_1_a","text":"late"}"#.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::TransportClosed));
        transport.close().await.unwrap();
    }
}
