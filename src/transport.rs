//! Transport abstraction for the chat-room protocol.
//!
//! The [`Transport`] trait defines a bidirectional text frame channel between
//! the client and server. The chat protocol uses JSON text frames, so every
//! transport implementation must handle message framing internally.
//!
//! # Connection Setup
//!
//! Dialing is kept out of [`Transport`] and lives in [`Connector`]: the
//! connection manager owns a connector and asks it for a fresh transport on
//! every connect attempt, so a reconnect never reuses a spent socket.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use chatroom_client::connection::Endpoint;
//! use chatroom_client::error::ChatError;
//! use chatroom_client::transport::{Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, frame: String) -> Result<(), ChatError> {
//!         // Send the JSON text frame over your transport
//!         unimplemented!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, ChatError>> {
//!         // Receive the next JSON text frame
//!         // Return None when the connection is closed
//!         unimplemented!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), ChatError> {
//!         unimplemented!()
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     type Transport = MyTransport;
//!
//!     async fn connect(&self, endpoint: &Endpoint) -> Result<MyTransport, ChatError> {
//!         unimplemented!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::connection::Endpoint;
use crate::error::ChatError;

/// A bidirectional text frame transport for the chat-room protocol.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON frame.
/// Each call to [`recv`](Transport::recv) returns one complete JSON frame.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling it
/// again must not lose data.
///
/// # End of Stream
///
/// A receive error is diagnostic only. After yielding `Some(Err(_))` for a
/// fatal condition, the transport must yield `None` on a later call so the
/// connection loop observes the closure.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::TransportSend`] if the frame could not be sent, or
    /// [`ChatError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, frame: String) -> Result<(), ChatError>;

    /// Receive the next JSON text frame from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the connection is closed
    async fn recv(&mut self) -> Option<Result<String, ChatError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release resources in that case.
    async fn close(&mut self) -> Result<(), ChatError>;
}

/// Establishes a [`Transport`] to a chat endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport produced by a successful dial.
    type Transport: Transport;

    /// Dial `endpoint` and return a connected transport.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Io`] or [`ChatError::Timeout`] when the
    /// connection cannot be established.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Transport, ChatError>;
}
