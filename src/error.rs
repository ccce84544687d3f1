//! Error types for the chat-room client.

use thiserror::Error;

/// Errors that can occur when using the chat-room client.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Failed to send a frame through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was already closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize an outgoing protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An inbound frame was not a valid protocol message.
    ///
    /// Frames that fail to decode are a protocol violation by the server and
    /// are discarded without affecting the session.
    #[error("malformed frame: {0}")]
    Decode(#[source] serde_json::Error),

    /// Attempted an operation that requires an open connection.
    #[error("not connected to server")]
    NotConnected,

    /// The configured server URL cannot be turned into a chat endpoint.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for chat-room client operations.
pub type Result<T> = std::result::Result<T, ChatError>;
