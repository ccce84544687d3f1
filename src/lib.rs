//! # Chatroom Client
//!
//! Realtime chat-room client speaking a small JSON frame protocol over a
//! single WebSocket connection.
//!
//! ## Components
//!
//! - [`codec`]: outgoing intents to frames, frames to typed [`ServerMessage`]s
//! - [`connection`]: the single live connection and its
//!   `Idle → Connecting → Open → Closed` lifecycle
//! - [`typing`]: debounces edit pulses into start/stop typing notifications
//! - [`session`]: the [`SessionController`] tying them to a [`ChatUi`]
//!
//! Transports are pluggable: implement [`Transport`] and [`Connector`] for any
//! backend. The default `transport-websocket` feature provides
//! [`WebSocketConnector`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chatroom_client::{ChatConfig, SessionController, UserInput, WebSocketConnector};
//!
//! let config = ChatConfig::new("http://localhost:3000");
//! let connector = WebSocketConnector::new(config.connect_timeout);
//! let mut controller = SessionController::new(connector, my_ui, config);
//!
//! let (inputs, input_rx) = tokio::sync::mpsc::channel(64);
//! inputs.send(UserInput::Connect { room: "room1".into(), name: "Alice".into() }).await?;
//! controller.run(input_rx).await;
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod transports;
pub mod typing;
pub mod ui;

// Re-export primary types for ergonomic imports.
pub use config::ChatConfig;
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState, Endpoint};
pub use error::ChatError;
pub use message::{ChatMessage, MessageId, Origin};
pub use protocol::{ClientMessage, HistoryEntry, ServerMessage};
pub use session::{Session, SessionController, UserInput};
pub use transport::{Connector, Transport};
pub use typing::{TypingDebouncer, TypingState};
pub use ui::ChatUi;

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
