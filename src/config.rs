//! Client configuration.

use std::time::Duration;

use crate::connection::{DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::typing::DEFAULT_TYPING_IDLE_TIMEOUT;

/// Room joined when the requested room is blank.
pub const DEFAULT_ROOM: &str = "room1";

/// Display name used when the requested name is blank.
pub const DEFAULT_NAME: &str = "You";

/// Default deadline for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`SessionController`](crate::SessionController).
///
/// The only required field is `server_url`; all others have defaults.
///
/// # Example
///
/// ```
/// use chatroom_client::ChatConfig;
/// use std::time::Duration;
///
/// let config = ChatConfig::new("http://localhost:3000")
///     .with_default_room("lobby")
///     .with_typing_idle_timeout(Duration::from_millis(1500));
/// assert_eq!(config.default_room, "lobby");
/// assert_eq!(config.default_name, "You");
/// ```
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Server origin, e.g. `https://chat.example.com`. `http(s)` and `ws(s)`
    /// are accepted; the endpoint path and query are derived from it.
    pub server_url: String,
    /// Room used when the user leaves the room blank. Defaults to `"room1"`.
    pub default_room: String,
    /// Name used when the user leaves the name blank. Defaults to `"You"`.
    pub default_name: String,
    /// Quiet period after the last edit before typing is reported stopped.
    ///
    /// Defaults to **900 ms**.
    pub typing_idle_timeout: Duration,
    /// Deadline for dialing the server. Defaults to **10 seconds**.
    pub connect_timeout: Duration,
    /// Capacity of the per-connection event channel.
    ///
    /// A full channel back-pressures the connection task; frames are never
    /// dropped. Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Deadline for closing a transport gracefully. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl ChatConfig {
    /// Create a configuration for the server at `server_url`.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            default_room: DEFAULT_ROOM.to_owned(),
            default_name: DEFAULT_NAME.to_owned(),
            typing_idle_timeout: DEFAULT_TYPING_IDLE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_default_room(mut self, room: impl Into<String>) -> Self {
        self.default_room = room.into();
        self
    }

    #[must_use]
    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    #[must_use]
    pub fn with_typing_idle_timeout(mut self, timeout: Duration) -> Self {
        self.typing_idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the capacity of the event channel. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// `room` trimmed, or the default room when blank.
    pub fn resolve_room(&self, room: &str) -> String {
        non_blank_or(room, &self.default_room)
    }

    /// `name` trimmed, or the default name when blank.
    pub fn resolve_name(&self, name: &str) -> String {
        non_blank_or(name, &self.default_name)
    }
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_owned()
    } else {
        value.to_owned()
    }
}
