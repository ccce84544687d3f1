//! Session controller: the orchestrator of one chat client.
//!
//! [`SessionController`] is the only mutator of the [`Session`] and of the
//! typing state. It consumes user input, connection events and the typing
//! idle timer on a single task, so every handler runs to completion before
//! the next signal is looked at and no locking is needed.
//!
//! # Example
//!
//! ```rust,ignore
//! let connector = WebSocketConnector::new(config.connect_timeout);
//! let mut controller = SessionController::new(connector, my_ui, config);
//!
//! let (inputs, input_rx) = tokio::sync::mpsc::channel(64);
//! inputs.send(UserInput::Connect { room: "lobby".into(), name: "Alice".into() }).await?;
//! controller.run(input_rx).await;
//! ```

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::config::ChatConfig;
use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState, Endpoint};
use crate::error::Result;
use crate::message::{now_millis, ChatMessage, MessageId};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::Connector;
use crate::typing::{TypingDebouncer, TypingState};
use crate::ui::ChatUi;

const STATUS_CONNECTION_ERROR: &str = "Connection error";
const STATUS_DISCONNECTED: &str = "Disconnected";
const LABEL_CONNECT: &str = "Connect";
const LABEL_DISCONNECT: &str = "Disconnect";
const FALLBACK_SERVER_ERROR: &str = "Error from server";

// ── Session ─────────────────────────────────────────────────────────

/// Client-side record of one room membership.
///
/// Created on a connect attempt with the requested room and name, then
/// overwritten with the server-confirmed values on `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub room_id: String,
    pub display_name: String,
    /// Last value reported by the server; never computed locally.
    pub participant_count: u32,
    pub connection_state: ConnectionState,
}

impl Session {
    fn connecting(room_id: String, display_name: String) -> Self {
        Self {
            room_id,
            display_name,
            participant_count: 0,
            connection_state: ConnectionState::Connecting,
        }
    }
}

// ── Input ───────────────────────────────────────────────────────────

/// User actions fed to [`SessionController::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Connect afresh, replacing any live connection.
    Connect { room: String, name: String },
    /// The connect button: disconnect if connected, connect otherwise.
    ToggleConnection { room: String, name: String },
    /// Close the connection.
    Disconnect,
    /// Send the compose field contents.
    SubmitMessage(String),
    /// The compose field was edited.
    InputChanged,
}

// ── Controller ──────────────────────────────────────────────────────

/// Drives one chat session against a [`ChatUi`].
pub struct SessionController<C: Connector, U: ChatUi> {
    config: ChatConfig,
    connection: ConnectionManager<C>,
    typing: TypingDebouncer,
    session: Option<Session>,
    ui: U,
}

impl<C: Connector, U: ChatUi> SessionController<C, U> {
    /// Create an idle controller. Nothing is dialed until a connect request.
    pub fn new(connector: C, ui: U, config: ChatConfig) -> Self {
        let connection = ConnectionManager::new(connector)
            .with_event_channel_capacity(config.event_channel_capacity)
            .with_shutdown_timeout(config.shutdown_timeout);
        let typing = TypingDebouncer::new(config.typing_idle_timeout);
        Self {
            config,
            connection,
            typing,
            session: None,
            ui,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The live session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn typing_state(&self) -> TypingState {
        self.typing.state()
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    // ── User actions ────────────────────────────────────────────────

    /// Connect to `room` as `name`, replacing any live connection.
    ///
    /// Blank values fall back to the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidEndpoint`](crate::ChatError::InvalidEndpoint)
    /// if the configured server URL is unusable; nothing changes in that case.
    pub fn connect(&mut self, room: &str, name: &str) -> Result<()> {
        let room = self.config.resolve_room(room);
        let name = self.config.resolve_name(name);
        let endpoint = Endpoint::build(&self.config.server_url, &room, &name)?;

        if let Some(old) = self.session.take() {
            debug!(room = %old.room_id, "discarding previous session");
        }
        self.typing.deactivate();
        self.connection.connect(endpoint);

        self.ui.set_status_text(&format!("Connecting to {room}..."));
        self.ui.set_connect_button_label(LABEL_DISCONNECT);
        self.ui.set_typing_indicator(None);
        self.session = Some(Session::connecting(room, name));
        Ok(())
    }

    /// The connect button: disconnect when a connection is live, otherwise
    /// connect to `room` as `name`.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    pub fn toggle_connection(&mut self, room: &str, name: &str) -> Result<()> {
        if self.connection.is_live() {
            self.disconnect();
            Ok(())
        } else {
            self.connect(room, name)
        }
    }

    /// Close the live connection, if any, and reset to disconnected.
    pub fn disconnect(&mut self) {
        if self.connection.close() {
            self.on_closed(Some("closed by client"));
        }
    }

    /// Send `text` as a chat message.
    ///
    /// Blank text, or no open connection, is a no-op returning `false`.
    /// Otherwise the frame is queued, the message is echoed locally, the
    /// compose field is cleared and typing is stopped.
    pub fn submit_message(&mut self, text: &str) -> bool {
        if !self.connection.is_open() {
            debug!("message not sent: connection is not open");
            return false;
        }
        let Some(session) = &self.session else {
            return false;
        };

        let timestamp = now_millis();
        let id = MessageId::generate(timestamp);
        let Some(message) = ChatMessage::local(id.clone(), &session.display_name, text, timestamp)
        else {
            return false;
        };

        let intent = ClientMessage::Message {
            id: id.to_string(),
            text: message.text.clone(),
        };
        if !self.send_intent(&intent) {
            return false;
        }

        self.ui.render_message(&message);
        self.ui.clear_compose_field();
        if let Some(stop) = self.typing.stop(Instant::now()) {
            self.send_intent(&stop);
        }
        true
    }

    /// Record one edit of the compose field.
    pub fn input_changed(&mut self) {
        if let Some(start) = self.typing.pulse(Instant::now()) {
            self.send_intent(&start);
        }
    }

    // ── Timer ───────────────────────────────────────────────────────

    /// When [`on_typing_timer`](Self::on_typing_timer) should next run.
    pub fn typing_deadline(&self) -> Option<Instant> {
        self.typing.deadline()
    }

    /// The typing idle timer fired.
    pub fn on_typing_timer(&mut self) {
        if let Some(stop) = self.typing.expire(Instant::now()) {
            self.send_intent(&stop);
        }
    }

    // ── Connection events ───────────────────────────────────────────

    /// Wait for the next connection event. Pending while disconnected.
    pub async fn next_connection_event(&mut self) -> ConnectionEvent {
        self.connection.next_event().await
    }

    /// Wait for the next connection event and handle it.
    pub async fn process_next_event(&mut self) {
        let event = self.connection.next_event().await;
        self.handle_connection_event(event);
    }

    /// Apply one connection event to the session and UI.
    pub fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => {
                debug!("socket open, awaiting init");
                self.typing.activate();
                if let Some(session) = self.session.as_mut() {
                    session.connection_state = ConnectionState::Open;
                }
            }
            ConnectionEvent::Frame(frame) => match codec::decode(&frame) {
                Ok(message) => self.handle_server_message(message),
                Err(e) => debug!("discarding frame: {e}"),
            },
            ConnectionEvent::Error(e) => {
                warn!("connection error: {e}");
                self.ui.set_status_text(STATUS_CONNECTION_ERROR);
            }
            ConnectionEvent::Closed { reason } => self.on_closed(reason.as_deref()),
        }
    }

    fn handle_server_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Init {
                room,
                name,
                participant_count,
                history,
            } => {
                info!(room = %room, name = %name, participant_count, "session initialized");
                self.ui.set_status_text(&format!(
                    "Room: {room} • you: {name} • participants: {participant_count}"
                ));
                for entry in history {
                    let message = ChatMessage::from_history(entry, &name);
                    self.ui.render_message(&message);
                }
                self.session = Some(Session {
                    room_id: room,
                    display_name: name,
                    participant_count,
                    connection_state: ConnectionState::Open,
                });
            }
            ServerMessage::Message { from, text, ts } => {
                self.ui
                    .render_message(&ChatMessage::remote(from, text, ts));
            }
            ServerMessage::MessageAck { id } => {
                debug!(id = ?id, "message acknowledged");
            }
            ServerMessage::PeerJoined { participant_count } => {
                self.set_participant_count(participant_count);
                self.ui.set_status_text(&format!(
                    "Peer joined • participants: {participant_count}"
                ));
            }
            ServerMessage::PeerLeft { participant_count } => {
                self.set_participant_count(participant_count);
                self.ui.set_status_text(&format!(
                    "Peer left • participants: {participant_count}"
                ));
            }
            ServerMessage::Typing { from, is_typing } => {
                if is_typing {
                    self.ui
                        .set_typing_indicator(Some(&format!("{from} is typing…")));
                } else {
                    self.ui.set_typing_indicator(None);
                }
            }
            ServerMessage::Error { message } => {
                let text = message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| FALLBACK_SERVER_ERROR.to_owned());
                warn!("server error: {text}");
                self.ui.alert(&text);
                self.disconnect();
            }
            ServerMessage::Unknown => debug!("ignoring unknown frame type"),
        }
    }

    fn set_participant_count(&mut self, participant_count: u32) {
        if let Some(session) = self.session.as_mut() {
            session.participant_count = participant_count;
        }
    }

    /// The single disconnect cleanup, whatever ended the connection.
    fn on_closed(&mut self, reason: Option<&str>) {
        self.typing.deactivate();
        if let Some(session) = self.session.take() {
            info!(room = %session.room_id, reason = ?reason, "session ended");
        }
        self.ui.set_status_text(STATUS_DISCONNECTED);
        self.ui.set_connect_button_label(LABEL_CONNECT);
        self.ui.set_typing_indicator(None);
    }

    /// Encode and queue one intent. Returns `false` if it was dropped.
    fn send_intent(&self, intent: &ClientMessage) -> bool {
        let frame = match codec::encode(intent) {
            Ok(frame) => frame,
            Err(e) => {
                error!("failed to encode client message: {e}");
                return false;
            }
        };
        match self.connection.send(frame) {
            Ok(()) => true,
            Err(e) => {
                debug!("frame dropped: {e}");
                false
            }
        }
    }

    // ── Drivers ─────────────────────────────────────────────────────

    /// Apply one user action.
    pub fn handle_input(&mut self, input: UserInput) {
        let outcome = match input {
            UserInput::Connect { room, name } => self.connect(&room, &name),
            UserInput::ToggleConnection { room, name } => self.toggle_connection(&room, &name),
            UserInput::Disconnect => {
                self.disconnect();
                Ok(())
            }
            UserInput::SubmitMessage(text) => {
                self.submit_message(&text);
                Ok(())
            }
            UserInput::InputChanged => {
                self.input_changed();
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!("cannot connect: {e}");
            self.ui.set_status_text(&format!("Cannot connect: {e}"));
        }
    }

    /// Multiplex user input, connection events and the typing timer until
    /// `inputs` closes, then shut the connection down.
    pub async fn run(&mut self, mut inputs: mpsc::Receiver<UserInput>) {
        debug!("session loop started");
        loop {
            let deadline = self.typing.deadline();
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => {
                        debug!("input channel closed");
                        break;
                    }
                },
                event = self.connection.next_event() => self.handle_connection_event(event),
                () = sleep_until_deadline(deadline) => self.on_typing_timer(),
            }
        }
        self.shutdown().await;
        debug!("session loop exited");
    }

    /// Close the connection gracefully, waiting for the transport to close.
    pub async fn shutdown(&mut self) {
        if self.connection.is_live() {
            self.connection.shutdown().await;
            self.on_closed(Some("client shut down"));
        }
    }
}

impl<C: Connector, U: ChatUi> std::fmt::Debug for SessionController<C, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .field("connection", &self.connection)
            .field("typing", &self.typing.state())
            .finish()
    }
}

/// Sleep until `deadline`, or forever when no timer is armed.
pub async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use crate::error::ChatError;
    use crate::transport::Transport;
    use async_trait::async_trait;

    // ── Doubles ─────────────────────────────────────────────────────

    /// Never dials; these tests only feed events directly.
    struct NoConnector;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn send(&mut self, _frame: String) -> std::result::Result<(), ChatError> {
            Err(ChatError::TransportClosed)
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, ChatError>> {
            None
        }

        async fn close(&mut self) -> std::result::Result<(), ChatError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Connector for NoConnector {
        type Transport = NoTransport;

        async fn connect(&self, _endpoint: &Endpoint) -> std::result::Result<NoTransport, ChatError> {
            Err(ChatError::NotConnected)
        }
    }

    #[derive(Default)]
    struct Ui {
        rendered: Vec<ChatMessage>,
        status: Vec<String>,
        typing: Vec<Option<String>>,
    }

    impl ChatUi for Ui {
        fn render_message(&mut self, message: &ChatMessage) {
            self.rendered.push(message.clone());
        }
        fn set_status_text(&mut self, text: &str) {
            self.status.push(text.to_owned());
        }
        fn set_typing_indicator(&mut self, text: Option<&str>) {
            self.typing.push(text.map(str::to_owned));
        }
        fn set_connect_button_label(&mut self, _label: &str) {}
        fn alert(&mut self, _message: &str) {}
        fn clear_compose_field(&mut self) {}
    }

    fn controller() -> SessionController<NoConnector, Ui> {
        SessionController::new(NoConnector, Ui::default(), ChatConfig::new("http://h"))
    }

    fn frame(json: &str) -> ConnectionEvent {
        ConnectionEvent::Frame(json.to_owned())
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[test]
    fn typing_indicator_is_last_writer_wins() {
        let mut c = controller();
        c.handle_connection_event(frame(r#"{"type":"typing","from":"Alice","isTyping":true}"#));
        c.handle_connection_event(frame(r#"{"type":"typing","from":"Bob","isTyping":true}"#));
        c.handle_connection_event(frame(r#"{"type":"typing","from":"Alice","isTyping":false}"#));

        assert_eq!(
            c.ui().typing,
            vec![
                Some("Alice is typing…".to_string()),
                Some("Bob is typing…".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn malformed_and_unknown_frames_have_no_visible_effect() {
        let mut c = controller();
        c.handle_connection_event(frame("{not json"));
        c.handle_connection_event(frame(r#"{"type":"reaction","emoji":"+1"}"#));
        c.handle_connection_event(frame(r#"{"type":"message-ack","id":"c_1_1"}"#));

        assert!(c.ui().rendered.is_empty());
        assert!(c.ui().status.is_empty());
        assert!(c.ui().typing.is_empty());
    }

    #[test]
    fn remote_message_is_never_marked_mine() {
        let mut c = controller();
        c.handle_connection_event(frame(
            r#"{"type":"message","from":"You","text":"hi","ts":7}"#,
        ));
        assert_eq!(c.ui().rendered.len(), 1);
        assert!(!c.ui().rendered[0].is_mine());
        assert_eq!(c.ui().rendered[0].timestamp, 7);
    }

    #[test]
    fn transport_error_only_updates_status() {
        let mut c = controller();
        c.handle_connection_event(ConnectionEvent::Error("reset".into()));
        assert_eq!(c.ui().status, vec!["Connection error".to_string()]);
        assert_eq!(c.connection_state(), ConnectionState::Idle);
    }

    #[test]
    fn submit_without_connection_is_a_no_op() {
        let mut c = controller();
        assert!(!c.submit_message("hello"));
        assert!(c.ui().rendered.is_empty());
    }

    #[test]
    fn input_without_connection_arms_no_timer() {
        let mut c = controller();
        c.input_changed();
        assert_eq!(c.typing_deadline(), None);
        assert!(!c.typing_state().is_typing);
    }

    #[tokio::test]
    async fn invalid_server_url_reports_and_stays_idle() {
        let mut c = SessionController::new(NoConnector, Ui::default(), ChatConfig::new("nope"));
        c.handle_input(UserInput::Connect {
            room: String::new(),
            name: String::new(),
        });
        assert_eq!(c.connection_state(), ConnectionState::Idle);
        assert!(c.session().is_none());
        assert!(c.ui().status[0].starts_with("Cannot connect"));
    }
}
