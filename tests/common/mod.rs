#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for chat-room client integration tests.
//!
//! Provides a channel-backed [`MockConnector`] whose transports are driven by
//! [`MockServer`] handles, a [`RecordingUi`] that captures every UI call, and
//! helpers for building server frames.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chatroom_client::protocol::{ClientMessage, HistoryEntry, ServerMessage};
use chatroom_client::{
    ChatConfig, ChatError, ChatMessage, ChatUi, Connector, Endpoint, SessionController, Transport,
};
use tokio::sync::mpsc;

type Incoming = Option<Result<String, ChatError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// The client half of a scripted connection.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Incoming>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: String) -> Result<(), ChatError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(ChatError::TransportClosed);
        }
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, ChatError>> {
        match self.incoming.recv().await {
            Some(item) => item,
            // The server handle was dropped: stay open until shutdown.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── MockServer ──────────────────────────────────────────────────────

/// The server half of a scripted connection.
pub struct MockServer {
    tx: mpsc::UnboundedSender<Incoming>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    /// The endpoint the client dialed, recorded by the connector.
    pub endpoint: Arc<StdMutex<Option<String>>>,
}

impl MockServer {
    /// Deliver one text frame to the client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.tx.send(Some(Ok(frame.into())));
    }

    /// Deliver a transport receive error to the client.
    pub fn fail(&self, reason: &str) {
        let _ = self
            .tx
            .send(Some(Err(ChatError::TransportReceive(reason.into()))));
    }

    /// Close the connection from the server side.
    pub fn hang_up(&self) {
        let _ = self.tx.send(None);
    }

    /// Raw frames the client sent, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Frames the client sent, decoded.
    pub fn sent_messages(&self) -> Vec<ClientMessage> {
        self.sent()
            .iter()
            .map(|f| serde_json::from_str(f).expect("client frame"))
            .collect()
    }

    /// Only the `typing` values the client sent, in order.
    pub fn sent_typing(&self) -> Vec<bool> {
        self.sent_messages()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::Typing { is_typing } => Some(is_typing),
                ClientMessage::Message { .. } => None,
            })
            .collect()
    }

    /// Whether the client closed the transport.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

// ── MockConnector ───────────────────────────────────────────────────

struct Pending {
    transport: MockTransport,
    endpoint: Arc<StdMutex<Option<String>>>,
}

/// Hands out prepared transports in order; refuses once they run out.
pub struct MockConnector {
    ready: StdMutex<VecDeque<Pending>>,
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, endpoint: &Endpoint) -> Result<MockTransport, ChatError> {
        let next = self.ready.lock().unwrap().pop_front();
        match next {
            Some(pending) => {
                *pending.endpoint.lock().unwrap() = Some(endpoint.as_str().to_owned());
                Ok(pending.transport)
            }
            None => Err(ChatError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
        }
    }
}

/// Create a connector with `count` scripted connections and their servers.
pub fn mock_connector(count: usize) -> (MockConnector, Vec<MockServer>) {
    let mut ready = VecDeque::new();
    let mut servers = Vec::new();
    for _ in 0..count {
        let (tx, incoming) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let endpoint = Arc::new(StdMutex::new(None));
        ready.push_back(Pending {
            transport: MockTransport {
                incoming,
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            },
            endpoint: Arc::clone(&endpoint),
        });
        servers.push(MockServer {
            tx,
            sent,
            closed,
            endpoint,
        });
    }
    (
        MockConnector {
            ready: StdMutex::new(ready),
        },
        servers,
    )
}

// ── RecordingUi ─────────────────────────────────────────────────────

/// One call made by the controller on its UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCall {
    Render {
        from: String,
        text: String,
        timestamp: i64,
        is_mine: bool,
    },
    Status(String),
    Typing(Option<String>),
    ButtonLabel(String),
    Alert(String),
    ClearCompose,
}

/// A [`ChatUi`] that records every call.
#[derive(Debug, Default)]
pub struct RecordingUi {
    pub calls: Vec<UiCall>,
}

impl RecordingUi {
    pub fn rendered(&self) -> Vec<(String, String, bool)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                UiCall::Render {
                    from,
                    text,
                    is_mine,
                    ..
                } => Some((from.clone(), text.clone(), *is_mine)),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                UiCall::Status(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<String> {
        self.statuses().pop()
    }

    pub fn last_typing(&self) -> Option<Option<String>> {
        self.calls.iter().rev().find_map(|c| match c {
            UiCall::Typing(t) => Some(t.clone()),
            _ => None,
        })
    }

    pub fn last_button_label(&self) -> Option<String> {
        self.calls.iter().rev().find_map(|c| match c {
            UiCall::ButtonLabel(l) => Some(l.clone()),
            _ => None,
        })
    }

    pub fn alerts(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                UiCall::Alert(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&UiCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl ChatUi for RecordingUi {
    fn render_message(&mut self, message: &ChatMessage) {
        self.calls.push(UiCall::Render {
            from: message.from.clone(),
            text: message.text.clone(),
            timestamp: message.timestamp,
            is_mine: message.is_mine(),
        });
    }

    fn set_status_text(&mut self, text: &str) {
        self.calls.push(UiCall::Status(text.to_owned()));
    }

    fn set_typing_indicator(&mut self, text: Option<&str>) {
        self.calls.push(UiCall::Typing(text.map(str::to_owned)));
    }

    fn set_connect_button_label(&mut self, label: &str) {
        self.calls.push(UiCall::ButtonLabel(label.to_owned()));
    }

    fn alert(&mut self, message: &str) {
        self.calls.push(UiCall::Alert(message.to_owned()));
    }

    fn clear_compose_field(&mut self) {
        self.calls.push(UiCall::ClearCompose);
    }
}

// ── Controller helpers ──────────────────────────────────────────────

pub type TestController = SessionController<MockConnector, RecordingUi>;

/// A controller over `count` scripted connections.
pub fn controller(count: usize) -> (TestController, Vec<MockServer>) {
    let (connector, servers) = mock_connector(count);
    let controller = SessionController::new(
        connector,
        RecordingUi::default(),
        ChatConfig::new("http://chat.test"),
    );
    (controller, servers)
}

/// Handle the next connection event, failing the test instead of hanging.
pub async fn pump(controller: &mut TestController) {
    tokio::time::timeout(Duration::from_secs(5), controller.process_next_event())
        .await
        .expect("expected a connection event");
}

/// Handle connection events until `n` have been processed.
pub async fn pump_n(controller: &mut TestController, n: usize) {
    for _ in 0..n {
        pump(controller).await;
    }
}

/// Connect and drain the `Opened` event so the socket is usable.
pub async fn connect_open(controller: &mut TestController, room: &str, name: &str) {
    controller.connect(room, name).expect("connect");
    pump(controller).await;
}

/// Let the connection task forward queued frames to the mock server.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

// ── JSON helper functions ───────────────────────────────────────────

pub fn init_json(room: &str, name: &str, participants: u32, history: Vec<HistoryEntry>) -> String {
    serde_json::to_string(&ServerMessage::Init {
        room: room.into(),
        name: name.into(),
        participant_count: participants,
        history,
    })
    .expect("init_json serialization")
}

pub fn history_entry(from: &str, text: &str, ts: i64) -> HistoryEntry {
    HistoryEntry {
        id: None,
        from: from.into(),
        text: text.into(),
        ts,
    }
}

pub fn message_json(from: &str, text: &str, ts: i64) -> String {
    serde_json::to_string(&ServerMessage::Message {
        from: from.into(),
        text: text.into(),
        ts,
    })
    .expect("message_json serialization")
}

pub fn peer_joined_json(participants: u32) -> String {
    serde_json::to_string(&ServerMessage::PeerJoined {
        participant_count: participants,
    })
    .expect("peer_joined_json serialization")
}

pub fn peer_left_json(participants: u32) -> String {
    serde_json::to_string(&ServerMessage::PeerLeft {
        participant_count: participants,
    })
    .expect("peer_left_json serialization")
}

pub fn typing_json(from: &str, is_typing: bool) -> String {
    serde_json::to_string(&ServerMessage::Typing {
        from: from.into(),
        is_typing,
    })
    .expect("typing_json serialization")
}

pub fn error_json(message: Option<&str>) -> String {
    serde_json::to_string(&ServerMessage::Error {
        message: message.map(Into::into),
    })
    .expect("error_json serialization")
}
