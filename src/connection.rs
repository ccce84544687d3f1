//! Connection manager: the single live connection and its lifecycle.
//!
//! [`ConnectionManager`] owns at most one [`ConnectionHandle`]. Each handle
//! drives a background connection task that dials the endpoint, then
//! multiplexes outgoing frames, the shutdown signal and inbound frames with
//! `tokio::select!`. The task reports back over a bounded per-handle channel
//! of [`ConnectionEvent`]s, which the owner drains with
//! [`ConnectionManager::next_event`].
//!
//! ```text
//! Idle --connect()--> Connecting --Opened--> Open --Closed--> Closed
//!                         \________________close()______________/
//! ```
//!
//! Replacing or closing a handle drops its event receiver, so no event from
//! a previous connection can ever be observed after the switch.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ChatError, Result};
use crate::transport::{Connector, Transport};

/// Default capacity of the bounded per-connection event channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default deadline for closing a transport gracefully.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Endpoint ────────────────────────────────────────────────────────

/// A fully-qualified chat endpoint: `ws(s)://host/ws?room=..&name=..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    room: String,
    name: String,
}

impl Endpoint {
    /// Build the endpoint for `room` and `name` on the server at `base`.
    ///
    /// `base` is the server origin. `http` maps to `ws` and `https` to `wss`;
    /// `ws`/`wss` are kept. Any path, query or fragment on `base` is replaced.
    /// Room and name are percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidEndpoint`] if `base` is not a URL or uses
    /// another scheme.
    pub fn build(base: &str, room: &str, name: &str) -> Result<Self> {
        let mut url = Url::parse(base).map_err(|e| ChatError::InvalidEndpoint(e.to_string()))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(ChatError::InvalidEndpoint(format!(
                    "unsupported scheme `{other}`"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|()| ChatError::InvalidEndpoint(format!("cannot use scheme `{scheme}`")))?;
        url.set_path("/ws");
        url.set_query(Some(&format!(
            "room={}&name={}",
            urlencoding::encode(room),
            urlencoding::encode(name)
        )));
        url.set_fragment(None);

        Ok(Self {
            url: url.into(),
            room: room.to_owned(),
            name: name.to_owned(),
        })
    }

    /// The full URL to dial.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The room requested in this endpoint.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// The display name requested in this endpoint.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

// ── State & events ──────────────────────────────────────────────────

/// Lifecycle of the connection owned by a [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection has been attempted yet.
    #[default]
    Idle,
    /// Dialing; frames cannot be sent yet.
    Connecting,
    /// The socket is open and frames are delivered.
    Open,
    /// The last connection ended.
    Closed,
}

/// Lifecycle and data signals from a connection task, in receipt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The socket opened.
    Opened,
    /// One inbound text frame.
    Frame(String),
    /// A transport-level error. Diagnostic only; closure is reported
    /// separately by [`Closed`](ConnectionEvent::Closed).
    Error(String),
    /// The connection ended. Always the final event of a handle.
    Closed {
        /// Why the connection ended, when known.
        reason: Option<String>,
    },
}

// ── Handle ──────────────────────────────────────────────────────────

/// Identifier of a connection attempt, unique per manager.
pub type HandleId = u64;

/// The live connection owned by a [`ConnectionManager`].
pub struct ConnectionHandle {
    id: HandleId,
    endpoint: Endpoint,
    /// Outgoing frames for the connection task.
    frame_tx: mpsc::UnboundedSender<String>,
    events: mpsc::Receiver<ConnectionEvent>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ConnectionHandle {
    /// The id assigned by the manager.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The endpoint this handle was dialed for.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Ask the connection task to close its transport and exit.
    ///
    /// The task keeps running detached until the transport is closed or the
    /// shutdown deadline passes.
    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint.as_str())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

// ── Manager ─────────────────────────────────────────────────────────

/// Owns the single active connection and its state machine.
///
/// All methods except [`next_event`](Self::next_event) and
/// [`shutdown`](Self::shutdown) are synchronous, so the owner can call them
/// from inside any event handler. [`connect`](Self::connect) spawns a task
/// and therefore must run inside a Tokio runtime.
pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    state: ConnectionState,
    handle: Option<ConnectionHandle>,
    next_id: HandleId,
    event_channel_capacity: usize,
    shutdown_timeout: Duration,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create an idle manager that dials through `connector`.
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            state: ConnectionState::Idle,
            handle: None,
            next_id: 1,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the capacity of the per-connection event channel.
    ///
    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the graceful-close deadline.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// `true` while frames can be sent.
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// `true` while a handle is `Connecting` or `Open`.
    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// The live handle, if any.
    pub fn handle(&self) -> Option<&ConnectionHandle> {
        self.handle.as_ref()
    }

    /// Start connecting to `endpoint`, closing any live handle first.
    ///
    /// Returns the id of the new handle. The state is `Connecting` until
    /// [`ConnectionEvent::Opened`] is drained.
    pub fn connect(&mut self, endpoint: Endpoint) -> HandleId {
        if self.close() {
            debug!("replaced live connection before reconnecting");
        }

        let id = self.next_id;
        self.next_id += 1;

        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<String>();
        let (event_tx, events) = mpsc::channel::<ConnectionEvent>(self.event_channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        info!(handle = id, endpoint = %endpoint, "connecting");

        let task = tokio::spawn(connection_loop(
            Arc::clone(&self.connector),
            endpoint.clone(),
            frame_rx,
            event_tx,
            shutdown_rx,
            self.shutdown_timeout,
        ));

        self.handle = Some(ConnectionHandle {
            id,
            endpoint,
            frame_tx,
            events,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        });
        self.state = ConnectionState::Connecting;
        id
    }

    /// Queue one frame for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NotConnected`] unless the connection is `Open`.
    /// Undelivered frames are dropped, never queued for a later connection.
    pub fn send(&self, frame: String) -> Result<()> {
        let handle = match &self.handle {
            Some(handle) if self.state == ConnectionState::Open => handle,
            _ => return Err(ChatError::NotConnected),
        };
        handle
            .frame_tx
            .send(frame)
            .map_err(|_| ChatError::NotConnected)
    }

    /// Force the live handle closed.
    ///
    /// Returns `true` if a `Connecting` or `Open` handle was closed by this
    /// call. No [`ConnectionEvent::Closed`] is delivered for it afterwards;
    /// the caller performs its disconnect cleanup on a `true` return.
    pub fn close(&mut self) -> bool {
        let Some(mut handle) = self.handle.take() else {
            return false;
        };
        info!(handle = handle.id, state = ?self.state, "closing connection");
        handle.signal_shutdown();
        self.state = ConnectionState::Closed;
        true
    }

    /// Wait for the next event of the live handle and apply its transition.
    ///
    /// Pending forever while no handle is live. Cancel-safe: an event is
    /// either returned with its transition applied or left in the channel.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        let Some(handle) = self.handle.as_mut() else {
            return std::future::pending().await;
        };
        let event = handle
            .events
            .recv()
            .await
            .unwrap_or_else(|| ConnectionEvent::Closed {
                reason: Some("connection task ended".into()),
            });
        self.apply(&event);
        event
    }

    /// Close the live handle and wait for its task to release the transport.
    ///
    /// The task is aborted if it does not exit within the shutdown timeout.
    pub async fn shutdown(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        debug!(handle = handle.id, "shutdown requested");
        handle.signal_shutdown();
        self.state = ConnectionState::Closed;

        if let Some(mut task) = handle.task.take() {
            // Allow the task's own close deadline to run out first.
            let deadline = self.shutdown_timeout.saturating_mul(2);
            match tokio::time::timeout(deadline, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("connection task terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("connection task did not exit within timeout; aborting");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("connection task aborted: {join_err}");
                    }
                }
            }
        }
    }

    fn apply(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => {
                if self.state == ConnectionState::Connecting {
                    self.state = ConnectionState::Open;
                }
            }
            ConnectionEvent::Closed { reason } => {
                if let Some(handle) = self.handle.take() {
                    info!(handle = handle.id, reason = ?reason, "connection closed");
                }
                self.state = ConnectionState::Closed;
            }
            ConnectionEvent::Frame(_) | ConnectionEvent::Error(_) => {}
        }
    }
}

impl<C: Connector> fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state)
            .field("handle", &self.handle)
            .finish()
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        // No executor context here to drive a graceful close.
        if let Some(task) = self.handle.as_mut().and_then(|h| h.task.take()) {
            task.abort();
        }
    }
}

// ── Connection task ─────────────────────────────────────────────────

/// Background task for one handle: dial, then multiplex via `tokio::select!`.
///
/// Emits `Opened` after a successful dial and `Closed` exactly once when the
/// transport ends. Exits silently on shutdown because the owner has already
/// dropped the event receiver.
async fn connection_loop<C: Connector>(
    connector: Arc<C>,
    endpoint: Endpoint,
    mut frame_rx: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
    shutdown_timeout: Duration,
) {
    debug!(endpoint = %endpoint, "connection task started");

    let mut transport = tokio::select! {
        dialed = connector.connect(&endpoint) => match dialed {
            Ok(transport) => transport,
            Err(e) => {
                warn!(endpoint = %endpoint, "connect failed: {e}");
                emit(&event_tx, ConnectionEvent::Error(e.to_string())).await;
                emit(&event_tx, ConnectionEvent::Closed { reason: Some(e.to_string()) }).await;
                return;
            }
        },
        _ = &mut shutdown_rx => {
            debug!("shutdown while connecting");
            return;
        }
    };

    emit(&event_tx, ConnectionEvent::Opened).await;

    loop {
        tokio::select! {
            // Branch 1: outgoing frame from the owner
            frame = frame_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if let Err(e) = transport.send(frame).await {
                            warn!("transport send error: {e}");
                            emit(&event_tx, ConnectionEvent::Error(e.to_string())).await;
                        }
                    }
                    // Handle dropped without an explicit close.
                    None => {
                        debug!("frame channel closed, closing transport");
                        close_transport(&mut transport, shutdown_timeout).await;
                        break;
                    }
                }
            }

            // Branch 2: explicit close
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                close_transport(&mut transport, shutdown_timeout).await;
                break;
            }

            // Branch 3: inbound frame from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => emit(&event_tx, ConnectionEvent::Frame(text)).await,
                    Some(Err(e)) => {
                        warn!("transport receive error: {e}");
                        emit(&event_tx, ConnectionEvent::Error(e.to_string())).await;
                    }
                    None => {
                        debug!("transport closed by server");
                        emit(&event_tx, ConnectionEvent::Closed { reason: None }).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("connection task exited");
}

/// Deliver an event in order, waiting for channel capacity.
async fn emit(event_tx: &mpsc::Sender<ConnectionEvent>, event: ConnectionEvent) {
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

async fn close_transport(transport: &mut impl Transport, timeout: Duration) {
    match tokio::time::timeout(timeout, transport.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("transport close failed: {e}"),
        Err(_) => warn!("transport close timed out"),
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
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Channel-backed transport; the test holds the server half.
    struct MockTransport {
        incoming: mpsc::UnboundedReceiver<Option<std::result::Result<String, ChatError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, frame: String) -> std::result::Result<(), ChatError> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, ChatError>> {
            match self.incoming.recv().await {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> std::result::Result<(), ChatError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    struct ServerSide {
        tx: mpsc::UnboundedSender<Option<std::result::Result<String, ChatError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    /// Hands out prepared transports in order; fails once they run out.
    struct MockConnector {
        ready: StdMutex<Vec<MockTransport>>,
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Transport = MockTransport;

        async fn connect(&self, _endpoint: &Endpoint) -> std::result::Result<MockTransport, ChatError> {
            let mut ready = self.ready.lock().unwrap();
            if ready.is_empty() {
                return Err(ChatError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "refused",
                )));
            }
            Ok(ready.remove(0))
        }
    }

    fn mock_pair() -> (MockTransport, ServerSide) {
        let (tx, incoming) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = MockTransport {
            incoming,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, ServerSide { tx, sent, closed })
    }

    fn manager_with(count: usize) -> (ConnectionManager<MockConnector>, Vec<ServerSide>) {
        let mut transports = Vec::new();
        let mut servers = Vec::new();
        for _ in 0..count {
            let (t, s) = mock_pair();
            transports.push(t);
            servers.push(s);
        }
        let manager = ConnectionManager::new(MockConnector {
            ready: StdMutex::new(transports),
        });
        (manager, servers)
    }

    fn endpoint() -> Endpoint {
        Endpoint::build("http://localhost:3000", "room1", "You").unwrap()
    }

    async fn next(manager: &mut ConnectionManager<MockConnector>) -> ConnectionEvent {
        tokio::time::timeout(Duration::from_secs(5), manager.next_event())
            .await
            .expect("expected a connection event")
    }

    // ── Endpoint ────────────────────────────────────────────────────

    #[test]
    fn endpoint_maps_http_to_ws() {
        let ep = Endpoint::build("http://localhost:3000", "room1", "You").unwrap();
        assert_eq!(ep.as_str(), "ws://localhost:3000/ws?room=room1&name=You");
    }

    #[test]
    fn endpoint_maps_https_to_wss_and_replaces_path() {
        let ep = Endpoint::build("https://chat.example.com/app/index.html#x", "r", "n").unwrap();
        assert_eq!(ep.as_str(), "wss://chat.example.com/ws?room=r&name=n");
    }

    #[test]
    fn endpoint_percent_encodes_room_and_name() {
        let ep = Endpoint::build("ws://h", "a b&c", "Zoë/1").unwrap();
        assert_eq!(ep.as_str(), "ws://h/ws?room=a%20b%26c&name=Zo%C3%AB%2F1");
        assert_eq!(ep.room(), "a b&c");
        assert_eq!(ep.name(), "Zoë/1");
    }

    #[test]
    fn endpoint_rejects_other_schemes() {
        let err = Endpoint::build("ftp://h", "r", "n").unwrap_err();
        assert!(matches!(err, ChatError::InvalidEndpoint(_)));
        let err = Endpoint::build("no scheme", "r", "n").unwrap_err();
        assert!(matches!(err, ChatError::InvalidEndpoint(_)));
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    #[tokio::test]
    async fn connect_then_open_then_server_close() {
        let (mut manager, servers) = manager_with(1);
        assert_eq!(manager.state(), ConnectionState::Idle);

        manager.connect(endpoint());
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert!(manager.is_live());

        assert_eq!(next(&mut manager).await, ConnectionEvent::Opened);
        assert_eq!(manager.state(), ConnectionState::Open);

        servers[0].tx.send(Some(Ok("frame".into()))).unwrap();
        assert_eq!(next(&mut manager).await, ConnectionEvent::Frame("frame".into()));

        servers[0].tx.send(None).unwrap();
        assert_eq!(
            next(&mut manager).await,
            ConnectionEvent::Closed { reason: None }
        );
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert!(!manager.is_live());
    }

    #[tokio::test]
    async fn send_before_open_is_rejected() {
        let (mut manager, servers) = manager_with(1);
        assert!(matches!(
            manager.send("x".into()),
            Err(ChatError::NotConnected)
        ));

        manager.connect(endpoint());
        assert!(matches!(
            manager.send("x".into()),
            Err(ChatError::NotConnected)
        ));

        assert_eq!(next(&mut manager).await, ConnectionEvent::Opened);
        manager.send("y".into()).unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*servers[0].sent.lock().unwrap(), vec!["y".to_string()]);
    }

    #[tokio::test]
    async fn receive_error_is_diagnostic_only() {
        let (mut manager, servers) = manager_with(1);
        manager.connect(endpoint());
        assert_eq!(next(&mut manager).await, ConnectionEvent::Opened);

        servers[0]
            .tx
            .send(Some(Err(ChatError::TransportReceive("reset".into()))))
            .unwrap();
        let event = next(&mut manager).await;
        assert!(matches!(event, ConnectionEvent::Error(_)));
        assert_eq!(manager.state(), ConnectionState::Open);

        servers[0].tx.send(None).unwrap();
        assert!(matches!(
            next(&mut manager).await,
            ConnectionEvent::Closed { .. }
        ));
    }

    #[tokio::test]
    async fn failed_dial_reports_error_then_closed() {
        let (mut manager, _servers) = manager_with(0);
        manager.connect(endpoint());

        assert!(matches!(next(&mut manager).await, ConnectionEvent::Error(_)));
        assert!(matches!(
            next(&mut manager).await,
            ConnectionEvent::Closed { reason: Some(_) }
        ));
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn explicit_close_closes_transport_and_suppresses_closed_event() {
        let (mut manager, servers) = manager_with(1);
        manager.connect(endpoint());
        assert_eq!(next(&mut manager).await, ConnectionEvent::Opened);

        assert!(manager.close());
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert!(!manager.close(), "second close must be a no-op");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(servers[0].closed.load(Ordering::Relaxed));

        let pending = tokio::time::timeout(Duration::from_millis(50), manager.next_event()).await;
        assert!(pending.is_err(), "no event after explicit close");
    }

    #[tokio::test]
    async fn connect_replaces_live_handle() {
        let (mut manager, servers) = manager_with(2);
        let first = manager.connect(endpoint());
        assert_eq!(next(&mut manager).await, ConnectionEvent::Opened);

        let second = manager.connect(endpoint());
        assert_ne!(first, second);
        assert_eq!(manager.handle().unwrap().id(), second);
        assert_eq!(manager.state(), ConnectionState::Connecting);

        // The old socket is released, and its frames never surface.
        let _ = servers[0].tx.send(Some(Ok("stale".into())));
        assert_eq!(next(&mut manager).await, ConnectionEvent::Opened);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(servers[0].closed.load(Ordering::Relaxed));
        assert!(!servers[1].closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn shutdown_awaits_task() {
        let (mut manager, servers) = manager_with(1);
        manager.connect(endpoint());
        assert_eq!(next(&mut manager).await, ConnectionEvent::Opened);

        manager.shutdown().await;
        assert!(servers[0].closed.load(Ordering::Relaxed));
        assert!(!manager.is_live());
    }
}
