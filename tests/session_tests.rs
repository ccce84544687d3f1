#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration tests for `SessionController` against scripted connections.
//!
//! All tests run on a paused clock so typing timers are deterministic.

mod common;

use std::time::Duration;

use chatroom_client::protocol::ClientMessage;
use chatroom_client::{ConnectionState, UserInput};
use common::*;
use tokio::sync::mpsc;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ════════════════════════════════════════════════════════════════════
// Connect
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn connect_dials_encoded_endpoint_and_updates_ui() {
    let (mut c, servers) = controller(1);
    c.connect("my room", "Zoë").unwrap();

    assert_eq!(c.connection_state(), ConnectionState::Connecting);
    assert_eq!(c.ui().last_status().as_deref(), Some("Connecting to my room..."));
    assert_eq!(c.ui().last_button_label().as_deref(), Some("Disconnect"));

    pump(&mut c).await;
    assert_eq!(c.connection_state(), ConnectionState::Open);
    assert_eq!(
        servers[0].endpoint.lock().unwrap().as_deref(),
        Some("ws://chat.test/ws?room=my%20room&name=Zo%C3%AB")
    );
    let session = c.session().unwrap();
    assert_eq!(session.room_id, "my room");
    assert_eq!(session.display_name, "Zoë");
    assert_eq!(session.connection_state, ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn blank_room_and_name_use_defaults() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "  ", "").await;

    assert_eq!(
        servers[0].endpoint.lock().unwrap().as_deref(),
        Some("ws://chat.test/ws?room=room1&name=You")
    );
    assert_eq!(c.session().unwrap().display_name, "You");
}

#[tokio::test(start_paused = true)]
async fn failed_dial_reports_error_then_disconnects() {
    let (mut c, _servers) = controller(0);
    c.connect("lobby", "Alice").unwrap();
    pump_n(&mut c, 2).await;

    assert_eq!(
        c.ui().statuses(),
        vec![
            "Connecting to lobby...".to_string(),
            "Connection error".to_string(),
            "Disconnected".to_string(),
        ]
    );
    assert_eq!(c.ui().last_button_label().as_deref(), Some("Connect"));
    assert_eq!(c.connection_state(), ConnectionState::Closed);
    assert!(c.session().is_none());
}

// ════════════════════════════════════════════════════════════════════
// Init & history
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn init_replays_history_with_ownership() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    servers[0].push(init_json(
        "lobby",
        "Alice",
        2,
        vec![
            history_entry("Alice", "first", 1_000),
            history_entry("Bob", "second", 2_000),
            history_entry("alice", "third", 3_000),
        ],
    ));
    pump(&mut c).await;

    assert_eq!(
        c.ui().rendered(),
        vec![
            ("Alice".to_string(), "first".to_string(), true),
            ("Bob".to_string(), "second".to_string(), false),
            ("alice".to_string(), "third".to_string(), false),
        ]
    );
    assert_eq!(
        c.ui().last_status().as_deref(),
        Some("Room: lobby • you: Alice • participants: 2")
    );
    assert_eq!(c.session().unwrap().participant_count, 2);
}

#[tokio::test(start_paused = true)]
async fn init_with_numeric_history_ids_opens_the_session() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "A").await;

    servers[0].push(
        r#"{"type":"init","room":"lobby","name":"A","participants":2,
            "history":[{"id":7,"from":"A","text":"hi","ts":1},
                       {"id":8,"from":"B","text":"yo","ts":2}]}"#,
    );
    pump(&mut c).await;

    assert_eq!(
        c.ui().rendered(),
        vec![
            ("A".to_string(), "hi".to_string(), true),
            ("B".to_string(), "yo".to_string(), false),
        ]
    );
    assert_eq!(
        c.ui().last_status().as_deref(),
        Some("Room: lobby • you: A • participants: 2")
    );
    assert_eq!(c.session().unwrap().participant_count, 2);
}

#[tokio::test(start_paused = true)]
async fn server_confirmed_name_is_used_for_local_echo() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "alice").await;

    servers[0].push(init_json("lobby", "Alice (2)", 1, vec![]));
    pump(&mut c).await;
    assert_eq!(c.session().unwrap().display_name, "Alice (2)");

    assert!(c.submit_message("hi"));
    assert_eq!(
        c.ui().rendered(),
        vec![("Alice (2)".to_string(), "hi".to_string(), true)]
    );
}

// ════════════════════════════════════════════════════════════════════
// Messages
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn submit_sends_frame_echoes_and_clears_compose() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    assert!(c.submit_message("  hello  "));
    settle().await;

    let sent = servers[0].sent_messages();
    assert_eq!(sent.len(), 1);
    let ClientMessage::Message { id, text } = &sent[0] else {
        panic!("expected a message frame, got {:?}", sent[0]);
    };
    assert!(id.starts_with("c_"), "unexpected id {id}");
    assert_eq!(text, "hello");

    assert_eq!(
        c.ui().rendered(),
        vec![("Alice".to_string(), "hello".to_string(), true)]
    );
    assert_eq!(c.ui().calls.last(), Some(&UiCall::ClearCompose));
}

#[tokio::test(start_paused = true)]
async fn blank_submit_does_nothing() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    assert!(!c.submit_message("   \n\t"));
    settle().await;

    assert!(servers[0].sent().is_empty());
    assert!(c.ui().rendered().is_empty());
    assert_eq!(c.ui().count(|call| *call == UiCall::ClearCompose), 0);
}

#[tokio::test(start_paused = true)]
async fn nothing_is_sent_before_the_socket_opens() {
    let (mut c, servers) = controller(1);
    c.connect("lobby", "Alice").unwrap();

    assert!(!c.submit_message("too early"));
    c.input_changed();
    assert_eq!(c.typing_deadline(), None);

    pump(&mut c).await;
    settle().await;

    assert!(servers[0].sent().is_empty());
    assert!(c.ui().rendered().is_empty());
}

#[tokio::test(start_paused = true)]
async fn remote_messages_render_and_own_echo_is_not_deduplicated() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    assert!(c.submit_message("hi"));
    servers[0].push(message_json("Bob", "yo", 5));
    servers[0].push(message_json("Alice", "hi", 6));
    pump_n(&mut c, 2).await;

    assert_eq!(
        c.ui().rendered(),
        vec![
            ("Alice".to_string(), "hi".to_string(), true),
            ("Bob".to_string(), "yo".to_string(), false),
            ("Alice".to_string(), "hi".to_string(), false),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_are_ignored() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;
    let before = c.ui().calls.len();

    servers[0].push("{not json");
    servers[0].push(r#"{"type":"reaction","emoji":"+1"}"#);
    servers[0].push(r#"{"type":"message-ack","id":"c_1_1"}"#);
    pump_n(&mut c, 3).await;

    assert_eq!(c.ui().calls.len(), before);
    assert_eq!(c.connection_state(), ConnectionState::Open);
}

// ════════════════════════════════════════════════════════════════════
// Presence & typing indicator
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn presence_updates_follow_server_counts_in_order() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;
    servers[0].push(init_json("lobby", "Alice", 2, vec![]));
    servers[0].push(peer_left_json(1));
    servers[0].push(peer_joined_json(2));
    pump_n(&mut c, 3).await;

    let statuses = c.ui().statuses();
    assert_eq!(
        &statuses[statuses.len() - 2..],
        &[
            "Peer left • participants: 1".to_string(),
            "Peer joined • participants: 2".to_string(),
        ]
    );
    assert_eq!(c.session().unwrap().participant_count, 2);
}

#[tokio::test(start_paused = true)]
async fn remote_typing_indicator_shows_and_hides() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    servers[0].push(typing_json("Bob", true));
    pump(&mut c).await;
    assert_eq!(
        c.ui().last_typing(),
        Some(Some("Bob is typing…".to_string()))
    );

    servers[0].push(typing_json("Bob", false));
    pump(&mut c).await;
    assert_eq!(c.ui().last_typing(), Some(None));
}

// ════════════════════════════════════════════════════════════════════
// Local typing notifications
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn rapid_edits_send_one_start_and_one_stop() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    for _ in 0..5 {
        c.input_changed();
        tokio::time::advance(ms(100)).await;
    }
    // Last edit was 100ms ago; the idle timer restarts on every edit.
    c.on_typing_timer();
    assert!(c.typing_state().is_typing);

    tokio::time::advance(ms(799)).await;
    c.on_typing_timer();
    assert!(c.typing_state().is_typing);

    tokio::time::advance(ms(1)).await;
    c.on_typing_timer();
    assert!(!c.typing_state().is_typing);
    assert_eq!(c.typing_deadline(), None);

    settle().await;
    assert_eq!(servers[0].sent_typing(), vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn sending_stops_typing_immediately() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    c.input_changed();
    assert!(c.submit_message("done"));
    assert_eq!(c.typing_deadline(), None);

    tokio::time::advance(ms(2_000)).await;
    c.on_typing_timer();
    settle().await;

    let sent = servers[0].sent_messages();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0], ClientMessage::Typing { is_typing: true });
    assert!(matches!(sent[1], ClientMessage::Message { .. }));
    assert_eq!(sent[2], ClientMessage::Typing { is_typing: false });
}

#[tokio::test(start_paused = true)]
async fn close_with_pending_timer_sends_no_late_stop() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    c.input_changed();
    c.disconnect();
    assert_eq!(c.typing_deadline(), None);

    tokio::time::advance(ms(2_000)).await;
    c.on_typing_timer();
    settle().await;

    assert_eq!(servers[0].sent_typing(), vec![true]);
    assert!(servers[0].is_closed());
}

// ════════════════════════════════════════════════════════════════════
// Disconnect paths
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn server_error_alerts_and_closes() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    servers[0].push(error_json(Some("room is full")));
    pump(&mut c).await;
    settle().await;

    assert_eq!(c.ui().alerts(), vec!["room is full".to_string()]);
    assert_eq!(c.connection_state(), ConnectionState::Closed);
    assert!(c.session().is_none());
    assert!(servers[0].is_closed());
    assert_eq!(c.ui().last_status().as_deref(), Some("Disconnected"));
    assert_eq!(c.ui().count(|call| *call == UiCall::Status("Disconnected".into())), 1);

    let next = tokio::time::timeout(ms(100), c.process_next_event()).await;
    assert!(next.is_err(), "no events after the connection is closed");
}

#[tokio::test(start_paused = true)]
async fn server_error_without_message_uses_fallback() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    servers[0].push(error_json(None));
    pump(&mut c).await;

    assert_eq!(c.ui().alerts(), vec!["Error from server".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn server_error_with_structured_message_still_closes() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    servers[0].push(r#"{"type":"error","message":{"code":"ROOM_FULL"}}"#);
    pump(&mut c).await;
    settle().await;

    assert_eq!(c.ui().alerts(), vec!["Error from server".to_string()]);
    assert_eq!(c.connection_state(), ConnectionState::Closed);
    assert!(c.session().is_none());
    assert!(servers[0].is_closed());
}

#[tokio::test(start_paused = true)]
async fn server_hang_up_resets_ui() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;
    servers[0].push(typing_json("Bob", true));
    pump(&mut c).await;

    servers[0].hang_up();
    pump(&mut c).await;

    assert_eq!(c.connection_state(), ConnectionState::Closed);
    assert!(c.session().is_none());
    assert_eq!(c.ui().last_status().as_deref(), Some("Disconnected"));
    assert_eq!(c.ui().last_button_label().as_deref(), Some("Connect"));
    assert_eq!(c.ui().last_typing(), Some(None));

    c.input_changed();
    assert_eq!(c.typing_deadline(), None);
}

#[tokio::test(start_paused = true)]
async fn receive_error_keeps_the_connection() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    servers[0].fail("bad frame");
    servers[0].push(message_json("Bob", "still here", 1));
    pump_n(&mut c, 2).await;

    assert_eq!(c.connection_state(), ConnectionState::Open);
    assert!(c.ui().statuses().contains(&"Connection error".to_string()));
    assert_eq!(c.ui().rendered().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_transport() {
    let (mut c, servers) = controller(1);
    connect_open(&mut c, "lobby", "Alice").await;

    c.shutdown().await;

    assert!(servers[0].is_closed());
    assert_eq!(c.connection_state(), ConnectionState::Closed);
    assert_eq!(c.ui().last_status().as_deref(), Some("Disconnected"));
}

// ════════════════════════════════════════════════════════════════════
// Toggle & reconnect
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn toggle_connects_disconnects_and_connects_again() {
    let (mut c, servers) = controller(2);

    c.toggle_connection("lobby", "Alice").unwrap();
    pump(&mut c).await;
    assert_eq!(c.connection_state(), ConnectionState::Open);
    assert_eq!(c.ui().last_button_label().as_deref(), Some("Disconnect"));

    c.toggle_connection("lobby", "Alice").unwrap();
    assert_eq!(c.connection_state(), ConnectionState::Closed);
    assert_eq!(c.ui().last_button_label().as_deref(), Some("Connect"));
    assert!(c.session().is_none());

    c.toggle_connection("other", "Alice").unwrap();
    pump(&mut c).await;
    assert_eq!(c.connection_state(), ConnectionState::Open);
    assert_eq!(c.session().unwrap().room_id, "other");

    settle().await;
    assert!(servers[0].is_closed());
    assert!(!servers[1].is_closed());
}

#[tokio::test(start_paused = true)]
async fn toggle_while_connecting_cancels() {
    let (mut c, _servers) = controller(1);
    c.toggle_connection("lobby", "Alice").unwrap();
    assert_eq!(c.connection_state(), ConnectionState::Connecting);

    c.toggle_connection("lobby", "Alice").unwrap();
    assert_eq!(c.connection_state(), ConnectionState::Closed);
    assert_eq!(c.ui().last_status().as_deref(), Some("Disconnected"));
}

#[tokio::test(start_paused = true)]
async fn reconnect_starts_a_fresh_session_and_drops_stale_frames() {
    let (mut c, servers) = controller(2);
    connect_open(&mut c, "first", "Alice").await;
    servers[0].push(init_json("first", "Alice", 4, vec![]));
    pump(&mut c).await;
    c.input_changed();
    assert!(c.typing_state().is_typing);

    c.connect("second", "Alice").unwrap();
    let session = c.session().unwrap();
    assert_eq!(session.room_id, "second");
    assert_eq!(session.participant_count, 0);
    assert_eq!(session.connection_state, ConnectionState::Connecting);
    assert!(!c.typing_state().is_typing);

    servers[0].push(message_json("Bob", "stale", 1));
    pump(&mut c).await;
    assert_eq!(c.connection_state(), ConnectionState::Open);

    servers[1].push(message_json("Carol", "fresh", 2));
    pump(&mut c).await;
    assert_eq!(
        c.ui().rendered(),
        vec![("Carol".to_string(), "fresh".to_string(), false)]
    );

    settle().await;
    assert!(servers[0].is_closed());
}

// ════════════════════════════════════════════════════════════════════
// Run loop
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn run_loop_drives_inputs_frames_and_timer() {
    let (mut c, servers) = controller(1);
    let (inputs, input_rx) = mpsc::channel(16);

    let script = async {
        inputs
            .send(UserInput::Connect {
                room: "lobby".into(),
                name: "Alice".into(),
            })
            .await
            .unwrap();
        settle().await;
        servers[0].push(init_json("lobby", "Alice", 1, vec![]));
        settle().await;

        inputs.send(UserInput::InputChanged).await.unwrap();
        inputs
            .send(UserInput::SubmitMessage("hello".into()))
            .await
            .unwrap();
        settle().await;
        assert_eq!(servers[0].sent_typing(), vec![true, false]);

        // Typing then going idle: the loop's timer sends the stop.
        inputs.send(UserInput::InputChanged).await.unwrap();
        tokio::time::sleep(ms(1_000)).await;
        assert_eq!(servers[0].sent_typing(), vec![true, false, true, false]);

        drop(inputs);
    };

    tokio::join!(c.run(input_rx), script);

    assert!(servers[0].is_closed());
    assert_eq!(
        c.ui().rendered(),
        vec![("Alice".to_string(), "hello".to_string(), true)]
    );
    assert!(c
        .ui()
        .statuses()
        .contains(&"Room: lobby • you: Alice • participants: 1".to_string()));
    assert_eq!(c.ui().last_status().as_deref(), Some("Disconnected"));
}

#[tokio::test(start_paused = true)]
async fn invalid_server_url_is_reported() {
    let (connector, _servers) = mock_connector(1);
    let mut c = chatroom_client::SessionController::new(
        connector,
        RecordingUi::default(),
        chatroom_client::ChatConfig::new("ftp://chat.test"),
    );
    c.handle_input(UserInput::Connect {
        room: "lobby".into(),
        name: "Alice".into(),
    });

    assert_eq!(c.connection_state(), ConnectionState::Idle);
    assert!(c.ui().last_status().unwrap().starts_with("Cannot connect"));
}
