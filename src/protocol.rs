//! Wire-compatible protocol types for the chat-room server.
//!
//! Every frame is a JSON object discriminated by a kebab-case `type` field.
//! Client and server use disjoint enums even where a discriminator is shared
//! (`"message"`, `"typing"`) because the payloads differ per direction.
//!
//! Server frames with an unrecognized `type` decode to
//! [`ServerMessage::Unknown`] rather than failing, so a newer server can add
//! frame types without breaking older clients.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Structs ─────────────────────────────────────────────────────────

/// One entry of the history replayed in the `init` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Server-assigned message id, when the server provides one.
    ///
    /// Numeric ids are kept in their decimal form; ids of any other shape
    /// are ignored rather than failing the whole `init` frame.
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub from: String,
    pub text: String,
    /// Epoch milliseconds.
    pub ts: i64,
}

// ── Messages ────────────────────────────────────────────────────────

/// Frames sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// A chat message authored by this client.
    Message {
        /// Client-generated id (`c_<timestamp>_<random>`).
        id: String,
        text: String,
    },
    /// Start or stop of local typing activity.
    Typing {
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

/// Frames sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Session established; carries the confirmed identity and room history.
    Init {
        room: String,
        /// Display name as confirmed by the server.
        name: String,
        #[serde(rename = "participants")]
        participant_count: u32,
        #[serde(default)]
        history: Vec<HistoryEntry>,
    },
    /// A chat message from another participant.
    Message {
        from: String,
        text: String,
        /// Epoch milliseconds.
        ts: i64,
    },
    /// The server accepted one of our messages.
    MessageAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    /// Another participant joined the room.
    PeerJoined {
        #[serde(rename = "participants")]
        participant_count: u32,
    },
    /// Another participant left the room.
    PeerLeft {
        #[serde(rename = "participants")]
        participant_count: u32,
    },
    /// Typing state of another participant changed.
    Typing {
        from: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    /// The server rejected the session. Always fatal, whatever `message`
    /// holds; a message that is neither text nor a number reads as absent.
    Error {
        #[serde(
            default,
            deserialize_with = "lenient_text",
            skip_serializing_if = "Option::is_none"
        )]
        message: Option<String>,
    },
    /// A frame type this client does not understand.
    #[serde(other)]
    Unknown,
}

/// Read a JSON string or number as text; any other value reads as `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
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
    use serde_json::json;

    #[test]
    fn typing_field_is_camel_case_on_the_wire() {
        let value = serde_json::to_value(ClientMessage::Typing { is_typing: true }).unwrap();
        assert_eq!(value, json!({"type": "typing", "isTyping": true}));
    }

    #[test]
    fn message_ack_ignores_extra_fields() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"message-ack","id":"c_1_1","ts":5,"extra":[1]}"#)
                .unwrap();
        assert_eq!(
            msg,
            ServerMessage::MessageAck {
                id: Some("c_1_1".into())
            }
        );
    }

    #[test]
    fn init_without_history_defaults_to_empty() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"init","room":"r","name":"n","participants":1}"#)
                .unwrap();
        let ServerMessage::Init { history, .. } = msg else {
            panic!("expected Init, got {msg:?}");
        };
        assert!(history.is_empty());
    }

    #[test]
    fn history_ids_accept_numbers_and_ignore_other_shapes() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{"type":"init","room":"r","name":"n","participants":1,"history":[
                {"id":7,"from":"A","text":"one","ts":1},
                {"id":{"seq":2},"from":"B","text":"two","ts":2},
                {"id":null,"from":"C","text":"three","ts":3}
            ]}"#,
        )
        .unwrap();
        let ServerMessage::Init { history, .. } = msg else {
            panic!("expected Init, got {msg:?}");
        };
        let ids: Vec<_> = history.iter().map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("7"), None, None]);
    }
}
