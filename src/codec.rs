//! Message codec: outgoing intents to text frames, text frames to events.

use crate::error::{ChatError, Result};
use crate::protocol::{ClientMessage, ServerMessage};

/// Serialize an outgoing intent into one wire frame.
///
/// # Errors
///
/// Returns [`ChatError::Serialization`] if the message cannot be encoded.
pub fn encode(message: &ClientMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Parse one wire frame into a typed server event.
///
/// Unrecognized `type` values decode to [`ServerMessage::Unknown`].
///
/// # Errors
///
/// Returns [`ChatError::Decode`] if the frame is not JSON, lacks a `type`
/// discriminator, or a known frame type is missing required fields.
pub fn decode(frame: &str) -> Result<ServerMessage> {
    serde_json::from_str(frame).map_err(ChatError::Decode)
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
    fn encode_send_message() {
        let frame = encode(&ClientMessage::Message {
            id: "c_1_1".into(),
            text: "hello".into(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({"type": "message", "id": "c_1_1", "text": "hello"})
        );
    }

    #[test]
    fn decode_unknown_type_is_not_an_error() {
        let msg = decode(r#"{"type":"presence","who":["a","b"]}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn decode_rejects_non_json() {
        let err = decode("not json").unwrap_err();
        assert!(matches!(err, ChatError::Decode(_)));
    }

    #[test]
    fn decode_rejects_missing_discriminator() {
        let err = decode(r#"{"from":"a","text":"b","ts":1}"#).unwrap_err();
        assert!(matches!(err, ChatError::Decode(_)));
    }

    #[test]
    fn decode_rejects_negative_participant_count() {
        let err = decode(r#"{"type":"peer-joined","participants":-1}"#).unwrap_err();
        assert!(matches!(err, ChatError::Decode(_)));
    }
}
