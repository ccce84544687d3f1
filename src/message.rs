//! Chat messages as displayed to the user.

use std::fmt;

use uuid::Uuid;

use crate::protocol::HistoryEntry;

/// Who authored a displayed message, from this client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Authored by this client (optimistic echo or own history entry).
    Local,
    /// Authored by another participant.
    Remote,
}

/// Opaque message identifier.
///
/// Locally authored ids have the form `c_<epoch-ms>_<random>`. The random
/// part is a v4 UUID, so two ids generated in the same millisecond differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a fresh client id stamped with `timestamp` (epoch ms).
    pub fn generate(timestamp: i64) -> Self {
        Self(format!("c_{timestamp}_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message rendered in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// `None` for remote live messages, which carry no id on the wire.
    pub id: Option<MessageId>,
    pub from: String,
    pub text: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub origin: Origin,
}

impl ChatMessage {
    /// A message authored here, stamped `timestamp`.
    ///
    /// Returns `None` if `text` is blank; the stored text is trimmed.
    pub fn local(
        id: MessageId,
        from: impl Into<String>,
        text: &str,
        timestamp: i64,
    ) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            id: Some(id),
            from: from.into(),
            text: text.to_owned(),
            timestamp,
            origin: Origin::Local,
        })
    }

    /// A live message delivered by the server.
    pub fn remote(from: String, text: String, timestamp: i64) -> Self {
        Self {
            id: None,
            from,
            text,
            timestamp,
            origin: Origin::Remote,
        }
    }

    /// A replayed history entry; it is ours iff `from` equals `display_name`
    /// exactly.
    pub fn from_history(entry: HistoryEntry, display_name: &str) -> Self {
        let origin = if entry.from == display_name {
            Origin::Local
        } else {
            Origin::Remote
        };
        Self {
            id: entry.id.map(MessageId::from),
            from: entry.from,
            text: entry.text,
            timestamp: entry.ts,
            origin,
        }
    }

    pub fn is_mine(&self) -> bool {
        self.origin == Origin::Local
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
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

    #[test]
    fn ids_in_the_same_millisecond_are_unique() {
        let a = MessageId::generate(1);
        let b = MessageId::generate(1);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("c_1_"));
        assert!(b.as_str().starts_with("c_1_"));
    }

    #[test]
    fn local_message_is_trimmed_and_rejects_blank() {
        assert!(ChatMessage::local(MessageId::generate(5), "Alice", "   \n\t", 5).is_none());

        let id = MessageId::generate(5);
        let msg = ChatMessage::local(id.clone(), "Alice", "  hi  ", 5).unwrap();
        assert_eq!(msg.text, "hi");
        assert!(msg.is_mine());
        assert_eq!(msg.id, Some(id));
    }

    #[test]
    fn history_ownership_is_case_sensitive() {
        let entry = HistoryEntry {
            id: Some("s_9".into()),
            from: "Alice".into(),
            text: "hi".into(),
            ts: 1000,
        };
        assert!(ChatMessage::from_history(entry.clone(), "Alice").is_mine());
        assert!(!ChatMessage::from_history(entry.clone(), "alice").is_mine());

        let msg = ChatMessage::from_history(entry, "Bob");
        assert_eq!(msg.origin, Origin::Remote);
        assert_eq!(msg.id.as_ref().map(MessageId::as_str), Some("s_9"));
    }
}
