//! The user-interface surface driven by the session controller.
//!
//! The controller never draws anything itself; it calls a [`ChatUi`]
//! implementation with the exact text to show. Front ends decide layout.

use crate::message::ChatMessage;

/// Render and status sink for one chat session.
pub trait ChatUi {
    /// Append a message to the conversation. Called once per message.
    fn render_message(&mut self, message: &ChatMessage);

    /// Replace the status line.
    fn set_status_text(&mut self, text: &str);

    /// Replace the single "who is typing" line; `None` clears it.
    fn set_typing_indicator(&mut self, text: Option<&str>);

    /// Label for the connect/disconnect control.
    fn set_connect_button_label(&mut self, label: &str);

    /// Show a blocking, user-visible error.
    fn alert(&mut self, message: &str);

    /// Empty the compose field after a message was sent.
    fn clear_compose_field(&mut self);
}
