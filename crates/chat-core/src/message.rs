//! Application-level message records.

use serde::{Deserialize, Serialize};

/// A chat message as seen by presentation code.
///
/// Only `body` is guaranteed. Unknown fields on the wire are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    body: String,
}

impl ChatMessage {
    /// Create a message with the given body.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Text content of the message.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Consume the message and return its body.
    #[must_use]
    pub fn into_body(self) -> String {
        self.body
    }
}

/// Inbound frame before it is normalized by [`crate::decode`].
///
/// Some producers hand over raw wire text, others an already-parsed
/// message. Both are resolved once at the codec boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    /// Wire text, expected to hold a JSON envelope.
    Text(String),
    /// Already-structured message, passed through unchanged.
    Structured(ChatMessage),
}

impl From<String> for RawFrame {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RawFrame {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<ChatMessage> for RawFrame {
    fn from(msg: ChatMessage) -> Self {
        Self::Structured(msg)
    }
}
