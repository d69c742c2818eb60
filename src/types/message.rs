use std::fmt;

use serde::{Deserialize, Serialize};

/// The origin of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Text typed by the person at the keyboard.
    User,

    /// Text produced by the remote assistant, or a fallback standing in for it.
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single entry in the conversation log.
///
/// Messages are immutable once constructed; the log only ever grows by
/// appending new ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sender: Sender,
    text: String,
}

impl Message {
    /// Create a new `Message`.
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }

    /// Create a new user `Message`.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    /// Create a new assistant `Message`.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }

    /// Who produced this message.
    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// The display text of this message.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the message came from the user.
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    /// True when the message came from the assistant.
    pub fn is_assistant(&self) -> bool {
        self.sender == Sender::Assistant
    }
}
