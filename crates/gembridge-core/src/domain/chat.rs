//! Chat domain types.
//!
//! `MessageRole` is the closed set of roles a caller may use. `BackendMessage`
//! is the turn representation handed to a backend model: system instructions,
//! human turns, and prior assistant turns.

use serde::{Deserialize, Serialize};

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Parse a role from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    /// Convert role to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single conversation turn as the backend model sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMessage {
    /// System instruction.
    System(String),
    /// Turn authored by the human caller.
    Human(String),
    /// Earlier turn produced by the assistant.
    Assistant(String),
}

impl BackendMessage {
    /// Build a backend turn from a role and its content.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        let content = content.into();
        match role {
            MessageRole::System => Self::System(content),
            MessageRole::User => Self::Human(content),
            MessageRole::Assistant => Self::Assistant(content),
        }
    }

    /// Text carried by this turn.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::System(text) | Self::Human(text) | Self::Assistant(text) => text,
        }
    }

    /// Role this turn was built from.
    #[must_use]
    pub const fn role(&self) -> MessageRole {
        match self {
            Self::System(_) => MessageRole::System,
            Self::Human(_) => MessageRole::User,
            Self::Assistant(_) => MessageRole::Assistant,
        }
    }
}
