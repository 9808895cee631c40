//! Conversation message types shared between the gate and its consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role tag for a conversation message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System guidance, invisible to the end user.
    System,
    /// End-user input.
    User,
    /// Assistant output shown in the transcript.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(name)
    }
}

/// A single role-tagged message in the ordered conversation sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Timestamp for the message.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a message with the current timestamp.
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::now(Role::System, content)
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::now(Role::User, content)
    }

    /// Build an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::now(Role::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, Role};
    use pretty_assertions::assert_eq;

    #[test]
    fn roles_serialize_snake_case() {
        let message = ChatMessage::system("blocked");
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["role"], "system");
        assert_eq!(value["content"], "blocked");
    }

    #[test]
    fn role_display_matches_wire_name() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
