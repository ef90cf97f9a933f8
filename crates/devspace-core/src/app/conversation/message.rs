//! Message types for transcript representation.
//!
//! A [`Message`] is immutable once appended. Its [`Origin`] records where it came
//! from so that a re-fetched server history can be merged without duplicating
//! locally echoed entries.

use devspace_tools::ToolExecution;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::Display;
use uuid::Uuid;

use devspace_tools::ToolStatus;

use crate::ids::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    ToolInfo { execution: ToolExecution },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum Origin {
    /// Loaded from the server's stored history.
    History { durable_id: Option<String> },
    /// Local echo of a user send. `sent_text` is what the backend received.
    Optimistic { sent_text: String },
    /// Built from a dispatch reply or a dispatch failure.
    DispatchResult,
    /// Generated locally, e.g. welcome and load-error notices.
    Synthetic,
}

/// Identity used to match a history record against an existing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    Text {
        role: Role,
        text: String,
    },
    Tool {
        name: String,
        arguments: Map<String, Value>,
        status: ToolStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: MessageContent,
    origin: Origin,
}

impl Message {
    /// Generates a fresh local identifier with the given prefix.
    pub fn generate_id(prefix: &str) -> MessageId {
        MessageId::new(format!("{prefix}-{}", Uuid::now_v7()))
    }

    fn text(id: MessageId, role: Role, text: impl Into<String>, origin: Origin) -> Self {
        Self {
            id,
            role,
            content: MessageContent::Text { text: text.into() },
            origin,
        }
    }

    pub fn tool_info(id: MessageId, execution: ToolExecution, origin: Origin) -> Self {
        Self {
            id,
            role: Role::ToolInfo,
            content: MessageContent::ToolInfo { execution },
            origin,
        }
    }

    pub fn user(id: MessageId, text: impl Into<String>, origin: Origin) -> Self {
        Self::text(id, Role::User, text, origin)
    }

    pub fn assistant(id: MessageId, text: impl Into<String>, origin: Origin) -> Self {
        Self::text(id, Role::Assistant, text, origin)
    }

    /// The local echo appended the moment a user sends something.
    pub fn optimistic_user(display: impl Into<String>, sent_text: impl Into<String>) -> Self {
        Self::user(
            Self::generate_id("msg-user"),
            display,
            Origin::Optimistic {
                sent_text: sent_text.into(),
            },
        )
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &MessageContent {
        &self.content
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text { text } => Some(text),
            MessageContent::ToolInfo { .. } => None,
        }
    }

    pub fn tool_execution(&self) -> Option<&ToolExecution> {
        match &self.content {
            MessageContent::ToolInfo { execution } => Some(execution),
            MessageContent::Text { .. } => None,
        }
    }

    pub fn durable_id(&self) -> Option<&str> {
        match &self.origin {
            Origin::History { durable_id } => durable_id.as_deref(),
            _ => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.origin, Origin::Synthetic)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        match (&self.content, &self.origin) {
            (MessageContent::Text { .. }, Origin::Optimistic { sent_text }) => Fingerprint::Text {
                role: self.role,
                text: sent_text.clone(),
            },
            (MessageContent::Text { text }, _) => Fingerprint::Text {
                role: self.role,
                text: text.clone(),
            },
            (MessageContent::ToolInfo { execution }, _) => Fingerprint::Tool {
                name: execution.tool_name.clone(),
                arguments: execution.arguments.clone(),
                status: execution.status,
            },
        }
    }

    pub(super) fn rekey(&mut self, id: MessageId) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimistic_fingerprint_uses_sent_text() {
        let message = Message::optimistic_user("Using Tool: Run Tests", "User initiated tool: ...");
        assert_eq!(message.as_text(), Some("Using Tool: Run Tests"));
        assert_eq!(
            message.fingerprint(),
            Fingerprint::Text {
                role: Role::User,
                text: "User initiated tool: ...".to_string()
            }
        );
        assert!(message.id().as_str().starts_with("msg-user-"));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = Message::generate_id("msg");
        let b = Message::generate_id("msg");
        assert_ne!(a, b);
    }

    #[test]
    fn role_displays_snake_case() {
        assert_eq!(Role::ToolInfo.to_string(), "tool_info");
    }
}
