//! Wire types exchanged with the devspace backend.
//!
//! Field names follow the backend's JSON exactly; everything the backend may
//! omit is optional here and defaulted later by the reconciler.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use devspace_tools::SpaceKind;

use crate::ids::{SessionId, SpaceId};

/// How far along a space's application blueprint is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BlueprintCompleteness {
    Complete,
    Incomplete,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlueprintStatus {
    Absent,
    Present(BlueprintCompleteness),
}

/// Body of `GET /spaces/{id}/blueprint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintStatusPayload {
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl From<BlueprintStatusPayload> for BlueprintStatus {
    fn from(payload: BlueprintStatusPayload) -> Self {
        if !payload.exists {
            return BlueprintStatus::Absent;
        }
        let completeness = payload
            .status
            .as_deref()
            .and_then(|status| status.parse().ok())
            .unwrap_or_default();
        BlueprintStatus::Present(completeness)
    }
}

/// Token accounting shown above the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageSummary {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl UsageSummary {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Tool details attached to a historical `tool_call`/`tool_result` record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default, alias = "tool_arguments")]
    pub tool_args: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "tool_output")]
    pub output: Option<Value>,
}

/// One stored message as returned by the active-chat endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub role: String,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, alias = "db_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,
}

impl HistoryRecord {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(Value::String(content.into())),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: RecordMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Content as display text. Strings are taken verbatim; other JSON is
    /// rendered compactly.
    pub fn text(&self) -> String {
        match &self.content {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Durable identifier, ignoring empty strings.
    pub fn durable_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// Body of `GET /sessions/space/{id}/active-chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveSessionPayload {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub messages: Vec<HistoryRecord>,
    #[serde(default)]
    pub token_info: Option<UsageSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `POST /chat/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub message: String,
    pub space_id: SpaceId,
    pub space_type: SpaceKind,
    pub session_id: SessionId,
}

/// A tool run reported by a dispatch reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireToolExecution {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_arguments: Option<Value>,
    #[serde(default)]
    pub tool_output: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Reply to `POST /chat/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchReply {
    #[serde(default)]
    pub llm_message: Option<String>,
    #[serde(default)]
    pub tool_executions: Vec<WireToolExecution>,
    #[serde(default)]
    pub token_info: Option<UsageSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl DispatchReply {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            llm_message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Payload of `POST /blueprint/initiate-from-form`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsForm {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_users: Option<String>,
}
