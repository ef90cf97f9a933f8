//! Shaping of outgoing sends and their results into transcript entries.

use devspace_tools::ToolInvocation;
use std::time::Duration;
use thiserror::Error;

use super::conversation::{Message, Origin};
use super::tool_model;
use crate::api::{ApiError, DispatchReply, UsageSummary};
use crate::ids::MessageId;

/// Something the user asked to send.
#[derive(Debug, Clone, PartialEq)]
pub enum SendRequest {
    Text(String),
    Tool(ToolInvocation),
}

impl SendRequest {
    pub fn text(text: impl Into<String>) -> Self {
        SendRequest::Text(text.into())
    }

    /// True for text that is empty after trimming; tool invocations never are.
    pub fn is_blank(&self) -> bool {
        match self {
            SendRequest::Text(text) => text.trim().is_empty(),
            SendRequest::Tool(_) => false,
        }
    }

    /// Text shown in the optimistic user entry.
    pub fn display_text(&self) -> String {
        match self {
            SendRequest::Text(text) => text.trim().to_string(),
            SendRequest::Tool(invocation) => invocation.display_text(),
        }
    }

    /// Text the backend receives.
    pub fn wire_text(&self) -> String {
        match self {
            SendRequest::Text(text) => text.trim().to_string(),
            SendRequest::Tool(invocation) => invocation.prompt_text(),
        }
    }

    pub fn optimistic_message(&self) -> Message {
        Message::optimistic_user(self.display_text(), self.wire_text())
    }
}

/// What became of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing happened.
    Skipped,
    /// The reply (or failure notice) was applied; `appended` excludes the optimistic entry.
    Completed { appended: usize },
    /// The space changed while the send was in flight; the result was dropped.
    Discarded,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("{}", backend_error_text(.error, .details.as_deref()))]
    Backend {
        error: String,
        details: Option<String>,
    },
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

fn backend_error_text(error: &str, details: Option<&str>) -> String {
    match details.map(str::trim).filter(|d| !d.is_empty()) {
        Some(details) => format!("{error} {details}"),
        None => error.to_string(),
    }
}

impl DispatchError {
    /// The single assistant entry recorded for a failed send.
    pub fn to_message(&self) -> Message {
        Message::assistant(
            Message::generate_id("msg-error"),
            format!("Error: {self}"),
            Origin::DispatchResult,
        )
    }
}

/// Transcript entries and usage produced by a successful reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppliedReply {
    pub messages: Vec<Message>,
    pub usage: Option<UsageSummary>,
}

/// Turns a reply into entries: assistant text first (when present), then one
/// tool entry per execution in order. A reply carrying only a backend error
/// becomes a single error entry.
pub fn apply_reply(reply: DispatchReply) -> AppliedReply {
    let DispatchReply {
        llm_message,
        tool_executions,
        token_info,
        error,
        details,
    } = reply;

    let text = llm_message.filter(|text| !text.trim().is_empty());
    let mut messages = Vec::with_capacity(tool_executions.len() + 1);

    if text.is_some() || !tool_executions.is_empty() {
        let reply_id = Message::generate_id("msg-assistant");
        for (index, execution) in tool_executions.iter().enumerate() {
            messages.push(Message::tool_info(
                MessageId::new(format!("{reply_id}-tool-{index}")),
                tool_model::from_live(execution),
                Origin::DispatchResult,
            ));
        }
        if let Some(text) = text {
            messages.insert(0, Message::assistant(reply_id, text, Origin::DispatchResult));
        }
    } else if let Some(error) = error {
        messages.push(DispatchError::Backend { error, details }.to_message());
    }

    AppliedReply {
        messages,
        usage: token_info,
    }
}
