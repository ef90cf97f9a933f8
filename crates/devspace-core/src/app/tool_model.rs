//! Builds [`ToolExecution`] values from live dispatch replies and stored history.

use devspace_tools::{FALLBACK_TOOL_NAME, ToolExecution, ToolOutput, ToolStatus};
use serde_json::{Map, Value};
use tracing::warn;

use crate::api::{HistoryRecord, WireToolExecution};

/// Which kind of stored record a tool entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    ToolCall,
    ToolResult,
}

impl RecordKind {
    pub fn from_role(role: &str) -> Option<Self> {
        match role {
            "tool_call" => Some(RecordKind::ToolCall),
            "tool_result" => Some(RecordKind::ToolResult),
            _ => None,
        }
    }

    fn default_status(self) -> ToolStatus {
        match self {
            RecordKind::ToolCall => ToolStatus::Pending,
            RecordKind::ToolResult => ToolStatus::Success,
        }
    }
}

/// Models a tool execution reported by a dispatch reply.
pub fn from_live(execution: &WireToolExecution) -> ToolExecution {
    let name = tool_name(execution.tool_name.as_deref());
    ToolExecution::new(name, status(execution.status.as_deref(), ToolStatus::Success))
        .with_arguments(arguments(name, execution.tool_arguments.as_ref()))
        .with_output(ToolOutput::from_optional(execution.tool_output.clone()))
}

/// Models a stored `tool_call` or `tool_result` record.
///
/// Without metadata output, a `tool_result` record's own content is the output.
pub fn from_history(kind: RecordKind, record: &HistoryRecord) -> ToolExecution {
    let metadata = record.metadata.clone().unwrap_or_default();
    let name = tool_name(metadata.tool_name.as_deref());

    let output = match (metadata.output, kind) {
        (Some(output), _) => ToolOutput::from_optional(Some(output)),
        (None, RecordKind::ToolResult) => ToolOutput::from_optional(
            record
                .content
                .clone()
                .filter(|content| !matches!(content, Value::String(s) if s.is_empty())),
        ),
        (None, RecordKind::ToolCall) => ToolOutput::NoOutput,
    };

    ToolExecution::new(name, status(metadata.status.as_deref(), kind.default_status()))
        .with_arguments(arguments(name, metadata.tool_args.as_ref()))
        .with_output(output)
}

fn tool_name(name: Option<&str>) -> &str {
    name.map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_TOOL_NAME)
}

fn status(raw: Option<&str>, default: ToolStatus) -> ToolStatus {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(target: "devspace::tool_model", status = raw, "Unrecognized tool status");
            default
        }),
    }
}

/// Arguments are an object, or a string holding a JSON object which is parsed
/// once. Anything else yields an empty map.
fn arguments(tool: &str, raw: Option<&Value>) -> Map<String, Value> {
    match raw {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(text)) if text.trim().is_empty() => Map::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!(target: "devspace::tool_model", tool, "Tool arguments are not a JSON object");
                Map::new()
            }
        },
        Some(other) => {
            warn!(
                target: "devspace::tool_model",
                tool,
                kind = %json_kind(other),
                "Ignoring non-object tool arguments"
            );
            Map::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
