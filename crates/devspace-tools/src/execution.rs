use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use strum::{Display, EnumString};

/// Name shown when a record does not say which tool ran.
pub const FALLBACK_TOOL_NAME: &str = "Tool Execution";

const NO_OUTPUT_TEXT: &str = "(No output or void)";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ToolStatus {
    #[default]
    Pending,
    Success,
    Error,
}

/// What a tool produced. The payload is kept exactly as the backend sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolOutput {
    Value(Value),
    #[default]
    NoOutput,
}

impl ToolOutput {
    /// `null` and absent payloads collapse to [`ToolOutput::NoOutput`].
    pub fn from_optional(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => ToolOutput::NoOutput,
            Some(value) => ToolOutput::Value(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ToolOutput::NoOutput)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ToolOutput::Value(value) => Some(value),
            ToolOutput::NoOutput => None,
        }
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutput::Value(Value::String(text)) => f.write_str(text),
            ToolOutput::Value(value) => write!(f, "{value}"),
            ToolOutput::NoOutput => f.write_str(NO_OUTPUT_TEXT),
        }
    }
}

/// A single tool run as it appears in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(default)]
    pub output: ToolOutput,
    #[serde(default)]
    pub status: ToolStatus,
}

impl ToolExecution {
    pub fn new(tool_name: impl Into<String>, status: ToolStatus) -> Self {
        let tool_name = tool_name.into();
        let tool_name = if tool_name.trim().is_empty() {
            FALLBACK_TOOL_NAME.to_string()
        } else {
            tool_name
        };
        Self {
            tool_name,
            arguments: Map::new(),
            output: ToolOutput::NoOutput,
            status,
        }
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_output(mut self, output: ToolOutput) -> Self {
        self.output = output;
        self
    }

    /// Header line, e.g. `Tool: gitPush (Success)`.
    pub fn summary(&self) -> String {
        let status = self.status.to_string();
        let mut chars = status.chars();
        let status = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        format!("Tool: {} ({status})", self.tool_name)
    }
}
