use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::catalog::{FieldKind, ToolField, ToolSpec};
use crate::error::ToolError;

/// Raw values collected from a tool's parameter form.
pub type FormData = Map<String, Value>;

impl ToolSpec {
    pub fn default_form(&self) -> FormData {
        self.fields
            .iter()
            .map(|field| (field.name.to_string(), field.initial_value()))
            .collect()
    }
}

/// A user-initiated tool run, ready to be dispatched as a chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_id: String,
    pub label: String,
    pub parameters: FormData,
}

impl ToolInvocation {
    /// Builds an invocation from submitted form values, filling in defaults for
    /// fields the user left out.
    ///
    /// Tools that carry a confirmation prompt are rejected unless `confirmed`.
    pub fn from_form(spec: &ToolSpec, form: FormData, confirmed: bool) -> Result<Self, ToolError> {
        if spec.requires_confirmation() && !confirmed {
            return Err(ToolError::ConfirmationRequired {
                tool_name: spec.id.to_string(),
            });
        }

        let mut parameters = spec.default_form();
        for (name, value) in form {
            let field = spec
                .field(&name)
                .ok_or_else(|| ToolError::invalid_params(spec.id, format!("unknown field '{name}'")))?;
            let value = coerce(spec, field, value)?;
            parameters.insert(name, value);
        }

        debug!(tool = spec.id, params = parameters.len(), "Built tool invocation");
        Ok(Self {
            tool_id: spec.id.to_string(),
            label: spec.label.to_string(),
            parameters,
        })
    }

    /// What the transcript shows for the optimistic user entry.
    pub fn display_text(&self) -> String {
        format!("Using Tool: {}", self.label)
    }

    /// The message the assistant backend receives.
    pub fn prompt_text(&self) -> String {
        format!(
            "User initiated tool: '{}' (ID: {}) with parameters: {}. Please proceed.",
            self.label,
            self.tool_id,
            Value::Object(self.parameters.clone())
        )
    }
}

fn coerce(spec: &ToolSpec, field: &ToolField, value: Value) -> Result<Value, ToolError> {
    let mismatch = |expected: &str| {
        ToolError::invalid_params(
            spec.id,
            format!("field '{}' expects {expected}", field.name),
        )
    };

    match (field.kind, value) {
        (FieldKind::Text, Value::String(text)) => Ok(Value::String(text)),
        (FieldKind::Text, _) => Err(mismatch("text")),
        (FieldKind::Number, Value::Number(n)) => Ok(Value::Number(n)),
        (FieldKind::Number, Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(Value::String(String::new()));
            }
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::from(n));
            }
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| mismatch("a number"))
        }
        (FieldKind::Number, _) => Err(mismatch("a number")),
        (FieldKind::Checkbox, Value::Bool(flag)) => Ok(Value::Bool(flag)),
        (FieldKind::Checkbox, Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" | "" => Ok(Value::Bool(false)),
            _ => Err(mismatch("true or false")),
        },
        (FieldKind::Checkbox, _) => Err(mismatch("true or false")),
    }
}
