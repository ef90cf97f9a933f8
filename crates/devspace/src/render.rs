//! Plain-text rendering of transcript entries and the tool catalog.

use devspace_core::app::{Message, MessageContent, ModeDecision, Role};
use devspace_tools::{SpaceKind, ToolExecution, ToolSpec};
use std::fmt::Write as _;

const DEFAULT_WIDTH: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub width: usize,
    pub show_tool_arguments: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            show_tool_arguments: true,
        }
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "assistant",
        Role::ToolInfo => "tool",
    }
}

fn wrap_into(out: &mut String, text: &str, prefix: &str, options: RenderOptions) {
    let wrap = textwrap::Options::new(options.width.max(20))
        .initial_indent(prefix)
        .subsequent_indent("  ");
    for line in textwrap::wrap(text, wrap) {
        out.push_str(&line);
        out.push('\n');
    }
}

pub fn render_message(message: &Message, options: RenderOptions) -> String {
    let mut out = String::new();
    match message.content() {
        MessageContent::Text { text } => {
            let prefix = format!("[{}] ", speaker(message.role()));
            wrap_into(&mut out, text, &prefix, options);
        }
        MessageContent::ToolInfo { execution } => {
            render_execution(&mut out, execution, options);
        }
    }
    out
}

fn render_execution(out: &mut String, execution: &ToolExecution, options: RenderOptions) {
    let _ = writeln!(out, "[tool] {}", execution.summary());
    if options.show_tool_arguments && !execution.arguments.is_empty() {
        let arguments = serde_json::to_string_pretty(&execution.arguments)
            .unwrap_or_else(|_| "{}".to_string());
        let _ = writeln!(out, "  arguments:");
        for line in arguments.lines() {
            let _ = writeln!(out, "    {line}");
        }
    }
    let output = match execution.output.as_value() {
        Some(serde_json::Value::String(_)) | None => execution.output.to_string(),
        Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
    };
    let _ = writeln!(out, "  output:");
    for line in output.lines() {
        let _ = writeln!(out, "    {line}");
    }
}

pub fn render_mode(mode: &ModeDecision) -> &'static str {
    match mode {
        ModeDecision::Checking => "Checking the application blueprint...",
        ModeDecision::WizardSelection => {
            "This space has no application blueprint yet. Choose how to start:\n  \
             /wizard chat             build it through an interactive chat\n  \
             /wizard repo <url>       analyze an existing repository\n  \
             /wizard form <file> [target users]\n                           \
             analyze a requirements form\n  \
             /wizard json <file>      import a blueprint JSON file"
        }
        ModeDecision::ChatActive { .. } => "Chat is ready.",
    }
}

fn render_spec(out: &mut String, spec: &ToolSpec) {
    let confirm = if spec.requires_confirmation() {
        " (asks for confirmation)"
    } else {
        ""
    };
    let _ = writeln!(out, "  {:<20} {}{confirm}", spec.id, spec.label);
    for field in spec.fields {
        let mut line = format!("      {}={}  {}", field.name, field.kind, field.label);
        if let Some(default) = field.default {
            let _ = write!(line, " [default: {}]", default.to_value());
        } else if let Some(placeholder) = field.placeholder {
            let _ = write!(line, " ({placeholder})");
        }
        out.push_str(&line);
        out.push('\n');
    }
}

pub fn render_tool_catalog(kind: SpaceKind) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Tools for {kind} spaces:");
    for spec in kind.primary_tools() {
        render_spec(&mut out, spec);
    }
    let mut more = kind.secondary_tools().peekable();
    if more.peek().is_some() {
        let _ = writeln!(out, "More tools:");
        for spec in more {
            render_spec(&mut out, spec);
        }
    }
    out
}
