//! Built-in tool definitions for dev and ops spaces.
//!
//! Each [`ToolSpec`] describes the parameter form a user fills in before the
//! invocation is forwarded to the assistant backend. The definitions are plain
//! data; the backend decides what a tool actually does.

use serde::Serialize;
use serde_json::Value;
use strum::Display;

/// Number of tools rendered directly on a space's toolbar.
pub const MAX_PRIMARY_TOOLS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Checkbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldDefault {
    Text(&'static str),
    Number(i64),
    Flag(bool),
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Text(text) => Value::from(text),
            FieldDefault::Number(n) => Value::from(n),
            FieldDefault::Flag(flag) => Value::Bool(flag),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToolField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldDefault>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

impl ToolField {
    const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Text,
            default: None,
            placeholder: None,
        }
    }

    const fn number(name: &'static str, label: &'static str, default: i64) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Number,
            default: Some(FieldDefault::Number(default)),
            placeholder: None,
        }
    }

    const fn checkbox(name: &'static str, label: &'static str, default: bool) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Checkbox,
            default: Some(FieldDefault::Flag(default)),
            placeholder: None,
        }
    }

    const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(FieldDefault::Text(default));
        self
    }

    const fn with_placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    /// Value the form starts with: the declared default, `false` for
    /// checkboxes, and an empty string otherwise.
    pub fn initial_value(&self) -> Value {
        match (self.default, self.kind) {
            (Some(default), _) => default.to_value(),
            (None, FieldKind::Checkbox) => Value::Bool(false),
            (None, _) => Value::String(String::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToolSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub modal_title: &'static str,
    pub primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<&'static str>,
    pub fields: &'static [ToolField],
}

impl ToolSpec {
    pub fn field(&self, name: &str) -> Option<&ToolField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn requires_confirmation(&self) -> bool {
        self.confirmation.is_some()
    }
}

pub const DEV_TOOLS: &[ToolSpec] = &[
    ToolSpec {
        id: "gitPush",
        label: "Git Push",
        modal_title: "Git Push Parameters",
        primary: true,
        confirmation: None,
        fields: &[
            ToolField::text("branch", "Branch").with_default("main"),
            ToolField::text("commitMessage", "Commit Message (optional)")
                .with_placeholder("Defaults to last commit if empty"),
            ToolField::checkbox("forcePush", "Force Push (-f)", false),
        ],
    },
    ToolSpec {
        id: "deployAlpha",
        label: "Deploy Alpha",
        modal_title: "Deploy to Alpha Parameters",
        primary: true,
        confirmation: None,
        fields: &[
            ToolField::text("version", "Version/Tag")
                .with_default("latest")
                .with_placeholder("e.g., latest, v1.2.0"),
            ToolField::text("serviceName", "Service Name").with_placeholder("e.g., my-app-backend"),
        ],
    },
    ToolSpec {
        id: "runTests",
        label: "Run Tests",
        modal_title: "Run Unit Tests Confirmation",
        primary: true,
        confirmation: Some("Are you sure you want to run all unit tests for the current project?"),
        fields: &[],
    },
    ToolSpec {
        id: "viewCommitHistory",
        label: "View Commit History",
        modal_title: "View Commit History Parameters",
        primary: false,
        confirmation: None,
        fields: &[
            ToolField::text("branch", "Branch").with_default("main"),
            ToolField::number("maxCount", "Max Commits", 10),
        ],
    },
    ToolSpec {
        id: "createBranch",
        label: "Create New Branch",
        modal_title: "Create New Branch",
        primary: false,
        confirmation: None,
        fields: &[
            ToolField::text("newBranchName", "New Branch Name").with_placeholder("e.g., feature/xyz"),
            ToolField::text("fromBranch", "Create from Branch (optional)")
                .with_placeholder("Defaults to current branch"),
        ],
    },
];

pub const OPS_TOOLS: &[ToolSpec] = &[
    ToolSpec {
        id: "getPodLogs",
        label: "Get Pod Logs",
        modal_title: "Get Pod Logs Parameters",
        primary: true,
        confirmation: None,
        fields: &[
            ToolField::text("namespace", "Namespace").with_placeholder("e.g., default"),
            ToolField::text("podName", "Pod Name").with_placeholder("e.g., my-pod-123xyz"),
            ToolField::text("containerName", "Container (optional)"),
            ToolField::number("tailLines", "Tail Lines", 100),
        ],
    },
    ToolSpec {
        id: "restartDeployment",
        label: "Restart Deploy",
        modal_title: "Restart Deployment Confirmation",
        primary: true,
        confirmation: Some(
            "Are you sure you want to perform a rolling restart of this deployment?",
        ),
        fields: &[
            ToolField::text("namespace", "Namespace").with_placeholder("e.g., production"),
            ToolField::text("deploymentName", "Deployment Name")
                .with_placeholder("e.g., user-service"),
        ],
    },
    ToolSpec {
        id: "scaleDeployment",
        label: "Scale Deploy",
        modal_title: "Scale Deployment Parameters",
        primary: true,
        confirmation: None,
        fields: &[
            ToolField::text("namespace", "Namespace"),
            ToolField::text("deploymentName", "Deployment Name"),
            ToolField::number("replicas", "Number of Replicas", 1),
        ],
    },
    ToolSpec {
        id: "viewClusterEvents",
        label: "View Cluster Events",
        modal_title: "View Cluster Events Parameters",
        primary: false,
        confirmation: None,
        fields: &[
            ToolField::text("namespace", "Namespace (optional)")
                .with_placeholder("All namespaces if empty"),
            ToolField::number("limit", "Limit", 50),
        ],
    },
    ToolSpec {
        id: "execInPod",
        label: "Execute in Pod",
        modal_title: "Execute Command in Pod",
        primary: false,
        confirmation: Some("Executing commands directly in pods can be risky. Are you sure?"),
        fields: &[
            ToolField::text("namespace", "Namespace"),
            ToolField::text("podName", "Pod Name"),
            ToolField::text("containerName", "Container (optional)"),
            ToolField::text("command", "Command to Execute").with_placeholder("e.g., ls -l /app"),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn tool_ids_are_unique_per_catalog() {
        for catalog in [DEV_TOOLS, OPS_TOOLS] {
            let ids: HashSet<_> = catalog.iter().map(|spec| spec.id).collect();
            assert_eq!(ids.len(), catalog.len());
        }
    }

    #[rstest]
    #[case("gitPush", "branch", json!("main"))]
    #[case("gitPush", "commitMessage", json!(""))]
    #[case("gitPush", "forcePush", json!(false))]
    #[case("viewCommitHistory", "maxCount", json!(10))]
    #[case("getPodLogs", "tailLines", json!(100))]
    #[case("scaleDeployment", "replicas", json!(1))]
    fn initial_values_follow_field_kind(
        #[case] tool: &str,
        #[case] field: &str,
        #[case] expected: Value,
    ) {
        let spec = DEV_TOOLS
            .iter()
            .chain(OPS_TOOLS)
            .find(|spec| spec.id == tool)
            .unwrap();
        assert_eq!(spec.field(field).unwrap().initial_value(), expected);
    }

    #[test]
    fn confirmation_tools_are_flagged() {
        let confirmed: Vec<_> = DEV_TOOLS
            .iter()
            .chain(OPS_TOOLS)
            .filter(|spec| spec.requires_confirmation())
            .map(|spec| spec.id)
            .collect();
        assert_eq!(confirmed, vec!["runTests", "restartDeployment", "execInPod"]);
    }
}
