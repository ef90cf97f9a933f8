use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::catalog::{DEV_TOOLS, OPS_TOOLS, ToolSpec};

/// The kind of workspace a space represents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SpaceKind {
    #[default]
    Dev,
    Ops,
}

impl SpaceKind {
    /// Every tool offered in this kind of space, primary tools first.
    pub fn tools(self) -> &'static [ToolSpec] {
        match self {
            SpaceKind::Dev => DEV_TOOLS,
            SpaceKind::Ops => OPS_TOOLS,
        }
    }

    pub fn find_tool(self, id: &str) -> Option<&'static ToolSpec> {
        self.tools().iter().find(|spec| spec.id == id)
    }

    /// Tools shown directly on the toolbar.
    pub fn primary_tools(self) -> impl Iterator<Item = &'static ToolSpec> {
        self.tools()
            .iter()
            .filter(|spec| spec.primary)
            .take(crate::catalog::MAX_PRIMARY_TOOLS)
    }

    /// Tools that live behind the "more tools" menu, including primary tools
    /// beyond the toolbar limit.
    pub fn secondary_tools(self) -> impl Iterator<Item = &'static ToolSpec> {
        let primary: Vec<&str> = self.primary_tools().map(|spec| spec.id).collect();
        self.tools()
            .iter()
            .filter(move |spec| !primary.contains(&spec.id))
    }
}
