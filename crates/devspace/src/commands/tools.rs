use super::Command;
use crate::render::render_tool_catalog;
use async_trait::async_trait;
use devspace_tools::SpaceKind;
use eyre::Result;
use std::io::Write;

pub struct ToolsCommand {
    pub kind: SpaceKind,
}

#[async_trait]
impl Command for ToolsCommand {
    async fn execute(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", render_tool_catalog(self.kind))?;
        Ok(())
    }
}
