use super::Command;
use crate::cli::ConfigCommands;
use crate::error::Error;
use async_trait::async_trait;
use devspace_core::ClientConfig;
use devspace_core::config::ConfigFile;
use eyre::Result;
use std::io::Write;
use std::path::PathBuf;

pub struct ConfigCommand {
    pub action: ConfigCommands,
    pub path: PathBuf,
    pub file: ConfigFile,
    pub client: ClientConfig,
}

#[async_trait]
impl Command for ConfigCommand {
    async fn execute(&self) -> Result<()> {
        match self.action {
            ConfigCommands::Show => self.show().map_err(Into::into),
            ConfigCommands::Path => self.print_path().map_err(Into::into),
            ConfigCommands::Init => self.init().map_err(Into::into),
        }
    }
}

impl ConfigCommand {
    fn show(&self) -> std::result::Result<(), Error> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "Config file: {}", self.path.display())?;
        if !self.path.exists() {
            writeln!(stdout, "  (not present, using defaults)")?;
        }
        writeln!(stdout)?;
        writeln!(stdout, "Effective client settings:")?;
        writeln!(stdout, "  api_base_url     = {}", self.client.api_base_url)?;
        writeln!(
            stdout,
            "  request_timeout  = {}s",
            self.client.request_timeout.as_secs()
        )?;
        writeln!(
            stdout,
            "  dispatch_timeout = {}s",
            self.client.dispatch_timeout.as_secs()
        )?;
        writeln!(stdout, "\n{}", toml::to_string_pretty(&self.file)?)?;
        Ok(())
    }

    fn print_path(&self) -> std::result::Result<(), Error> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{}", self.path.display())?;
        Ok(())
    }

    fn init(&self) -> std::result::Result<(), Error> {
        let mut stdout = std::io::stdout();
        if self.path.exists() {
            writeln!(stdout, "Config file already exists: {}", self.path.display())?;
            return Ok(());
        }
        ConfigFile::default().save_to(&self.path)?;
        writeln!(stdout, "Wrote {}", self.path.display())?;
        Ok(())
    }
}
