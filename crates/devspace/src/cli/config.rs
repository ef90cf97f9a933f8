use devspace_core::ClientConfig;
use devspace_core::config::ConfigFile;
use dotenvy::dotenv;
use eyre::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::Cli;

pub fn load_env() -> Result<()> {
    dotenv().ok();
    Ok(())
}

pub fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(ConfigFile::config_path()?),
    }
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    Ok(ConfigFile::load_from(path)?)
}

/// Client settings from the file and environment, with command-line flags on top.
pub fn client_config(cli: &Cli, file: &ConfigFile) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_sources(file, |key| std::env::var(key).ok())?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_base_url(url)?;
    }
    if let Some(secs) = cli.request_timeout {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.dispatch_timeout {
        config = config.with_dispatch_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}
