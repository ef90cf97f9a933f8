//! Client configuration.
//!
//! Values are resolved from built-in defaults, then `config.toml` in the user's
//! config directory, then `DEVSPACE_*` environment variables. Binaries may
//! layer command-line overrides on top through the `with_*` builders.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5001/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(120);

pub const ENV_API_BASE_URL: &str = "DEVSPACE_API_BASE_URL";
pub const ENV_REQUEST_TIMEOUT: &str = "DEVSPACE_REQUEST_TIMEOUT_SECS";
pub const ENV_DISPATCH_TIMEOUT: &str = "DEVSPACE_DISPATCH_TIMEOUT_SECS";

/// Settings the chat core needs at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Bound for blueprint checks, session fetches and initiate calls.
    pub request_timeout: Duration,
    /// Bound for a single chat dispatch; assistant replies can take a while.
    pub dispatch_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Defaults, overlaid with the config file and the process environment.
    pub fn load() -> Result<Self> {
        let file = ConfigFile::load()?;
        Self::from_sources(&file, |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        file: &ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = &file.client.api_base_url {
            config = config.with_api_base_url(url)?;
        }
        if let Some(secs) = file.client.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.client.dispatch_timeout_secs {
            config.dispatch_timeout = Duration::from_secs(secs);
        }

        if let Some(url) = env(ENV_API_BASE_URL) {
            config = config.with_api_base_url(&url)?;
        }
        if let Some(secs) = env(ENV_REQUEST_TIMEOUT) {
            config.request_timeout = parse_secs(ENV_REQUEST_TIMEOUT, &secs)?;
        }
        if let Some(secs) = env(ENV_DISPATCH_TIMEOUT) {
            config.dispatch_timeout = parse_secs(ENV_DISPATCH_TIMEOUT, &secs)?;
        }

        Ok(config)
    }

    pub fn with_api_base_url(mut self, url: &str) -> Result<Self> {
        let trimmed = url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|err| Error::Configuration(format!("invalid API base URL '{url}': {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "API base URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }
        self.api_base_url = trimmed.to_string();
        Ok(self)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::Configuration(format!("{key} must be a whole number of seconds")))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSection {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub dispatch_timeout_secs: Option<u64>,
}

/// Terminal presentation settings; read by the CLI only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPreferences {
    pub transcript_width: Option<usize>,
    #[serde(default)]
    pub show_tool_arguments: bool,
}

/// On-disk layout of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub ui: UiPreferences,
}

impl ConfigFile {
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            Error::Configuration("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("devspace").join("config.toml"))
    }

    /// Load from the default location, or return defaults if the file is missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        match toml::from_str(&contents) {
            Ok(file) => Ok(file),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config file at {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
