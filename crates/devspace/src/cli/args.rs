use clap::{Parser, Subcommand};
use devspace_tools::SpaceKind;
use std::path::PathBuf;

/// Chat with a devspace assistant from the terminal.
#[derive(Parser)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Base URL of the devspace API (e.g. http://localhost:5001/api)
    #[arg(long, env = "DEVSPACE_API_BASE_URL", global = true)]
    pub api_url: Option<String>,

    /// Seconds to wait for blueprint and session requests
    #[arg(long, value_name = "SECS", global = true)]
    pub request_timeout: Option<u64>,

    /// Seconds to wait for an assistant reply
    #[arg(long, value_name = "SECS", global = true)]
    pub dispatch_timeout: Option<u64>,

    /// Path to the config file (defaults to <config dir>/devspace/config.toml)
    #[arg(long, env = "DEVSPACE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Open an interactive chat in a space
    Chat {
        /// Space to chat in
        #[arg(short, long, env = "DEVSPACE_SPACE")]
        space: String,
        /// Kind of space (dev or ops)
        #[arg(short, long, default_value_t = SpaceKind::Dev)]
        kind: SpaceKind,
        /// Display name of the space
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the tool catalog for a space kind
    Tools {
        #[arg(short, long, default_value_t = SpaceKind::Dev)]
        kind: SpaceKind,
    },
    /// Inspect the config file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Clone, Copy)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a config file with default values if none exists
    Init,
}
