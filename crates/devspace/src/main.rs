use clap::Parser;
use eyre::Result;

use devspace::cli::config::{client_config, config_path, load_config_file, load_env};
use devspace::cli::{Cli, Commands};
use devspace::commands::{
    Command, chat::ChatCommand, config::ConfigCommand, tools::ToolsCommand,
};
use devspace::render::RenderOptions;
use devspace_core::SpaceContext;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load .env file if it exists
    load_env()?;

    // Initialize tracing (level configured via RUST_LOG env var)
    devspace_core::utils::tracing::init_tracing()?;

    let path = config_path(&cli)?;
    let file = load_config_file(&path)?;
    let client = client_config(&cli, &file)?;
    debug!(
        target: "devspace::cli",
        config = %path.display(),
        api_base_url = %client.api_base_url,
        "Resolved client configuration"
    );

    match cli.command.clone() {
        Commands::Chat { space, kind, name } => {
            let mut context = SpaceContext::new(space, kind);
            if let Some(name) = name {
                context = context.with_name(name);
            }
            let mut render = RenderOptions::default();
            if let Some(width) = file.ui.transcript_width {
                render.width = width;
            }
            render.show_tool_arguments = file.ui.show_tool_arguments;
            let command = ChatCommand {
                space: context,
                config: client,
                render,
            };
            command.execute().await
        }
        Commands::Tools { kind } => ToolsCommand { kind }.execute().await,
        Commands::Config { action } => {
            let command = ConfigCommand {
                action,
                path,
                file,
                client,
            };
            command.execute().await
        }
    }
}
