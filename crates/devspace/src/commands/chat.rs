use async_trait::async_trait;
use devspace_core::api::HttpBackend;
use devspace_core::app::{ChatEvent, ModeDecision, SendOutcome, SendRequest, WizardAction};
use devspace_core::{ClientConfig, Error as CoreError, SpaceChat, SpaceContext};
use devspace_tools::{FormData, ToolError};
use eyre::{Result, eyre};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Command;
use crate::render::{RenderOptions, render_message, render_mode, render_tool_catalog};
use crate::repl::{self, HELP, ReplCommand, WizardChoice};

pub struct ChatCommand {
    pub space: SpaceContext,
    pub config: ClientConfig,
    pub render: RenderOptions,
}

fn say(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{text}");
    let _ = stdout.flush();
}

fn complain(text: &str) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{text}");
}

/// Human-readable note for a failed chat operation. Superseded activations are silent.
fn report(err: &CoreError) {
    match err {
        CoreError::Cancelled => debug!(target: "devspace::cli", "Operation superseded"),
        CoreError::NoActiveSession => complain(
            "No chat session is active. Resolve the blueprint wizard or use /retry.",
        ),
        CoreError::DispatchInFlight => {
            complain("Still waiting for the previous reply; try again in a moment.");
        }
        other => complain(&format!("Error: {other}")),
    }
}

fn spawn_renderer(chat: &SpaceChat, options: RenderOptions) -> JoinHandle<()> {
    let mut events = chat.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ChatEvent::Activated { space, .. }) => {
                    let name = space.name.as_deref().unwrap_or(space.id.as_str());
                    say(&format!("== {} ({} space) ==", name, space.kind));
                }
                Ok(ChatEvent::ModeChanged(mode)) => {
                    if !matches!(mode, ModeDecision::ChatActive { .. }) {
                        say(render_mode(&mode));
                    }
                }
                Ok(ChatEvent::SessionReady { session_name, .. }) => {
                    say(&format!("-- session: {session_name} --"));
                }
                Ok(ChatEvent::SessionFailed(_)) => {
                    say("Sending is disabled until the session loads. Use /retry.");
                }
                Ok(ChatEvent::MessagesAppended(messages)) => {
                    for message in &messages {
                        let mut stdout = std::io::stdout().lock();
                        let _ = write!(stdout, "{}", render_message(message, options));
                        let _ = stdout.flush();
                    }
                }
                Ok(ChatEvent::SendingChanged(true)) => say("..."),
                Ok(ChatEvent::SendingChanged(false) | ChatEvent::UsageUpdated(_)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "devspace::cli", skipped, "Renderer fell behind chat events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn read_wizard_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))
}

fn wizard_action(choice: WizardChoice) -> Result<WizardAction> {
    Ok(match choice {
        WizardChoice::Chat => WizardAction::InteractiveChat,
        WizardChoice::Repository(repo_url) => WizardAction::FromRepository { repo_url },
        WizardChoice::Form { file, target_users } => {
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            // Binary forms are sent by name only.
            let file_data = std::fs::read_to_string(&file).ok();
            WizardAction::UploadForm {
                file_name,
                target_users,
                file_data,
            }
        }
        WizardChoice::Json(path) => WizardAction::BlueprintJson {
            json_content: read_wizard_file(&path)?,
        },
    })
}

impl ChatCommand {
    fn spawn_send(chat: &SpaceChat, request: SendRequest) {
        let chat = chat.clone();
        tokio::spawn(async move {
            match chat.send(request).await {
                Ok(SendOutcome::Discarded) => {
                    debug!(target: "devspace::cli", "Reply dropped after space switch");
                }
                Ok(_) => {}
                Err(err) => report(&err),
            }
        });
    }

    fn spawn_tool(chat: &SpaceChat, tool_id: String, form: FormData, confirmed: bool) {
        let chat = chat.clone();
        tokio::spawn(async move {
            match chat.invoke_tool(&tool_id, form, confirmed).await {
                Err(CoreError::Tool(ToolError::ConfirmationRequired { .. })) => {
                    let prompt = chat
                        .snapshot()
                        .await
                        .space
                        .and_then(|space| space.kind.find_tool(&tool_id))
                        .and_then(|spec| spec.confirmation)
                        .unwrap_or("This tool needs confirmation.");
                    complain(&format!("{prompt} Re-run with -y to proceed."));
                }
                Err(err) => report(&err),
                Ok(_) => {}
            }
        });
    }

    async fn handle(&self, chat: &SpaceChat, command: ReplCommand) -> Result<bool> {
        match command {
            ReplCommand::Send(text) => Self::spawn_send(chat, SendRequest::text(text)),
            ReplCommand::Tool {
                tool_id,
                form,
                confirmed,
            } => Self::spawn_tool(chat, tool_id, form, confirmed),
            ReplCommand::Tools => {
                let kind = chat
                    .snapshot()
                    .await
                    .space
                    .map(|space| space.kind)
                    .unwrap_or(self.space.kind);
                let mut stdout = std::io::stdout();
                write!(stdout, "{}", render_tool_catalog(kind))?;
            }
            ReplCommand::Wizard(choice) => {
                let action = wizard_action(choice)?;
                if let Err(err) = chat.choose_wizard(action).await {
                    report(&err);
                }
            }
            ReplCommand::Space { id, kind } => {
                let kind = kind.unwrap_or(self.space.kind);
                let chat = chat.clone();
                tokio::spawn(async move {
                    if let Err(err) = chat.activate(SpaceContext::new(id, kind)).await {
                        report(&err);
                    }
                });
            }
            ReplCommand::Retry => match chat.retry_session().await {
                Ok(true) => {}
                Ok(false) => complain("The chat session is still unavailable."),
                Err(err) => report(&err),
            },
            ReplCommand::Refresh => match chat.refresh_history().await {
                Ok(0) => say("Transcript is up to date."),
                Ok(count) => say(&format!("Loaded {count} new message(s).")),
                Err(err) => report(&err),
            },
            ReplCommand::Usage => match chat.snapshot().await.usage {
                Some(usage) => say(&format!("Usage: {}", usage.message)),
                None => say("No usage reported yet."),
            },
            ReplCommand::Help => say(HELP),
            ReplCommand::Quit => return Ok(false),
        }
        Ok(true)
    }
}

#[async_trait]
impl Command for ChatCommand {
    async fn execute(&self) -> Result<()> {
        let backend = HttpBackend::new(&self.config)
            .map_err(|e| eyre!("Failed to create API client: {}", e))?;
        let chat = SpaceChat::new(Arc::new(backend), self.config.clone());
        let renderer = spawn_renderer(&chat, self.render);

        say(&format!("Connecting to {}", self.config.api_base_url));
        if let Err(err) = chat.activate(self.space.clone()).await {
            report(&err);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let command = match repl::parse(&line) {
                Ok(command) => command,
                Err(err) => {
                    complain(&err.to_string());
                    continue;
                }
            };
            match self.handle(&chat, command).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => complain(&format!("{err}")),
            }
        }

        renderer.abort();
        Ok(())
    }
}
