//! Parsing of interactive chat input.
//!
//! Plain lines are messages; lines starting with `/` are commands. Arguments
//! are split with shell quoting rules, so `/tool gitPush commitMessage="fix bug"`
//! works as expected.

use devspace_tools::{FormData, SpaceKind};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  <text>                         send a message
  /tool <id> [-y] key=value ...  run a catalog tool (-y confirms risky tools)
  /tools                         list tools for this space
  /wizard chat                   build the blueprint through chat
  /wizard repo <url>             analyze a repository
  /wizard form <file> [users]    analyze a requirements form
  /wizard json <file>            import a blueprint JSON file
  /space <id> [dev|ops]          switch to another space
  /retry                         retry loading the chat session
  /refresh                       reload history from the server
  /usage                         show token usage
  /help                          show this help
  /quit                          exit";

#[derive(Debug, Clone, PartialEq)]
pub enum WizardChoice {
    Chat,
    Repository(String),
    Form {
        file: PathBuf,
        target_users: Option<String>,
    },
    Json(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Send(String),
    Tool {
        tool_id: String,
        form: FormData,
        confirmed: bool,
    },
    Tools,
    Wizard(WizardChoice),
    Space { id: String, kind: Option<SpaceKind> },
    Retry,
    Refresh,
    Usage,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ReplError {
    #[error("Unknown command '/{0}'. Type /help for a list of commands.")]
    UnknownCommand(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Expected key=value, got '{0}'")]
    InvalidParameter(String),
    #[error("Unknown space kind '{0}' (expected dev or ops)")]
    InvalidSpaceKind(String),
    #[error("Could not parse input: {0}")]
    Quoting(String),
}

pub fn parse(line: &str) -> Result<ReplCommand, ReplError> {
    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Ok(ReplCommand::Send(line.to_string()));
    };
    let words = shell_words::split(rest).map_err(|err| ReplError::Quoting(err.to_string()))?;
    let Some((name, args)) = words.split_first() else {
        return Err(ReplError::UnknownCommand(String::new()));
    };

    match name.as_str() {
        "tool" => parse_tool(args),
        "tools" => Ok(ReplCommand::Tools),
        "wizard" => parse_wizard(args).map(ReplCommand::Wizard),
        "space" => parse_space(args),
        "retry" => Ok(ReplCommand::Retry),
        "refresh" => Ok(ReplCommand::Refresh),
        "usage" => Ok(ReplCommand::Usage),
        "help" | "?" => Ok(ReplCommand::Help),
        "quit" | "exit" | "q" => Ok(ReplCommand::Quit),
        other => Err(ReplError::UnknownCommand(other.to_string())),
    }
}

fn parse_tool(args: &[String]) -> Result<ReplCommand, ReplError> {
    const USAGE: &str = "/tool <id> [-y] key=value ...";
    let Some((tool_id, rest)) = args.split_first() else {
        return Err(ReplError::Usage(USAGE));
    };

    let mut form = FormData::new();
    let mut confirmed = false;
    for arg in rest {
        if arg == "-y" || arg == "--yes" {
            confirmed = true;
            continue;
        }
        let (key, value) = arg
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| ReplError::InvalidParameter(arg.clone()))?;
        form.insert(key.to_string(), Value::String(value.to_string()));
    }

    Ok(ReplCommand::Tool {
        tool_id: tool_id.clone(),
        form,
        confirmed,
    })
}

fn parse_wizard(args: &[String]) -> Result<WizardChoice, ReplError> {
    const USAGE: &str = "/wizard chat | repo <url> | form <file> [users] | json <file>";
    match args {
        [choice] if choice == "chat" => Ok(WizardChoice::Chat),
        [choice, url] if choice == "repo" => Ok(WizardChoice::Repository(url.clone())),
        [choice, file, users @ ..] if choice == "form" => Ok(WizardChoice::Form {
            file: PathBuf::from(file),
            target_users: (!users.is_empty()).then(|| users.join(" ")),
        }),
        [choice, file] if choice == "json" => Ok(WizardChoice::Json(PathBuf::from(file))),
        _ => Err(ReplError::Usage(USAGE)),
    }
}

fn parse_space(args: &[String]) -> Result<ReplCommand, ReplError> {
    match args {
        [id] => Ok(ReplCommand::Space {
            id: id.clone(),
            kind: None,
        }),
        [id, kind] => {
            let kind = kind
                .parse::<SpaceKind>()
                .map_err(|_| ReplError::InvalidSpaceKind(kind.clone()))?;
            Ok(ReplCommand::Space {
                id: id.clone(),
                kind: Some(kind),
            })
        }
        _ => Err(ReplError::Usage("/space <id> [dev|ops]")),
    }
}
