//! Blueprint mode decision: whether an activation opens the creation wizard or
//! goes straight to chat, and which seed the first assistant message uses.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::api::{ApiError, BlueprintCompleteness, BlueprintStatus};
use crate::error::{Error, Result};

pub const CHECK_FAILED_SEED: &str =
    "Unable to check the application blueprint status, please try again later.";

/// Where the first assistant message of an activation comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Seed {
    /// Blueprint exists; the welcome rule chooses the text.
    Resume(BlueprintCompleteness),
    /// Fixed text that replaces the welcome rule.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModeDecision {
    Checking,
    WizardSelection,
    ChatActive { seed: Seed },
}

#[derive(Debug, Error)]
pub enum BlueprintCheckError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Blueprint check timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl ModeDecision {
    pub fn is_chat_active(&self) -> bool {
        matches!(self, ModeDecision::ChatActive { .. })
    }

    pub fn seed(&self) -> Option<&Seed> {
        match self {
            ModeDecision::ChatActive { seed } => Some(seed),
            _ => None,
        }
    }

    /// Decision once the blueprint check settles. Failures degrade to chat.
    pub fn after_blueprint_check(
        result: &std::result::Result<BlueprintStatus, BlueprintCheckError>,
    ) -> ModeDecision {
        match result {
            Ok(BlueprintStatus::Absent) => ModeDecision::WizardSelection,
            Ok(BlueprintStatus::Present(completeness)) => ModeDecision::ChatActive {
                seed: Seed::Resume(*completeness),
            },
            Err(_) => ModeDecision::ChatActive {
                seed: Seed::Text(CHECK_FAILED_SEED.to_string()),
            },
        }
    }

    /// Resolves the wizard with `action`. Only valid from wizard selection; an
    /// invalid action leaves the decision unchanged.
    pub fn after_wizard(&self, action: &WizardAction) -> Result<ModeDecision> {
        if !matches!(self, ModeDecision::WizardSelection) {
            return Err(Error::InvalidOperation(format!(
                "wizard actions are only accepted during wizard selection (current: {self:?})"
            )));
        }
        action.validate()?;
        Ok(ModeDecision::ChatActive {
            seed: Seed::Text(action.seed_text()),
        })
    }
}

/// A choice made in the blueprint creation wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardAction {
    InteractiveChat,
    FromRepository {
        repo_url: String,
    },
    UploadForm {
        file_name: String,
        target_users: Option<String>,
        file_data: Option<String>,
    },
    BlueprintJson {
        json_content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardInputError {
    #[error("A repository URL is required")]
    MissingRepositoryUrl,
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },
    #[error("Select a requirements form file to upload")]
    MissingFileName,
    #[error("Blueprint JSON is empty")]
    EmptyJson,
    #[error("Blueprint JSON is not valid: {0}")]
    InvalidJson(String),
}

impl WizardAction {
    pub fn name(&self) -> &'static str {
        match self {
            WizardAction::InteractiveChat => "interactive_chat",
            WizardAction::FromRepository { .. } => "from_repository",
            WizardAction::UploadForm { .. } => "upload_form",
            WizardAction::BlueprintJson { .. } => "blueprint_json",
        }
    }

    /// Whether this action kicks off a backend analysis.
    pub fn initiates_analysis(&self) -> bool {
        !matches!(self, WizardAction::InteractiveChat)
    }

    pub fn validate(&self) -> std::result::Result<(), WizardInputError> {
        match self {
            WizardAction::InteractiveChat => Ok(()),
            WizardAction::FromRepository { repo_url } => validate_repo_url(repo_url),
            WizardAction::UploadForm { file_name, .. } => {
                if file_name.trim().is_empty() {
                    Err(WizardInputError::MissingFileName)
                } else {
                    Ok(())
                }
            }
            WizardAction::BlueprintJson { json_content } => {
                if json_content.trim().is_empty() {
                    return Err(WizardInputError::EmptyJson);
                }
                serde_json::from_str::<serde_json::Value>(json_content)
                    .map(|_| ())
                    .map_err(|err| WizardInputError::InvalidJson(err.to_string()))
            }
        }
    }

    pub fn seed_text(&self) -> String {
        match self {
            WizardAction::InteractiveChat => "Great, let's build your application blueprint through an interactive chat. \
                 What kind of application do you want to build, and what are its core features?"
                .to_string(),
            WizardAction::FromRepository { repo_url } => format!(
                "Got it! Starting analysis of the repository you provided: {}. \
                 Once the analysis finishes, we will confirm and fill in the blueprint together.",
                repo_url.trim()
            ),
            WizardAction::UploadForm { file_name, .. } => format!(
                "Thanks for uploading the requirements form: {}. Analysis is under way. \
                 Once it finishes, we will review it together.",
                file_name.trim()
            ),
            WizardAction::BlueprintJson { .. } => "The application blueprint JSON has been received. \
                 Validating and parsing it now. Once done, we will confirm and fill in any missing information."
                .to_string(),
        }
    }
}

fn validate_repo_url(repo_url: &str) -> std::result::Result<(), WizardInputError> {
    let trimmed = repo_url.trim();
    if trimmed.is_empty() {
        return Err(WizardInputError::MissingRepositoryUrl);
    }
    let invalid = |reason: &str| WizardInputError::InvalidRepositoryUrl {
        url: trimmed.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(trimmed).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http(s) repository URLs are supported"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}
