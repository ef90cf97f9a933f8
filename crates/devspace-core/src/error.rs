use thiserror::Error;

use crate::api::ApiError;
use crate::app::mode::WizardInputError;
use crate::app::session_init::SessionInitError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Tool(#[from] devspace_tools::ToolError),
    #[error(transparent)]
    SessionInit(#[from] SessionInitError),
    #[error(transparent)]
    InvalidWizardInput(#[from] WizardInputError),
    #[error("Chat session is not active")]
    NoActiveSession,
    #[error("A message is already being sent")]
    DispatchInFlight,
    #[error("Cancelled")]
    Cancelled,
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Configuration(String),
}
