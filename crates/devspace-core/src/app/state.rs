use devspace_tools::SpaceKind;
use serde::{Deserialize, Serialize};

use super::conversation::Message;
use super::mode::ModeDecision;
use super::session_init::SessionInitError;
use crate::api::UsageSummary;
use crate::ids::{Generation, SessionId, SpaceId};

/// The space a chat is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceContext {
    pub id: SpaceId,
    pub kind: SpaceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SpaceContext {
    pub fn new(id: impl Into<SpaceId>, kind: SpaceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Point-in-time copy of everything a front-end renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSnapshot {
    pub generation: Generation,
    pub space: Option<SpaceContext>,
    pub mode: ModeDecision,
    pub session_id: Option<SessionId>,
    pub session_name: Option<String>,
    pub session_ready: bool,
    pub session_error: Option<SessionInitError>,
    pub sending: bool,
    pub usage: Option<UsageSummary>,
    pub messages: Vec<Message>,
}

/// Notifications broadcast as chat state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Activated {
        generation: Generation,
        space: SpaceContext,
    },
    ModeChanged(ModeDecision),
    SessionReady {
        session_id: SessionId,
        session_name: String,
    },
    SessionFailed(SessionInitError),
    MessagesAppended(Vec<Message>),
    SendingChanged(bool),
    UsageUpdated(UsageSummary),
}
