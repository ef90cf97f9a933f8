//! Establishes the active session for a space.
//!
//! Concurrent initializations for the same space share one backend read, so a
//! backend that lazily creates sessions never sees two creations for the same
//! activation burst.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ActiveSessionPayload, HistoryRecord, SpaceBackend, UsageSummary};
use crate::ids::{SessionId, SpaceId};

pub const MISSING_SPACE_MESSAGE: &str = "Error: Space context is missing. Cannot load or start chat.";
const MISSING_SPACE_SESSION_NAME: &str = "Chat (No Space Context)";
const MISSING_SPACE_USAGE: &str = "No active session.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{cause}")]
pub struct SessionInitError {
    pub cause: String,
}

impl SessionInitError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Backed by a real backend session; sending is allowed.
    Established,
    /// Stand-in produced without contacting the backend; sending stays disabled.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializedSession {
    pub session_id: SessionId,
    pub session_name: String,
    pub usage: Option<UsageSummary>,
    /// Oldest first.
    pub history: Vec<HistoryRecord>,
    pub kind: SessionKind,
}

impl InitializedSession {
    fn placeholder() -> Self {
        let stamp = chrono::Utc::now().timestamp_millis();
        Self {
            session_id: SessionId::new(format!("temp-session-{stamp}")),
            session_name: MISSING_SPACE_SESSION_NAME.to_string(),
            usage: Some(UsageSummary::from_message(MISSING_SPACE_USAGE)),
            history: vec![
                HistoryRecord::new("assistant", MISSING_SPACE_MESSAGE)
                    .with_id(format!("init-error-{stamp}")),
            ],
            kind: SessionKind::Placeholder,
        }
    }

    pub fn is_established(&self) -> bool {
        self.kind == SessionKind::Established
    }

    fn from_payload(payload: ActiveSessionPayload) -> Result<Self, SessionInitError> {
        let session_id = payload
            .session_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                SessionInitError::new(payload.error.clone().unwrap_or_else(|| {
                    "Failed to initialize chat session. No session ID.".to_string()
                }))
            })?;
        let session_name = payload
            .session_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| {
                let short: String = session_id.chars().take(8).collect();
                format!("Session {short}")
            });
        Ok(Self {
            session_id: SessionId::new(session_id),
            session_name,
            usage: payload.token_info,
            history: payload.messages,
            kind: SessionKind::Established,
        })
    }
}

type SharedInit = Shared<BoxFuture<'static, Result<InitializedSession, SessionInitError>>>;
type InFlight = Mutex<HashMap<SpaceId, SharedInit>>;

/// Drops the map entry for a fetch once a waiter finishes or is cancelled, so a
/// later call never joins an abandoned read.
struct InFlightEntry<'a> {
    in_flight: &'a InFlight,
    space_id: &'a SpaceId,
    fetch: SharedInit,
}

impl Drop for InFlightEntry<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if in_flight
            .get(self.space_id)
            .is_some_and(|current| current.ptr_eq(&self.fetch))
        {
            in_flight.remove(self.space_id);
        }
    }
}

pub struct SessionInitializer {
    backend: Arc<dyn SpaceBackend>,
    timeout: Duration,
    in_flight: InFlight,
}

impl SessionInitializer {
    pub fn new(backend: Arc<dyn SpaceBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Fetches the active session and its history for `space_id`.
    ///
    /// A blank space id yields a placeholder session with a single explanatory
    /// message and no backend call.
    pub async fn initialize(
        &self,
        space_id: &SpaceId,
    ) -> Result<InitializedSession, SessionInitError> {
        if space_id.is_blank() {
            warn!(target: "devspace::session", "No space id; using placeholder session");
            return Ok(InitializedSession::placeholder());
        }

        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = in_flight.get(space_id) {
                debug!(target: "devspace::session", %space_id, "Joining in-flight session fetch");
                existing.clone()
            } else {
                let fetch = fetch_session(self.backend.clone(), space_id.clone(), self.timeout)
                    .boxed()
                    .shared();
                in_flight.insert(space_id.clone(), fetch.clone());
                fetch
            }
        };

        let _entry = InFlightEntry {
            in_flight: &self.in_flight,
            space_id,
            fetch: shared.clone(),
        };
        shared.await
    }
}

async fn fetch_session(
    backend: Arc<dyn SpaceBackend>,
    space_id: SpaceId,
    timeout: Duration,
) -> Result<InitializedSession, SessionInitError> {
    debug!(target: "devspace::session", %space_id, "Fetching active session");
    let payload = match tokio::time::timeout(timeout, backend.fetch_active_session(&space_id)).await
    {
        Ok(Ok(payload)) => payload,
        Ok(Err(err)) => {
            warn!(target: "devspace::session", %space_id, error = %err, "Session fetch failed");
            return Err(SessionInitError::new(err.to_string()));
        }
        Err(_) => {
            warn!(target: "devspace::session", %space_id, ?timeout, "Session fetch timed out");
            return Err(SessionInitError::new(format!(
                "Timed out after {}s waiting for the chat session",
                timeout.as_secs()
            )));
        }
    };

    let session = InitializedSession::from_payload(payload)?;
    info!(
        target: "devspace::session",
        %space_id,
        session_id = %session.session_id,
        history = session.history.len(),
        "Session initialized"
    );
    Ok(session)
}
