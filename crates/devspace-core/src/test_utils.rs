//! Test utilities for devspace-core
//!
//! [`ScriptedBackend`] is an in-memory [`SpaceBackend`] that replays queued
//! responses and records every call, so orchestration can be tested without a
//! server.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

use crate::api::{
    ActiveSessionPayload, ApiError, BlueprintCompleteness, BlueprintStatus, DispatchReply,
    DispatchRequest, HistoryRecord, RequirementsForm, SpaceBackend,
};
use crate::ids::SpaceId;

#[derive(Debug, Clone, PartialEq)]
pub enum InitiateCall {
    Repo {
        space_id: SpaceId,
        repo_url: String,
    },
    Form {
        space_id: SpaceId,
        form: RequirementsForm,
    },
    Json {
        space_id: SpaceId,
        json_content: String,
    },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replays queued responses. When a queue runs dry the backend answers with a
/// present blueprint of unknown completeness, a session error, or an empty
/// reply respectively.
#[derive(Default)]
pub struct ScriptedBackend {
    blueprints: Mutex<VecDeque<Result<BlueprintStatus, ApiError>>>,
    sessions: Mutex<VecDeque<Result<ActiveSessionPayload, ApiError>>>,
    replies: Mutex<VecDeque<Result<DispatchReply, ApiError>>>,
    dispatched: Mutex<Vec<DispatchRequest>>,
    initiated: Mutex<Vec<InitiateCall>>,
    dispatch_gate: Mutex<Option<Arc<Notify>>>,
    latency: Duration,
    blueprint_checks: AtomicUsize,
    session_fetches: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to every call before it answers.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Convenience payload for a session with the given history.
    pub fn session(session_id: &str, messages: Vec<HistoryRecord>) -> ActiveSessionPayload {
        ActiveSessionPayload {
            session_id: Some(session_id.to_string()),
            session_name: Some(format!("Chat {session_id}")),
            messages,
            token_info: None,
            error: None,
        }
    }

    pub fn push_blueprint(&self, status: Result<BlueprintStatus, ApiError>) {
        lock(&self.blueprints).push_back(status);
    }

    pub fn push_session(&self, session: Result<ActiveSessionPayload, ApiError>) {
        lock(&self.sessions).push_back(session);
    }

    pub fn push_reply(&self, reply: Result<DispatchReply, ApiError>) {
        lock(&self.replies).push_back(reply);
    }

    /// Makes every subsequent dispatch wait until the returned handle is notified.
    pub fn gate_dispatch(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.dispatch_gate) = Some(gate.clone());
        gate
    }

    pub fn dispatched(&self) -> Vec<DispatchRequest> {
        lock(&self.dispatched).clone()
    }

    pub fn initiated(&self) -> Vec<InitiateCall> {
        lock(&self.initiated).clone()
    }

    pub fn blueprint_checks(&self) -> usize {
        self.blueprint_checks.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.session_fetches.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl SpaceBackend for ScriptedBackend {
    async fn check_blueprint(&self, _space_id: &SpaceId) -> Result<BlueprintStatus, ApiError> {
        self.blueprint_checks.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        lock(&self.blueprints)
            .pop_front()
            .unwrap_or(Ok(BlueprintStatus::Present(BlueprintCompleteness::Unknown)))
    }

    async fn fetch_active_session(
        &self,
        _space_id: &SpaceId,
    ) -> Result<ActiveSessionPayload, ApiError> {
        self.session_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        lock(&self.sessions).pop_front().unwrap_or_else(|| {
            Err(ApiError::InvalidRequest(
                "no scripted session available".to_string(),
            ))
        })
    }

    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReply, ApiError> {
        lock(&self.dispatched).push(request.clone());
        let gate = lock(&self.dispatch_gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.delay().await;
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Ok(DispatchReply::default()))
    }

    async fn initiate_blueprint_from_repo(
        &self,
        space_id: &SpaceId,
        repo_url: &str,
    ) -> Result<(), ApiError> {
        lock(&self.initiated).push(InitiateCall::Repo {
            space_id: space_id.clone(),
            repo_url: repo_url.to_string(),
        });
        Ok(())
    }

    async fn initiate_blueprint_from_form(
        &self,
        space_id: &SpaceId,
        form: &RequirementsForm,
    ) -> Result<(), ApiError> {
        lock(&self.initiated).push(InitiateCall::Form {
            space_id: space_id.clone(),
            form: form.clone(),
        });
        Ok(())
    }

    async fn initiate_blueprint_from_json(
        &self,
        space_id: &SpaceId,
        json_content: &str,
    ) -> Result<(), ApiError> {
        lock(&self.initiated).push(InitiateCall::Json {
            space_id: space_id.clone(),
            json_content: json_content.to_string(),
        });
        Ok(())
    }
}
