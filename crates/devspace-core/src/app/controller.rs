//! The space chat controller.
//!
//! [`SpaceChat`] owns one activation at a time. Every activation gets a fresh
//! [`Generation`] and [`CancellationToken`]; results of remote calls made for an
//! older generation are dropped on arrival. State lives behind a mutex that is
//! never held across a backend call.

use devspace_tools::{FormData, ToolError, ToolInvocation};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::conversation::{Message, Origin, Transcript};
use super::dispatch::{AppliedReply, DispatchError, SendOutcome, SendRequest, apply_reply};
use super::mode::{BlueprintCheckError, ModeDecision, Seed, WizardAction};
use super::reconcile::{WelcomeContext, normalize_history, welcome_message};
use super::session_init::{InitializedSession, SessionInitError, SessionInitializer, SessionKind};
use super::state::{ChatEvent, ChatSnapshot, SpaceContext};
use crate::api::{
    BlueprintCompleteness, BlueprintStatus, DispatchRequest, RequirementsForm, SpaceBackend,
    UsageSummary,
};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::ids::{Generation, MessageId, SessionId, SpaceId};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct ActiveSession {
    id: SessionId,
    name: String,
    kind: SessionKind,
}

#[derive(Debug)]
struct ChatState {
    generation: Generation,
    cancel: CancellationToken,
    space: Option<SpaceContext>,
    mode: ModeDecision,
    session: Option<ActiveSession>,
    session_error: Option<SessionInitError>,
    loading_session: bool,
    welcomed: bool,
    sending: bool,
    usage: Option<UsageSummary>,
    transcript: Transcript,
}

impl ChatState {
    fn new(generation: Generation, space: Option<SpaceContext>) -> Self {
        Self {
            generation,
            cancel: CancellationToken::new(),
            space,
            mode: ModeDecision::Checking,
            session: None,
            session_error: None,
            loading_session: false,
            welcomed: false,
            sending: false,
            usage: None,
            transcript: Transcript::new(),
        }
    }

    fn session_ready(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.kind == SessionKind::Established)
    }
}

#[derive(Debug, Clone, Copy)]
enum Busy {
    Sending,
    LoadingSession,
}

/// Clears a busy flag when the call that raised it is dropped before settling.
/// Calls that settle normally disarm it while holding the state lock.
struct BusyGuard {
    chat: Option<SpaceChat>,
    generation: Generation,
    busy: Busy,
}

impl BusyGuard {
    fn new(chat: &SpaceChat, generation: Generation, busy: Busy) -> Self {
        Self {
            chat: Some(chat.clone()),
            generation,
            busy,
        }
    }

    fn disarm(mut self) {
        self.chat = None;
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let Some(chat) = self.chat.take() else {
            return;
        };
        let (generation, busy) = (self.generation, self.busy);
        if let Ok(mut state) = chat.inner.state.try_lock() {
            chat.release(&mut state, generation, busy);
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let mut state = chat.inner.state.lock().await;
                chat.release(&mut state, generation, busy);
            });
        }
    }
}

struct Inner {
    backend: Arc<dyn SpaceBackend>,
    config: ClientConfig,
    sessions: SessionInitializer,
    state: Mutex<ChatState>,
    events: broadcast::Sender<ChatEvent>,
}

/// Orchestrates blueprint mode, session setup and message dispatch for the
/// currently active space. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SpaceChat {
    inner: Arc<Inner>,
}

impl SpaceChat {
    pub fn new(backend: Arc<dyn SpaceBackend>, config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let sessions = SessionInitializer::new(backend.clone(), config.request_timeout);
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                sessions,
                state: Mutex::new(ChatState::new(Generation::default(), None)),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let state = self.inner.state.lock().await;
        ChatSnapshot {
            generation: state.generation,
            space: state.space.clone(),
            mode: state.mode.clone(),
            session_id: state.session.as_ref().map(|s| s.id.clone()),
            session_name: state.session.as_ref().map(|s| s.name.clone()),
            session_ready: state.session_ready(),
            session_error: state.session_error.clone(),
            sending: state.sending,
            usage: state.usage.clone(),
            messages: state.transcript.messages().to_vec(),
        }
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    async fn lock_current(&self, generation: Generation) -> Result<MutexGuard<'_, ChatState>> {
        let state = self.inner.state.lock().await;
        if state.generation == generation {
            Ok(state)
        } else {
            debug!(
                target: "devspace::chat",
                stale = %generation,
                current = %state.generation,
                "Dropping result for superseded activation"
            );
            Err(Error::Cancelled)
        }
    }

    fn release(&self, state: &mut ChatState, generation: Generation, busy: Busy) {
        if state.generation != generation {
            return;
        }
        debug!(target: "devspace::chat", ?busy, %generation, "Releasing abandoned call");
        match busy {
            Busy::Sending => {
                if std::mem::take(&mut state.sending) {
                    self.emit(ChatEvent::SendingChanged(false));
                }
            }
            Busy::LoadingSession => state.loading_session = false,
        }
    }

    /// Makes `space` the active space, discarding everything about the previous
    /// one, and runs the blueprint check. Returns the resulting mode.
    ///
    /// Returns [`Error::Cancelled`] if another activation starts before this one settles.
    pub async fn activate(&self, space: SpaceContext) -> Result<ModeDecision> {
        let (generation, token) = {
            let mut state = self.inner.state.lock().await;
            state.cancel.cancel();
            let generation = state.generation.next();
            *state = ChatState::new(generation, Some(space.clone()));
            self.emit(ChatEvent::Activated {
                generation,
                space: space.clone(),
            });
            self.emit(ChatEvent::ModeChanged(ModeDecision::Checking));
            (generation, state.cancel.clone())
        };
        info!(
            target: "devspace::chat",
            space_id = %space.id,
            kind = %space.kind,
            %generation,
            "Activating space"
        );

        let decision = if space.id.is_blank() {
            ModeDecision::ChatActive {
                seed: Seed::Resume(BlueprintCompleteness::Unknown),
            }
        } else {
            let result = tokio::select! {
                () = token.cancelled() => return Err(Error::Cancelled),
                result = self.check_blueprint(&space.id) => result,
            };
            if let Err(err) = &result {
                warn!(
                    target: "devspace::chat",
                    space_id = %space.id,
                    error = %err,
                    "Blueprint check failed; continuing to chat"
                );
            }
            ModeDecision::after_blueprint_check(&result)
        };

        {
            let mut state = self.lock_current(generation).await?;
            state.mode = decision.clone();
            self.emit(ChatEvent::ModeChanged(decision.clone()));
        }

        if decision.is_chat_active() {
            self.load_session(generation, token).await?;
        }
        Ok(decision)
    }

    async fn check_blueprint(
        &self,
        space_id: &SpaceId,
    ) -> std::result::Result<BlueprintStatus, BlueprintCheckError> {
        let timeout = self.inner.config.request_timeout;
        match tokio::time::timeout(timeout, self.inner.backend.check_blueprint(space_id)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(BlueprintCheckError::Timeout(timeout)),
        }
    }

    /// Resolves the blueprint wizard and enters chat. Non-interactive actions
    /// start a backend analysis in the background.
    pub async fn choose_wizard(&self, action: WizardAction) -> Result<ModeDecision> {
        let (generation, token, space) = {
            let mut state = self.inner.state.lock().await;
            let next = state.mode.after_wizard(&action)?;
            let space = state
                .space
                .clone()
                .ok_or_else(|| Error::InvalidOperation("no active space".to_string()))?;
            state.mode = next.clone();
            self.emit(ChatEvent::ModeChanged(next));
            (state.generation, state.cancel.clone(), space)
        };
        info!(
            target: "devspace::chat",
            space_id = %space.id,
            action = action.name(),
            "Wizard action selected"
        );

        if action.initiates_analysis() {
            self.spawn_initiate(space.id.clone(), action);
        }

        self.load_session(generation, token).await?;
        Ok(self.inner.state.lock().await.mode.clone())
    }

    fn spawn_initiate(&self, space_id: SpaceId, action: WizardAction) {
        let backend = self.inner.backend.clone();
        let timeout = self.inner.config.request_timeout;
        tokio::spawn(async move {
            let name = action.name();
            let call = async {
                match &action {
                    WizardAction::FromRepository { repo_url } => {
                        backend
                            .initiate_blueprint_from_repo(&space_id, repo_url.trim())
                            .await
                    }
                    WizardAction::UploadForm {
                        file_name,
                        target_users,
                        file_data,
                    } => {
                        let form = RequirementsForm {
                            file_name: file_name.trim().to_string(),
                            file_data: file_data.clone(),
                            target_users: target_users.clone(),
                        };
                        backend.initiate_blueprint_from_form(&space_id, &form).await
                    }
                    WizardAction::BlueprintJson { json_content } => {
                        backend
                            .initiate_blueprint_from_json(&space_id, json_content)
                            .await
                    }
                    WizardAction::InteractiveChat => Ok(()),
                }
            };
            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(())) => {
                    info!(target: "devspace::chat", %space_id, action = name, "Blueprint analysis initiated");
                }
                Ok(Err(err)) => {
                    warn!(target: "devspace::chat", %space_id, action = name, error = %err, "Failed to initiate blueprint analysis");
                }
                Err(_) => {
                    warn!(target: "devspace::chat", %space_id, action = name, ?timeout, "Initiating blueprint analysis timed out");
                }
            }
        });
    }

    async fn load_session(&self, generation: Generation, token: CancellationToken) -> Result<()> {
        let (space_id, loading) = {
            let mut state = self.lock_current(generation).await?;
            if state.loading_session || state.session_ready() {
                return Ok(());
            }
            state.loading_session = true;
            let space_id = state
                .space
                .as_ref()
                .map(|space| space.id.clone())
                .unwrap_or_else(|| SpaceId::new(""));
            (
                space_id,
                BusyGuard::new(self, generation, Busy::LoadingSession),
            )
        };

        let result = tokio::select! {
            () = token.cancelled() => return Err(Error::Cancelled),
            result = self.inner.sessions.initialize(&space_id) => result,
        };

        let mut state = self.lock_current(generation).await?;
        state.loading_session = false;
        loading.disarm();
        match result {
            Ok(session) => self.apply_session(&mut state, session),
            Err(err) => {
                warn!(target: "devspace::chat", %space_id, error = %err, "Chat session unavailable");
                state.session_error = Some(err.clone());
                let notice = Message::assistant(
                    Message::generate_id("error-init"),
                    format!("Error loading chat: {}", err.cause),
                    Origin::Synthetic,
                );
                let appended = state.transcript.append([notice]).to_vec();
                self.emit(ChatEvent::SessionFailed(err));
                self.emit(ChatEvent::MessagesAppended(appended));
            }
        }
        Ok(())
    }

    fn apply_session(&self, state: &mut ChatState, session: InitializedSession) {
        let history = normalize_history(&session.session_id, &session.history);
        let history_len = history.len();
        let mut appended = state.transcript.reconcile(history).to_vec();

        state.session_error = None;
        state.session = Some(ActiveSession {
            id: session.session_id.clone(),
            name: session.session_name.clone(),
            kind: session.kind,
        });
        if let Some(usage) = session.usage {
            state.usage = Some(usage.clone());
            self.emit(ChatEvent::UsageUpdated(usage));
        }

        if session.kind == SessionKind::Established {
            if !state.welcomed {
                let seed = state
                    .mode
                    .seed()
                    .cloned()
                    .unwrap_or(Seed::Resume(BlueprintCompleteness::Unknown));
                let kind = state.space.as_ref().map(|space| space.kind).unwrap_or_default();
                let welcome = welcome_message(WelcomeContext {
                    session_id: &session.session_id,
                    session_name: &session.session_name,
                    space_kind: kind,
                    history_len,
                    seed: &seed,
                });
                appended.extend(state.transcript.append([welcome]).iter().cloned());
                state.welcomed = true;
            }
            self.emit(ChatEvent::SessionReady {
                session_id: session.session_id,
                session_name: session.session_name,
            });
        }

        if !appended.is_empty() {
            self.emit(ChatEvent::MessagesAppended(appended));
        }
    }

    /// Re-runs session initialization after a failure. Returns whether a
    /// session is now ready. A placeholder session is left as is.
    pub async fn retry_session(&self) -> Result<bool> {
        let (generation, token) = {
            let state = self.inner.state.lock().await;
            if !state.mode.is_chat_active() {
                return Err(Error::InvalidOperation(
                    "chat is not active for this space".to_string(),
                ));
            }
            match &state.session {
                Some(session) if session.kind == SessionKind::Established => return Ok(true),
                // A placeholder never becomes a real session.
                Some(_) => return Ok(false),
                None => {}
            }
            (state.generation, state.cancel.clone())
        };
        self.load_session(generation, token).await?;
        Ok(self.inner.state.lock().await.session_ready())
    }

    /// Sends a user message or tool invocation.
    ///
    /// Blank text is a no-op. The optimistic user entry is appended before the
    /// backend is contacted; backend failures become a single assistant entry.
    pub async fn send(&self, request: SendRequest) -> Result<SendOutcome> {
        if request.is_blank() {
            return Ok(SendOutcome::Skipped);
        }

        let (generation, token, dispatch, sending) = {
            let mut state = self.inner.state.lock().await;
            let (space, session) = match (&state.space, &state.session) {
                (Some(space), Some(session)) if session.kind == SessionKind::Established => {
                    (space.clone(), session.id.clone())
                }
                _ => return Err(Error::NoActiveSession),
            };
            if state.sending {
                return Err(Error::DispatchInFlight);
            }

            let appended = state
                .transcript
                .append([request.optimistic_message()])
                .to_vec();
            state.sending = true;
            self.emit(ChatEvent::MessagesAppended(appended));
            self.emit(ChatEvent::SendingChanged(true));

            let dispatch = DispatchRequest {
                message: request.wire_text(),
                space_id: space.id,
                space_type: space.kind,
                session_id: session,
            };
            (
                state.generation,
                state.cancel.clone(),
                dispatch,
                BusyGuard::new(self, state.generation, Busy::Sending),
            )
        };
        debug!(
            target: "devspace::chat",
            session_id = %dispatch.session_id,
            %generation,
            "Dispatching message"
        );

        let timeout = self.inner.config.dispatch_timeout;
        let result = tokio::select! {
            () = token.cancelled() => return Ok(SendOutcome::Discarded),
            result = tokio::time::timeout(timeout, self.inner.backend.dispatch(&dispatch)) => {
                match result {
                    Ok(Ok(reply)) => Ok(reply),
                    Ok(Err(err)) => Err(DispatchError::from(err)),
                    Err(_) => Err(DispatchError::Timeout(timeout)),
                }
            }
        };

        let Ok(mut state) = self.lock_current(generation).await else {
            return Ok(SendOutcome::Discarded);
        };
        state.sending = false;
        sending.disarm();

        let applied = match result {
            Ok(reply) => apply_reply(reply),
            Err(err) => {
                warn!(target: "devspace::chat", error = %err, "Dispatch failed");
                AppliedReply {
                    messages: vec![err.to_message()],
                    usage: None,
                }
            }
        };

        if let Some(usage) = applied.usage {
            state.usage = Some(usage.clone());
            self.emit(ChatEvent::UsageUpdated(usage));
        }
        let appended = state.transcript.append(applied.messages).to_vec();
        let count = appended.len();
        if !appended.is_empty() {
            self.emit(ChatEvent::MessagesAppended(appended));
        }
        self.emit(ChatEvent::SendingChanged(false));
        Ok(SendOutcome::Completed { appended: count })
    }

    /// Builds an invocation of a catalog tool for the active space kind and sends it.
    pub async fn invoke_tool(
        &self,
        tool_id: &str,
        form: FormData,
        confirmed: bool,
    ) -> Result<SendOutcome> {
        let kind = {
            let state = self.inner.state.lock().await;
            state
                .space
                .as_ref()
                .map(|space| space.kind)
                .ok_or(Error::NoActiveSession)?
        };
        let spec = kind
            .find_tool(tool_id)
            .ok_or_else(|| ToolError::UnknownTool(tool_id.to_string()))?;
        let invocation = ToolInvocation::from_form(spec, form, confirmed)?;
        self.send(SendRequest::Tool(invocation)).await
    }

    /// Re-fetches the active session's history and merges it into the
    /// transcript. Returns how many entries were appended.
    pub async fn refresh_history(&self) -> Result<usize> {
        let (generation, token, space_id, session_id) = {
            let state = self.inner.state.lock().await;
            let (Some(space), Some(session)) = (&state.space, &state.session) else {
                return Err(Error::NoActiveSession);
            };
            if session.kind != SessionKind::Established {
                return Err(Error::NoActiveSession);
            }
            (
                state.generation,
                state.cancel.clone(),
                space.id.clone(),
                session.id.clone(),
            )
        };

        let fetched = tokio::select! {
            () = token.cancelled() => return Err(Error::Cancelled),
            result = self.inner.sessions.initialize(&space_id) => result?,
        };

        let mut state = self.lock_current(generation).await?;
        if fetched.session_id != session_id {
            warn!(
                target: "devspace::chat",
                current = %session_id,
                fetched = %fetched.session_id,
                "Backend reported a different active session"
            );
            return Err(Error::InvalidOperation(format!(
                "active session changed from {session_id} to {}",
                fetched.session_id
            )));
        }

        let history = normalize_history(&fetched.session_id, &fetched.history);
        let appended = state.transcript.reconcile(history).to_vec();
        if let Some(usage) = fetched.usage {
            state.usage = Some(usage.clone());
            self.emit(ChatEvent::UsageUpdated(usage));
        }
        let count = appended.len();
        if count > 0 {
            self.emit(ChatEvent::MessagesAppended(appended));
        }
        debug!(target: "devspace::chat", appended = count, "History refreshed");
        Ok(count)
    }

    /// Looks up a transcript entry by id.
    pub async fn message(&self, id: &MessageId) -> Option<Message> {
        self.inner.state.lock().await.transcript.get(id).cloned()
    }
}
