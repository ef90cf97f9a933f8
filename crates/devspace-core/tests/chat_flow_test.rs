use devspace_core::api::{
    ApiError, BlueprintCompleteness, BlueprintStatus, DispatchReply, HistoryRecord, RecordMetadata,
    UsageSummary, WireToolExecution,
};
use devspace_core::app::{
    ChatEvent, ModeDecision, Role, Seed, SendOutcome, SendRequest, SpaceChat, SpaceContext,
    WizardAction,
};
use devspace_core::test_utils::{InitiateCall, ScriptedBackend};
use devspace_core::{ClientConfig, Error, SpaceId};
use devspace_tools::{FormData, SpaceKind, ToolStatus};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn chat(backend: &Arc<ScriptedBackend>) -> SpaceChat {
    SpaceChat::new(backend.clone(), ClientConfig::default())
}

fn dev_space(id: &str) -> SpaceContext {
    SpaceContext::new(id, SpaceKind::Dev)
}

fn present(completeness: BlueprintCompleteness) -> Result<BlueprintStatus, ApiError> {
    Ok(BlueprintStatus::Present(completeness))
}

async fn ready_chat(backend: &Arc<ScriptedBackend>) -> SpaceChat {
    backend.push_blueprint(present(BlueprintCompleteness::Complete));
    backend.push_session(Ok(ScriptedBackend::session("s-1", Vec::new())));
    let chat = chat(backend);
    chat.activate(dev_space("sp-1")).await.unwrap();
    assert!(chat.snapshot().await.session_ready);
    chat
}

fn tool(name: &str) -> WireToolExecution {
    WireToolExecution {
        tool_name: Some(name.to_string()),
        ..WireToolExecution::default()
    }
}

#[tokio::test]
async fn empty_history_with_blueprint_greets_once() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_blueprint(present(BlueprintCompleteness::Complete));
    backend.push_session(Ok(ScriptedBackend::session("s-1", Vec::new())));
    let chat = chat(&backend);

    let mode = chat.activate(dev_space("sp-1")).await.unwrap();
    assert_eq!(
        mode,
        ModeDecision::ChatActive {
            seed: Seed::Resume(BlueprintCompleteness::Complete)
        }
    );

    let snapshot = chat.snapshot().await;
    assert!(snapshot.session_ready);
    assert_eq!(snapshot.messages.len(), 1);
    let greeting = snapshot.messages[0].as_text().unwrap();
    assert!(greeting.starts_with("Welcome to this dev space: 'Chat s-1'."));
    assert_eq!(snapshot.messages[0].role(), Role::Assistant);
}

#[tokio::test]
async fn history_with_incomplete_blueprint_gets_resumption_summary() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_blueprint(present(BlueprintCompleteness::Incomplete));
    backend.push_session(Ok(ScriptedBackend::session(
        "s-1",
        vec![
            HistoryRecord::new("user", "build me an app").with_id("m1"),
            HistoryRecord::new("assistant", "sure").with_id("m2"),
            HistoryRecord::new("tool_result", "pushed").with_metadata(RecordMetadata {
                tool_name: Some("gitPush".to_string()),
                tool_args: Some(json!({"branch": "main"})),
                ..RecordMetadata::default()
            }),
        ],
    )));
    let chat = chat(&backend);
    chat.activate(dev_space("sp-1")).await.unwrap();

    let snapshot = chat.snapshot().await;
    assert_eq!(snapshot.messages.len(), 4);
    let tool_entry = snapshot.messages[2].tool_execution().unwrap();
    assert_eq!(tool_entry.tool_name, "gitPush");
    assert_eq!(tool_entry.status, ToolStatus::Success);
    let last = snapshot.messages[3].as_text().unwrap();
    assert!(last.contains("incomplete"));
    assert!(last.contains('3'));
}

#[tokio::test]
async fn absent_blueprint_waits_in_wizard() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_blueprint(Ok(BlueprintStatus::Absent));
    let chat = chat(&backend);

    let mode = chat.activate(dev_space("sp-new")).await.unwrap();
    assert_eq!(mode, ModeDecision::WizardSelection);
    assert_eq!(backend.fetch_count(), 0);

    let snapshot = chat.snapshot().await;
    assert!(!snapshot.session_ready);
    assert!(snapshot.messages.is_empty());
    assert!(matches!(
        chat.send(SendRequest::text("hello")).await,
        Err(Error::NoActiveSession)
    ));
}

#[tokio::test]
async fn invalid_wizard_input_keeps_selection() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_blueprint(Ok(BlueprintStatus::Absent));
    let chat = chat(&backend);
    chat.activate(dev_space("sp-new")).await.unwrap();

    let err = chat
        .choose_wizard(WizardAction::FromRepository {
            repo_url: "definitely not a url".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidWizardInput(_)));
    assert_eq!(chat.snapshot().await.mode, ModeDecision::WizardSelection);
    assert!(backend.initiated().is_empty());
}

#[tokio::test]
async fn repository_wizard_seeds_chat_and_initiates_analysis() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_blueprint(Ok(BlueprintStatus::Absent));
    backend.push_session(Ok(ScriptedBackend::session("s-9", Vec::new())));
    let chat = chat(&backend);
    chat.activate(dev_space("sp-new")).await.unwrap();

    let repo = "https://github.com/acme/shop.git";
    let mode = chat
        .choose_wizard(WizardAction::FromRepository {
            repo_url: repo.to_string(),
        })
        .await
        .unwrap();
    assert!(mode.is_chat_active());

    let snapshot = chat.snapshot().await;
    assert!(snapshot.session_ready);
    assert_eq!(snapshot.messages.len(), 1);
    assert!(snapshot.messages[0].as_text().unwrap().contains(repo));

    for _ in 0..50 {
        if !backend.initiated().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        backend.initiated(),
        vec![InitiateCall::Repo {
            space_id: SpaceId::new("sp-new"),
            repo_url: repo.to_string(),
        }]
    );

    // The wizard is resolved; a second action is rejected.
    assert!(matches!(
        chat.choose_wizard(WizardAction::InteractiveChat).await,
        Err(Error::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn blueprint_check_failure_degrades_to_chat() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_blueprint(Err(ApiError::status(500, None)));
    backend.push_session(Ok(ScriptedBackend::session(
        "s-1",
        vec![HistoryRecord::new("user", "hi").with_id("m1")],
    )));
    let chat = chat(&backend);

    let mode = chat.activate(dev_space("sp-1")).await.unwrap();
    assert!(mode.is_chat_active());
    let snapshot = chat.snapshot().await;
    assert!(snapshot.session_ready);
    assert_eq!(
        snapshot.messages.last().unwrap().as_text(),
        Some("Unable to check the application blueprint status, please try again later.")
    );
}

#[tokio::test]
async fn session_failure_blocks_sending_until_retry() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_blueprint(present(BlueprintCompleteness::Complete));
    backend.push_session(Err(ApiError::status(500, Some("db offline".to_string()))));
    let chat = chat(&backend);
    chat.activate(dev_space("sp-1")).await.unwrap();

    let snapshot = chat.snapshot().await;
    assert!(!snapshot.session_ready);
    assert_eq!(
        snapshot.session_error.as_ref().map(|e| e.cause.as_str()),
        Some("Backend error: 500 - db offline")
    );
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(
        snapshot.messages[0].as_text(),
        Some("Error loading chat: Backend error: 500 - db offline")
    );
    assert!(matches!(
        chat.send(SendRequest::text("hello")).await,
        Err(Error::NoActiveSession)
    ));
    assert_eq!(chat.snapshot().await.messages.len(), 1);

    backend.push_session(Ok(ScriptedBackend::session("s-1", Vec::new())));
    assert!(chat.retry_session().await.unwrap());
    let snapshot = chat.snapshot().await;
    assert!(snapshot.session_error.is_none());
    assert_eq!(snapshot.messages.len(), 2);
    assert!(snapshot.messages[1].as_text().unwrap().starts_with("Welcome"));

    // Retrying a ready session neither refetches nor greets again.
    assert!(chat.retry_session().await.unwrap());
    assert_eq!(chat.snapshot().await.messages.len(), 2);
    assert_eq!(backend.fetch_count(), 2);
}

#[tokio::test]
async fn blank_space_gets_placeholder_session() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = chat(&backend);

    chat.activate(dev_space("")).await.unwrap();
    let snapshot = chat.snapshot().await;
    assert_eq!(backend.blueprint_checks(), 0);
    assert_eq!(backend.fetch_count(), 0);
    assert!(!snapshot.session_ready);
    assert!(
        snapshot
            .session_id
            .unwrap()
            .as_str()
            .starts_with("temp-session-")
    );
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(
        snapshot.messages[0].as_text(),
        Some("Error: Space context is missing. Cannot load or start chat.")
    );
    assert_eq!(snapshot.usage.unwrap().message, "No active session.");
}

#[tokio::test]
async fn retrying_a_placeholder_session_adds_nothing() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = chat(&backend);
    chat.activate(dev_space("")).await.unwrap();
    let before = chat.snapshot().await;

    for _ in 0..2 {
        assert!(!chat.retry_session().await.unwrap());
    }
    let after = chat.snapshot().await;
    assert_eq!(after.messages.len(), 1);
    assert_eq!(after.session_id, before.session_id);
    assert_eq!(backend.fetch_count(), 0);
}

#[tokio::test]
async fn blank_send_is_a_no_op() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ready_chat(&backend).await;
    let before = chat.snapshot().await.messages.len();

    for text in ["", "   ", "\n\t"] {
        assert_eq!(
            chat.send(SendRequest::text(text)).await.unwrap(),
            SendOutcome::Skipped
        );
    }
    assert_eq!(chat.snapshot().await.messages.len(), before);
    assert!(backend.dispatched().is_empty());
}

#[tokio::test]
async fn text_reply_adds_user_and_assistant() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ready_chat(&backend).await;
    let before = chat.snapshot().await.messages.len();
    backend.push_reply(Ok(DispatchReply::text("ok")));

    let outcome = chat.send(SendRequest::text("  deploy please ")).await.unwrap();
    assert_eq!(outcome, SendOutcome::Completed { appended: 1 });

    let snapshot = chat.snapshot().await;
    assert_eq!(snapshot.messages.len(), before + 2);
    assert_eq!(snapshot.messages[before].as_text(), Some("deploy please"));
    assert_eq!(snapshot.messages[before].role(), Role::User);
    assert_eq!(snapshot.messages[before + 1].as_text(), Some("ok"));
    assert!(!snapshot.sending);

    let sent = backend.dispatched();
    assert_eq!(sent[0].message, "deploy please");
    assert_eq!(sent[0].session_id.as_str(), "s-1");
    assert_eq!(sent[0].space_type, SpaceKind::Dev);
}

#[tokio::test]
async fn tool_only_reply_adds_one_entry_per_execution() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ready_chat(&backend).await;
    let before = chat.snapshot().await.messages.len();
    backend.push_reply(Ok(DispatchReply {
        tool_executions: vec![tool("A"), tool("B")],
        ..DispatchReply::default()
    }));

    chat.send(SendRequest::text("run both")).await.unwrap();
    let snapshot = chat.snapshot().await;
    let added: Vec<_> = snapshot.messages[before..]
        .iter()
        .map(|m| (m.role(), m.tool_execution().map(|e| e.tool_name.clone())))
        .collect();
    assert_eq!(
        added,
        vec![
            (Role::User, None),
            (Role::ToolInfo, Some("A".to_string())),
            (Role::ToolInfo, Some("B".to_string())),
        ]
    );
}

#[tokio::test]
async fn dispatch_failure_appends_one_error() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ready_chat(&backend).await;
    let before = chat.snapshot().await.messages.len();
    backend.push_reply(Err(ApiError::status(502, None)));

    chat.send(SendRequest::text("hello")).await.unwrap();
    let snapshot = chat.snapshot().await;
    assert_eq!(snapshot.messages.len(), before + 2);
    assert_eq!(
        snapshot.messages.last().unwrap().as_text(),
        Some("Error: Backend error: 502")
    );
    assert!(!snapshot.sending);
    assert!(snapshot.session_ready);
}

#[tokio::test]
async fn usage_is_replaced_by_latest_reply() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ready_chat(&backend).await;
    for tokens in ["100 tokens", "250 tokens"] {
        backend.push_reply(Ok(DispatchReply {
            llm_message: Some("ok".to_string()),
            token_info: Some(UsageSummary::from_message(tokens)),
            ..DispatchReply::default()
        }));
        chat.send(SendRequest::text("again")).await.unwrap();
    }
    assert_eq!(chat.snapshot().await.usage.unwrap().message, "250 tokens");
}

#[tokio::test]
async fn second_send_while_in_flight_is_rejected() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ready_chat(&backend).await;
    let gate = backend.gate_dispatch();
    backend.push_reply(Ok(DispatchReply::text("first reply")));

    let first = tokio::spawn({
        let chat = chat.clone();
        async move { chat.send(SendRequest::text("first")).await }
    });
    while !chat.snapshot().await.sending {
        tokio::task::yield_now().await;
    }
    let len_in_flight = chat.snapshot().await.messages.len();

    assert!(matches!(
        chat.send(SendRequest::text("second")).await,
        Err(Error::DispatchInFlight)
    ));
    assert_eq!(chat.snapshot().await.messages.len(), len_in_flight);

    gate.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome, SendOutcome::Completed { appended: 1 });
    assert_eq!(backend.dispatched().len(), 1);
}

#[tokio::test]
async fn switching_space_discards_in_flight_reply() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ready_chat(&backend).await;
    let gate = backend.gate_dispatch();
    backend.push_reply(Ok(DispatchReply::text("stale reply")));

    let pending = tokio::spawn({
        let chat = chat.clone();
        async move { chat.send(SendRequest::text("slow question")).await }
    });
    while !chat.snapshot().await.sending {
        tokio::task::yield_now().await;
    }

    backend.push_blueprint(present(BlueprintCompleteness::Complete));
    backend.push_session(Ok(ScriptedBackend::session("s-2", Vec::new())));
    chat.activate(SpaceContext::new("sp-2", SpaceKind::Ops))
        .await
        .unwrap();
    gate.notify_one();

    assert_eq!(pending.await.unwrap().unwrap(), SendOutcome::Discarded);
    let snapshot = chat.snapshot().await;
    assert_eq!(snapshot.space.unwrap().id.as_str(), "sp-2");
    assert!(!snapshot.sending);
    assert_eq!(snapshot.messages.len(), 1);
    assert!(
        snapshot
            .messages
            .iter()
            .all(|m| m.as_text() != Some("stale reply"))
    );
}

#[tokio::test(start_paused = true)]
async fn dispatch_timeout_becomes_error_entry() {
    let backend = Arc::new(ScriptedBackend::new().with_latency(Duration::from_secs(1)));
    backend.push_blueprint(present(BlueprintCompleteness::Complete));
    backend.push_session(Ok(ScriptedBackend::session("s-1", Vec::new())));
    let _gate = backend.gate_dispatch();
    let chat = SpaceChat::new(
        backend.clone(),
        ClientConfig::default().with_dispatch_timeout(Duration::from_secs(3)),
    );
    chat.activate(dev_space("sp-1")).await.unwrap();

    chat.send(SendRequest::text("anyone there?")).await.unwrap();
    let snapshot = chat.snapshot().await;
    assert_eq!(
        snapshot.messages.last().unwrap().as_text(),
        Some("Error: Request timed out after 3s")
    );
    assert!(!snapshot.sending);
}

#[tokio::test(start_paused = true)]
async fn abandoned_send_frees_the_dispatch_slot() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ready_chat(&backend).await;
    let gate = backend.gate_dispatch();
    backend.push_reply(Ok(DispatchReply::text("answer")));

    let abandoned = tokio::time::timeout(
        Duration::from_secs(1),
        chat.send(SendRequest::text("first")),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(!chat.snapshot().await.sending);

    gate.notify_one();
    let outcome = chat.send(SendRequest::text("second")).await.unwrap();
    assert_eq!(outcome, SendOutcome::Completed { appended: 1 });
    assert_eq!(backend.dispatched().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn abandoned_session_load_can_be_retried() {
    let backend = Arc::new(ScriptedBackend::new().with_latency(Duration::from_secs(5)));
    backend.push_blueprint(present(BlueprintCompleteness::Complete));
    backend.push_session(Ok(ScriptedBackend::session("s-1", Vec::new())));
    let chat = chat(&backend);

    let abandoned =
        tokio::time::timeout(Duration::from_secs(8), chat.activate(dev_space("sp-1"))).await;
    assert!(abandoned.is_err());
    assert!(!chat.snapshot().await.session_ready);

    assert!(chat.retry_session().await.unwrap());
    assert_eq!(
        chat.snapshot().await.session_id.unwrap().as_str(),
        "s-1"
    );
    assert_eq!(backend.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn reactivating_a_space_reads_a_fresh_session() {
    let backend = Arc::new(ScriptedBackend::new().with_latency(Duration::from_secs(5)));
    backend.push_session(Ok(ScriptedBackend::session("b-1", Vec::new())));
    backend.push_session(Ok(ScriptedBackend::session("a-2", Vec::new())));
    let chat = chat(&backend);

    let first = tokio::spawn({
        let chat = chat.clone();
        async move { chat.activate(dev_space("sp-a")).await }
    });
    tokio::time::sleep(Duration::from_secs(7)).await;
    assert_eq!(backend.fetch_count(), 1);

    chat.activate(dev_space("sp-b")).await.unwrap();
    assert!(matches!(first.await.unwrap(), Err(Error::Cancelled)));
    assert_eq!(
        chat.snapshot().await.session_id.unwrap().as_str(),
        "b-1"
    );
    tokio::time::sleep(Duration::from_secs(600)).await;

    chat.activate(dev_space("sp-a")).await.unwrap();
    assert_eq!(
        chat.snapshot().await.session_id.unwrap().as_str(),
        "a-2"
    );
    assert_eq!(backend.fetch_count(), 3);
}

#[tokio::test]
async fn tool_invocation_shows_label_and_sends_prompt() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ready_chat(&backend).await;
    backend.push_reply(Ok(DispatchReply {
        llm_message: Some("Pushed.".to_string()),
        tool_executions: vec![WireToolExecution {
            tool_name: Some("gitPush".to_string()),
            tool_arguments: Some(json!({"branch": "main"})),
            tool_output: Some(json!("Everything up-to-date")),
            status: Some("success".to_string()),
        }],
        ..DispatchReply::default()
    }));

    let mut form = FormData::new();
    form.insert("commitMessage".to_string(), json!("release"));
    chat.invoke_tool("gitPush", form, false).await.unwrap();

    let snapshot = chat.snapshot().await;
    let user = &snapshot.messages[1];
    assert_eq!(user.as_text(), Some("Using Tool: Git Push"));
    let sent = &backend.dispatched()[0].message;
    assert!(sent.starts_with("User initiated tool: 'Git Push' (ID: gitPush) with parameters: "));
    assert!(sent.contains("\"commitMessage\":\"release\""));
    assert_eq!(snapshot.messages.len(), 4);

    assert!(matches!(
        chat.invoke_tool("getPodLogs", FormData::new(), false).await,
        Err(Error::Tool(_))
    ));
    assert!(matches!(
        chat.invoke_tool("runTests", FormData::new(), false).await,
        Err(Error::Tool(_))
    ));
}

#[tokio::test]
async fn refresh_merges_server_history_without_duplicates() {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ready_chat(&backend).await;
    backend.push_reply(Ok(DispatchReply::text("hi there")));
    chat.send(SendRequest::text("hello")).await.unwrap();
    let before = chat.snapshot().await.messages.len();

    backend.push_session(Ok(ScriptedBackend::session(
        "s-1",
        vec![
            HistoryRecord::new("user", "hello").with_id("m1"),
            HistoryRecord::new("assistant", "hi there").with_id("m2"),
            HistoryRecord::new("assistant", "also, the build finished").with_id("m3"),
        ],
    )));
    assert_eq!(chat.refresh_history().await.unwrap(), 1);
    let snapshot = chat.snapshot().await;
    assert_eq!(snapshot.messages.len(), before + 1);
    assert_eq!(
        snapshot.messages.last().unwrap().as_text(),
        Some("also, the build finished")
    );
}

#[tokio::test]
async fn events_follow_the_activation() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_blueprint(present(BlueprintCompleteness::Complete));
    backend.push_session(Ok(ScriptedBackend::session("s-1", Vec::new())));
    let chat = chat(&backend);
    let mut events = chat.subscribe();

    chat.activate(dev_space("sp-1")).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen.first(), Some(ChatEvent::Activated { .. })));
    assert!(seen.iter().any(|e| matches!(
        e,
        ChatEvent::SessionReady { session_id, .. } if session_id.as_str() == "s-1"
    )));
    assert!(
        seen.iter()
            .any(|e| matches!(e, ChatEvent::MessagesAppended(messages) if messages.len() == 1))
    );
}
