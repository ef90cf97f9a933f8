//! Normalization of server history and synthesis of the welcome message.

use devspace_tools::SpaceKind;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;

use super::conversation::{Message, Origin};
use super::mode::Seed;
use super::tool_model::{self, RecordKind};
use crate::api::{BlueprintCompleteness, HistoryRecord};
use crate::ids::{MessageId, SessionId};

/// Converts one stored record into a transcript message.
///
/// `position` is the record's index in the fetched history; it stands in for a
/// timestamp when building a local id for records without a durable id.
pub fn normalize(session_id: &SessionId, position: usize, record: &HistoryRecord) -> Message {
    let durable_id = record.durable_id().map(str::to_string);
    let id = match &durable_id {
        Some(durable) => MessageId::new(durable.clone()),
        None => history_id(session_id, position, record),
    };
    let origin = Origin::History { durable_id };

    if let Some(kind) = RecordKind::from_role(&record.role) {
        return Message::tool_info(id, tool_model::from_history(kind, record), origin);
    }

    match record.role.as_str() {
        "user" => Message::user(id, record.text(), origin),
        // assistant, system and anything unrecognized read as assistant text
        _ => Message::assistant(id, record.text(), origin),
    }
}

pub fn normalize_history(session_id: &SessionId, records: &[HistoryRecord]) -> Vec<Message> {
    records
        .iter()
        .enumerate()
        .map(|(position, record)| normalize(session_id, position, record))
        .collect()
}

fn history_id(session_id: &SessionId, position: usize, record: &HistoryRecord) -> MessageId {
    let stamp = match &record.timestamp {
        Some(Value::String(ts)) if !ts.is_empty() => ts.clone(),
        Some(Value::Number(ts)) => ts.to_string(),
        _ => record
            .index
            .map_or_else(|| position.to_string(), |index| index.to_string()),
    };
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    MessageId::new(format!("hist-{session_id}-{stamp}-{suffix}"))
}

/// Everything the welcome rule looks at.
#[derive(Debug, Clone, Copy)]
pub struct WelcomeContext<'a> {
    pub session_id: &'a SessionId,
    pub session_name: &'a str,
    pub space_kind: SpaceKind,
    pub history_len: usize,
    pub seed: &'a Seed,
}

/// The single synthetic assistant message emitted after history loads.
pub fn welcome_message(ctx: WelcomeContext<'_>) -> Message {
    let text = welcome_text(&ctx);
    Message::assistant(
        MessageId::new(format!("welcome-{}", ctx.session_id)),
        text,
        Origin::Synthetic,
    )
}

fn welcome_text(ctx: &WelcomeContext<'_>) -> String {
    let completeness = match ctx.seed {
        Seed::Text(text) => return text.clone(),
        Seed::Resume(completeness) => *completeness,
    };

    if ctx.history_len > 0 {
        format!(
            "Welcome back! Loaded the last {} messages of this conversation. {} How can I help you?",
            ctx.history_len,
            completeness_hint(completeness)
        )
    } else {
        let next_step = match completeness {
            BlueprintCompleteness::Incomplete => "Let's start building your application blueprint!",
            _ => "How can I help you?",
        };
        format!(
            "Welcome to this {} space: '{}'. This looks like a new conversation. {next_step}",
            ctx.space_kind, ctx.session_name
        )
    }
}

fn completeness_hint(completeness: BlueprintCompleteness) -> &'static str {
    match completeness {
        BlueprintCompleteness::Complete => "The application blueprint has been generated.",
        BlueprintCompleteness::Incomplete => {
            "The application blueprint is still being built or is incomplete."
        }
        BlueprintCompleteness::Unknown => "The application blueprint status is unknown.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RecordMetadata;
    use crate::app::conversation::Role;
    use serde_json::json;

    fn session() -> SessionId {
        SessionId::new("s-1")
    }

    #[test]
    fn roles_map_onto_three_kinds() {
        let records = vec![
            HistoryRecord::new("user", "hi").with_id("m1"),
            HistoryRecord::new("assistant", "hello"),
            HistoryRecord::new("system", "context"),
            HistoryRecord::new("narrator", "???"),
            HistoryRecord::new("tool_call", "").with_metadata(RecordMetadata {
                tool_name: Some("gitPush".to_string()),
                ..RecordMetadata::default()
            }),
        ];
        let roles: Vec<_> = normalize_history(&session(), &records)
            .iter()
            .map(Message::role)
            .collect();
        assert_eq!(
            roles,
            vec![
                Role::User,
                Role::Assistant,
                Role::Assistant,
                Role::Assistant,
                Role::ToolInfo
            ]
        );
    }

    #[test]
    fn durable_ids_are_kept_and_others_generated() {
        let mut stamped = HistoryRecord::new("assistant", "b");
        stamped.timestamp = Some(json!("2024-05-01T10:00:00Z"));
        let records = vec![
            HistoryRecord::new("user", "a").with_id("db-7"),
            stamped,
            HistoryRecord::new("assistant", "c"),
        ];
        let messages = normalize_history(&session(), &records);

        assert_eq!(messages[0].id().as_str(), "db-7");
        assert_eq!(messages[0].durable_id(), Some("db-7"));
        assert!(
            messages[1]
                .id()
                .as_str()
                .starts_with("hist-s-1-2024-05-01T10:00:00Z-")
        );
        assert!(messages[2].id().as_str().starts_with("hist-s-1-2-"));
        assert_eq!(messages[2].id().as_str().len(), "hist-s-1-2-".len() + 5);
    }

    #[test]
    fn resumption_mentions_count_and_completeness() {
        let seed = Seed::Resume(BlueprintCompleteness::Incomplete);
        let message = welcome_message(WelcomeContext {
            session_id: &session(),
            session_name: "Main",
            space_kind: SpaceKind::Dev,
            history_len: 3,
            seed: &seed,
        });
        let text = message.as_text().unwrap();
        assert!(text.contains("last 3 messages"));
        assert!(text.contains("incomplete"));
        assert!(message.is_synthetic());
    }

    #[test]
    fn greeting_names_the_space_kind() {
        let seed = Seed::Resume(BlueprintCompleteness::Complete);
        let message = welcome_message(WelcomeContext {
            session_id: &session(),
            session_name: "Payments",
            space_kind: SpaceKind::Ops,
            history_len: 0,
            seed: &seed,
        });
        assert_eq!(
            message.as_text(),
            Some(
                "Welcome to this ops space: 'Payments'. This looks like a new conversation. How can I help you?"
            )
        );
    }

    #[test]
    fn explicit_seed_replaces_rule() {
        let seed = Seed::Text("Let's chat about your app.".to_string());
        let message = welcome_message(WelcomeContext {
            session_id: &session(),
            session_name: "Main",
            space_kind: SpaceKind::Dev,
            history_len: 12,
            seed: &seed,
        });
        assert_eq!(message.as_text(), Some("Let's chat about your app."));
    }
}
