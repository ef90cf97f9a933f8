#[cfg(test)]
mod tests {
    use crate::api::{BlueprintCompleteness, BlueprintStatus, HistoryRecord};
    use crate::app::conversation::{Message, Origin, Transcript};
    use crate::app::dispatch::{SendOutcome, SendRequest};
    use crate::app::reconcile::normalize_history;
    use crate::app::{SpaceChat, SpaceContext};
    use crate::config::ClientConfig;
    use crate::ids::{MessageId, SessionId};
    use crate::test_utils::ScriptedBackend;
    use devspace_tools::SpaceKind;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn arb_id() -> impl Strategy<Value = String> {
        prop_oneof![Just("dup".to_string()), "[a-z]{1,6}"]
    }

    fn arb_message() -> impl Strategy<Value = Message> {
        (arb_id(), any::<bool>(), "[a-zA-Z ]{0,12}").prop_map(|(id, user, text)| {
            let id = MessageId::new(id);
            if user {
                Message::user(id, text, Origin::DispatchResult)
            } else {
                Message::assistant(id, text, Origin::DispatchResult)
            }
        })
    }

    fn arb_record() -> impl Strategy<Value = HistoryRecord> {
        (
            prop_oneof![
                Just("user"),
                Just("assistant"),
                Just("tool_call"),
                Just("tool_result")
            ],
            "[a-z ]{0,10}",
            proptest::option::of("[a-z0-9]{4}"),
        )
            .prop_map(|(role, content, id)| {
                let record = HistoryRecord::new(role, content);
                match id {
                    Some(id) => record.with_id(format!("db-{id}")),
                    None => record,
                }
            })
    }

    proptest! {
        #[test]
        fn append_keeps_prefix_and_unique_ids(
            batches in prop::collection::vec(prop::collection::vec(arb_message(), 0..5), 0..6)
        ) {
            let mut transcript = Transcript::new();
            let mut expected = 0;
            for batch in batches {
                let before: Vec<MessageId> =
                    transcript.iter().map(|m| m.id().clone()).collect();
                let size = batch.len();
                let appended = transcript.append(batch).len();
                prop_assert_eq!(appended, size);
                expected += size;

                let after: Vec<MessageId> = transcript
                    .iter()
                    .take(before.len())
                    .map(|m| m.id().clone())
                    .collect();
                prop_assert_eq!(before, after);
            }
            prop_assert_eq!(transcript.len(), expected);

            let ids: HashSet<&MessageId> = transcript.iter().map(Message::id).collect();
            prop_assert_eq!(ids.len(), transcript.len());
        }

        #[test]
        fn reconciling_same_history_twice_adds_nothing(
            records in prop::collection::vec(arb_record(), 0..10)
        ) {
            let session = SessionId::new("s-prop");
            let mut transcript = Transcript::new();

            let first = transcript
                .reconcile(normalize_history(&session, &records))
                .len();
            prop_assert!(first <= records.len());
            let len = transcript.len();

            let second = transcript
                .reconcile(normalize_history(&session, &records))
                .len();
            prop_assert_eq!(second, 0);
            prop_assert_eq!(transcript.len(), len);
        }

        #[test]
        fn blank_sends_never_touch_the_transcript(
            blanks in prop::collection::vec("[ \t\n]{0,4}", 1..6)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let backend = Arc::new(ScriptedBackend::new());
                backend.push_blueprint(Ok(BlueprintStatus::Present(
                    BlueprintCompleteness::Complete,
                )));
                backend.push_session(Ok(ScriptedBackend::session("s-1", Vec::new())));
                let chat = SpaceChat::new(backend.clone(), ClientConfig::default());
                chat.activate(SpaceContext::new("sp-1", SpaceKind::Dev))
                    .await
                    .unwrap();
                let before = chat.snapshot().await.messages.len();

                for blank in blanks {
                    let outcome = chat.send(SendRequest::text(blank)).await.unwrap();
                    assert_eq!(outcome, SendOutcome::Skipped);
                }
                assert_eq!(chat.snapshot().await.messages.len(), before);
                assert!(backend.dispatched().is_empty());
            });
        }
    }
}
