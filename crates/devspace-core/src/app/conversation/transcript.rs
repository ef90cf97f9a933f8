use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::message::Message;
use crate::ids::MessageId;

/// Ordered, append-only list of messages for one space activation.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
    /// Durable server id to the local entry that represents it.
    durable: HashMap<String, MessageId>,
    /// Local entries already paired with a durable server record.
    bound: HashSet<MessageId>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id() == id)
    }

    pub fn contains_durable(&self, durable_id: &str) -> bool {
        self.durable.contains_key(durable_id)
    }

    /// Appends `batch` in order and returns the newly appended slice.
    ///
    /// Existing entries are never touched. An incoming id that collides with an
    /// existing one is suffixed to keep ids unique.
    pub fn append(&mut self, batch: impl IntoIterator<Item = Message>) -> &[Message] {
        let start = self.messages.len();
        for mut message in batch {
            if self.ids.contains(message.id()) {
                let unique = self.unique_id(message.id());
                warn!(
                    target: "devspace::transcript",
                    original = %message.id(),
                    replacement = %unique,
                    "Duplicate message id on append"
                );
                message.rekey(unique);
            }
            if let Some(durable) = message.durable_id() {
                self.durable
                    .insert(durable.to_string(), message.id().clone());
                self.bound.insert(message.id().clone());
            }
            self.ids.insert(message.id().clone());
            self.messages.push(message);
        }
        &self.messages[start..]
    }

    /// Merges an authoritative history into the transcript and returns what was
    /// appended.
    ///
    /// A record is skipped when its durable id is already known, or when it
    /// matches (by fingerprint, in order) an existing unbound entry such as an
    /// optimistic echo. Everything else is appended in history order.
    pub fn reconcile(&mut self, history: impl IntoIterator<Item = Message>) -> &[Message] {
        let existing = self.messages.len();
        let mut claimed: HashSet<usize> = HashSet::new();
        let mut fresh = Vec::new();

        for incoming in history {
            if let Some(local) = incoming
                .durable_id()
                .and_then(|durable| self.durable.get(durable))
            {
                if let Some(index) = self.messages.iter().position(|m| m.id() == local) {
                    claimed.insert(index);
                }
                continue;
            }

            let fingerprint = incoming.fingerprint();
            let matched = self.messages[..existing]
                .iter()
                .enumerate()
                .find(|(index, message)| {
                    !claimed.contains(index)
                        && !message.is_synthetic()
                        && !self.bound.contains(message.id())
                        && message.fingerprint() == fingerprint
                })
                .map(|(index, message)| (index, message.id().clone()));

            match matched {
                Some((index, local)) => {
                    claimed.insert(index);
                    if let Some(durable) = incoming.durable_id() {
                        debug!(
                            target: "devspace::transcript",
                            %local,
                            durable,
                            "Bound history record to local entry"
                        );
                        self.durable.insert(durable.to_string(), local.clone());
                        self.bound.insert(local);
                    }
                }
                None => fresh.push(incoming),
            }
        }

        self.append(fresh)
    }

    fn unique_id(&self, id: &MessageId) -> MessageId {
        (1..)
            .map(|n| MessageId::new(format!("{id}-{n}")))
            .find(|candidate| !self.ids.contains(candidate))
            .unwrap_or_else(|| Message::generate_id(id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::conversation::message::Origin;
    use devspace_tools::{ToolExecution, ToolStatus};

    fn history(id: Option<&str>, text: &str) -> Message {
        Message::assistant(
            Message::generate_id("hist"),
            text,
            Origin::History {
                durable_id: id.map(str::to_string),
            },
        )
    }

    fn user_history(id: &str, text: &str) -> Message {
        Message::user(
            Message::generate_id("hist"),
            text,
            Origin::History {
                durable_id: Some(id.to_string()),
            },
        )
    }

    #[test]
    fn append_preserves_order_and_returns_new_slice() {
        let mut transcript = Transcript::new();
        assert!(transcript.append(Vec::new()).is_empty());

        let appended = transcript.append([history(None, "a"), history(None, "b")]);
        assert_eq!(appended.len(), 2);
        let appended = transcript.append([history(None, "c")]);
        assert_eq!(appended[0].as_text(), Some("c"));

        let texts: Vec<_> = transcript.iter().filter_map(Message::as_text).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_ids_are_rekeyed() {
        let mut transcript = Transcript::new();
        let id = MessageId::new("welcome-s1");
        transcript.append([Message::assistant(id.clone(), "hi", Origin::Synthetic)]);
        transcript.append([Message::assistant(id.clone(), "again", Origin::Synthetic)]);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1].id().as_str(), "welcome-s1-1");
    }

    #[test]
    fn reconcile_skips_known_durable_ids() {
        let mut transcript = Transcript::new();
        transcript.append([history(Some("m1"), "first")]);

        let appended = transcript
            .reconcile([history(Some("m1"), "first"), history(Some("m2"), "second")])
            .len();
        assert_eq!(appended, 1);
        assert_eq!(transcript.len(), 2);
        assert!(transcript.contains_durable("m2"));
    }

    #[test]
    fn reconcile_binds_optimistic_echo_instead_of_duplicating() {
        let mut transcript = Transcript::new();
        transcript.append([Message::optimistic_user("Using Tool: Run Tests", "run prompt")]);
        transcript.append([
            Message::assistant(Message::generate_id("msg"), "ok", Origin::DispatchResult),
            Message::tool_info(
                Message::generate_id("msg"),
                ToolExecution::new("runTests", ToolStatus::Success),
                Origin::DispatchResult,
            ),
        ]);

        let server = vec![
            user_history("u1", "run prompt"),
            history(Some("a1"), "ok"),
            Message::tool_info(
                Message::generate_id("hist"),
                ToolExecution::new("runTests", ToolStatus::Success),
                Origin::History {
                    durable_id: Some("t1".to_string()),
                },
            ),
            history(Some("a2"), "later reply"),
        ];
        let appended: Vec<_> = transcript
            .reconcile(server.clone())
            .iter()
            .filter_map(Message::as_text)
            .map(str::to_string)
            .collect();
        assert_eq!(appended, vec!["later reply"]);
        assert_eq!(transcript.len(), 4);

        // A second refresh with the same history is a no-op.
        assert!(transcript.reconcile(server).is_empty());
        assert_eq!(transcript.len(), 4);
    }

    #[test]
    fn bound_entries_are_not_claimed_twice() {
        let mut transcript = Transcript::new();
        transcript.append([Message::optimistic_user("hi", "hi")]);
        transcript.reconcile([user_history("u1", "hi")]);

        // The server later trims u1 but reports a second identical message.
        let appended = transcript.reconcile([user_history("u2", "hi")]).len();
        assert_eq!(appended, 1);
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn synthetic_entries_never_absorb_history() {
        let mut transcript = Transcript::new();
        transcript.append([Message::assistant(
            MessageId::new("welcome"),
            "Welcome!",
            Origin::Synthetic,
        )]);
        assert_eq!(transcript.reconcile([history(Some("m1"), "Welcome!")]).len(), 1);
    }
}
