//! Relevance filtering for inbound events.
//!
//! Both delivery paths (sidecar drain and history reconciliation) run every
//! event through one filter, so "what counts as a message worth relaying"
//! is decided in exactly one place:
//!
//! 1. only `message` and `app_mention` events pass;
//! 2. the relay's own bot messages are dropped (when a bot id is
//!    configured), so it never echoes itself into a loop;
//! 3. `message_changed` / `message_deleted` subtypes are dropped; edits
//!    and deletions are not new messages;
//! 4. a `client_msg_id` seen recently is a duplicate delivery and is
//!    dropped.
//!
//! Everything that survives is flattened into the [`CleanMessage`] shape.

use std::sync::Arc;

use tracing::warn;

use crate::state::RecentIdSet;
use crate::types::CleanMessage;

use super::envelope::InnerEvent;

/// The event types that are relayed at all.
const RELAYED_TYPES: [&str; 2] = ["message", "app_mention"];

/// Subtypes that describe a change to an existing message rather than a
/// new one.
const MUTATION_SUBTYPES: [&str; 2] = ["message_changed", "message_deleted"];

/// Decides which events become output lines.
#[derive(Debug, Clone)]
pub struct EventFilter {
    own_bot_id: Option<String>,
    recent_ids: Arc<RecentIdSet>,
}

impl EventFilter {
    /// `own_bot_id` enables self-filtering; `None` (or empty, normalized by
    /// config) relays bot traffic like anything else.
    pub fn new(own_bot_id: Option<String>, recent_ids: Arc<RecentIdSet>) -> Self {
        EventFilter {
            own_bot_id,
            recent_ids,
        }
    }

    /// Applies the relevance rules, returning the message to emit.
    ///
    /// `None` means drop. This mutates the recent-id set: a fresh
    /// `client_msg_id` is recorded even if the caller later decides not
    /// to emit (the watermark gate comes after); the id has genuinely
    /// been observed either way.
    pub fn filter(&self, event: &InnerEvent) -> Option<CleanMessage> {
        let kind = event.kind.as_deref()?;
        if !RELAYED_TYPES.contains(&kind) {
            return None;
        }

        if let Some(own) = &self.own_bot_id {
            if event.bot_id.as_deref() == Some(own.as_str()) {
                return None;
            }
        }

        if let Some(subtype) = event.subtype.as_deref() {
            if MUTATION_SUBTYPES.contains(&subtype) {
                return None;
            }
        }

        if let Some(id) = event.client_msg_id.as_ref().filter(|id| !id.is_empty()) {
            match self.recent_ids.check_and_record(id) {
                Ok(true) => return None,
                Ok(false) => {}
                // The id was still recorded in memory; dedupe degrades to
                // session-only rather than dropping the message.
                Err(err) => warn!(error = %err, "failed to persist recent ids"),
            }
        }

        Some(CleanMessage {
            user: event.user.clone().unwrap_or_default(),
            text: event.text.clone().unwrap_or_default(),
            ts: event.ts.clone().unwrap_or_default(),
            channel: event.channel.clone().unwrap_or_default(),
            kind: kind.to_string(),
            thread_ts: event
                .thread_ts
                .clone()
                .filter(|ts| !ts.as_str().is_empty()),
            bot_id: event.bot_id.clone().filter(|id| !id.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelId, ClientMsgId, EventTs};
    use tempfile::tempdir;

    fn filter_with(own_bot_id: Option<&str>, dir: &tempfile::TempDir) -> EventFilter {
        let recent = RecentIdSet::load(dir.path().join("seen-ids")).unwrap();
        EventFilter::new(own_bot_id.map(String::from), Arc::new(recent))
    }

    fn message(text: &str, msg_id: Option<&str>) -> InnerEvent {
        InnerEvent {
            kind: Some("message".to_string()),
            user: Some("U123".to_string()),
            text: Some(text.to_string()),
            ts: Some(EventTs::new("1731000000.000100")),
            channel: Some(ChannelId::new("C123")),
            client_msg_id: msg_id.map(ClientMsgId::new),
            ..InnerEvent::default()
        }
    }

    #[test]
    fn relays_plain_messages_and_mentions() {
        let dir = tempdir().unwrap();
        let filter = filter_with(None, &dir);

        let msg = filter.filter(&message("hi", Some("id-1"))).unwrap();
        assert_eq!(msg.kind, "message");
        assert_eq!(msg.user, "U123");
        assert_eq!(msg.text, "hi");
        assert_eq!(msg.channel, ChannelId::new("C123"));

        let mention = InnerEvent {
            kind: Some("app_mention".to_string()),
            ..message("<@U999> hi", Some("id-2"))
        };
        assert_eq!(filter.filter(&mention).unwrap().kind, "app_mention");
    }

    #[test]
    fn drops_everything_but_messages_and_mentions() {
        let dir = tempdir().unwrap();
        let filter = filter_with(None, &dir);

        for kind in ["reaction_added", "channel_created", "team_join"] {
            let event = InnerEvent {
                kind: Some(kind.to_string()),
                ..message("x", None)
            };
            assert!(filter.filter(&event).is_none(), "{kind} should be dropped");
        }
        assert!(filter.filter(&InnerEvent::default()).is_none());
    }

    #[test]
    fn drops_own_bot_messages_but_keeps_other_bots() {
        let dir = tempdir().unwrap();
        let filter = filter_with(Some("B_SELF"), &dir);

        let own = InnerEvent {
            bot_id: Some("B_SELF".to_string()),
            ..message("my own echo", None)
        };
        assert!(filter.filter(&own).is_none());

        let other = InnerEvent {
            bot_id: Some("B_OTHER".to_string()),
            ..message("someone else's bot", None)
        };
        let msg = filter.filter(&other).unwrap();
        assert_eq!(msg.bot_id.as_deref(), Some("B_OTHER"));
    }

    #[test]
    fn without_a_configured_bot_id_own_messages_pass() {
        let dir = tempdir().unwrap();
        let filter = filter_with(None, &dir);

        let event = InnerEvent {
            bot_id: Some("B_SELF".to_string()),
            ..message("echo", None)
        };
        assert!(filter.filter(&event).is_some());
    }

    #[test]
    fn drops_edits_and_deletions_but_not_other_subtypes() {
        let dir = tempdir().unwrap();
        let filter = filter_with(None, &dir);

        for subtype in ["message_changed", "message_deleted"] {
            let event = InnerEvent {
                subtype: Some(subtype.to_string()),
                ..message("edited", None)
            };
            assert!(filter.filter(&event).is_none(), "{subtype} should be dropped");
        }

        let join = InnerEvent {
            subtype: Some("channel_join".to_string()),
            ..message("joined", None)
        };
        assert!(filter.filter(&join).is_some());
    }

    #[test]
    fn duplicate_client_msg_ids_are_dropped_across_event_types() {
        let dir = tempdir().unwrap();
        let filter = filter_with(None, &dir);

        assert!(filter.filter(&message("hello", Some("dup-1"))).is_some());
        assert!(filter.filter(&message("hello", Some("dup-1"))).is_none());

        // A mention re-delivers the same message under another event type.
        let mention = InnerEvent {
            kind: Some("app_mention".to_string()),
            ..message("hello", Some("dup-1"))
        };
        assert!(filter.filter(&mention).is_none());
    }

    #[test]
    fn events_without_client_msg_id_are_never_deduped() {
        let dir = tempdir().unwrap();
        let filter = filter_with(None, &dir);

        assert!(filter.filter(&message("first", None)).is_some());
        assert!(filter.filter(&message("second", None)).is_some());

        let empty_id = message("third", Some(""));
        assert!(filter.filter(&empty_id).is_some());
        assert!(filter.filter(&empty_id).is_some());
    }

    #[test]
    fn missing_fields_become_empty_strings() {
        let dir = tempdir().unwrap();
        let filter = filter_with(None, &dir);

        let bare = InnerEvent {
            kind: Some("message".to_string()),
            ..InnerEvent::default()
        };
        let msg = filter.filter(&bare).unwrap();
        assert_eq!(msg.user, "");
        assert_eq!(msg.text, "");
        assert_eq!(msg.ts, EventTs::new(""));
        assert!(msg.channel.is_empty());
        assert_eq!(msg.thread_ts, None);
        assert_eq!(msg.bot_id, None);
    }

    #[test]
    fn thread_ts_is_carried_only_when_non_empty() {
        let dir = tempdir().unwrap();
        let filter = filter_with(None, &dir);

        let threaded = InnerEvent {
            thread_ts: Some(EventTs::new("1731000000.000050")),
            ..message("reply", None)
        };
        assert_eq!(
            filter.filter(&threaded).unwrap().thread_ts,
            Some(EventTs::new("1731000000.000050"))
        );

        let empty = InnerEvent {
            thread_ts: Some(EventTs::new("")),
            ..message("reply", None)
        };
        assert_eq!(filter.filter(&empty).unwrap().thread_ts, None);
    }
}
