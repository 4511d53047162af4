//! History reconciliation: the poller backstopping the push path.
//!
//! Webhook delivery is the primary path, but it is not sufficient alone:
//! the sidecar can be down, deliveries can be dropped, the tunnel can
//! flap. On a fixed interval this poller re-reads the recent tail of the
//! channel via `conversations.history` and relays anything the push path
//! missed.
//!
//! # Ordering
//!
//! Slack returns history newest first; the poller replays each page
//! oldest first so emission order matches event order. It keeps a local
//! cursor, seeded once from the persisted watermark, and only pushes the
//! shared watermark forward after a page has fully emitted. A mid-page
//! failure leaves both cursors put; the next tick replays the page, and
//! the recent-id set absorbs whatever already made it out.
//!
//! The poller shares the relevance filter with the push path but not its
//! per-event watermark gate: reconciliation orders against its own
//! cursor, and that comparison fails *closed* (a message it cannot place
//! is skipped, not emitted forever).

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::emit::Emitter;
use crate::slack::SlackClient;
use crate::state::WatermarkStore;
use crate::types::{ChannelId, EventTs};
use crate::webhooks::{EventFilter, InnerEvent};

/// Periodic `conversations.history` reconciliation for one channel.
#[derive(Debug)]
pub struct ReconciliationPoller {
    slack: SlackClient,
    channel: ChannelId,
    interval: Duration,
    filter: EventFilter,
    watermark: Arc<WatermarkStore>,
    emitter: Arc<Emitter>,
}

impl ReconciliationPoller {
    pub fn new(
        slack: SlackClient,
        channel: ChannelId,
        interval: Duration,
        filter: EventFilter,
        watermark: Arc<WatermarkStore>,
        emitter: Arc<Emitter>,
    ) -> Self {
        ReconciliationPoller {
            slack,
            channel,
            interval,
            filter,
            watermark,
            emitter,
        }
    }

    /// Polls until cancelled. Sleeps first: the push path covers the
    /// present, reconciliation covers the past.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            channel = %self.channel,
            interval_secs = self.interval.as_secs(),
            "polling conversations.history"
        );
        let mut cursor = self.watermark.current();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }

            let oldest = (!cursor.is_zero()).then(|| cursor.clone());
            match self.slack.history(&self.channel, oldest.as_ref()).await {
                Ok(page) => cursor = self.apply_page(&page, &cursor),
                Err(err) => warn!(error = %err, "history poll failed"),
            }
        }
    }

    /// Replays one newest-first history page against `cursor`, returning
    /// the cursor for the next tick.
    fn apply_page(&self, page: &[InnerEvent], cursor: &EventTs) -> EventTs {
        let floor = cursor.numeric();
        let mut advanced: Option<(f64, EventTs)> = None;

        for message in page.iter().rev() {
            // The filter runs before the cursor check so duplicate ids get
            // recorded even for messages the cursor already covers.
            let Some(mut clean) = self.filter.filter(message) else {
                continue;
            };
            let (Some(msg_ts), Some(floor)) = (clean.ts.numeric(), floor) else {
                continue;
            };
            if msg_ts <= floor {
                continue;
            }
            // History items carry no channel field.
            if clean.channel.is_empty() {
                clean.channel = self.channel.clone();
            }
            if let Err(err) = self.emitter.emit(&clean) {
                warn!(error = %err, "emit failed mid-page, cursor stays put");
                return cursor.clone();
            }
            if advanced.as_ref().is_none_or(|(max, _)| msg_ts > *max) {
                advanced = Some((msg_ts, clean.ts.clone()));
            }
        }

        match advanced {
            Some((_, newest)) => {
                if let Err(err) = self.watermark.advance(&newest) {
                    warn!(error = %err, "failed to persist watermark after poll");
                }
                newest
            }
            None => cursor.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RecentIdSet;
    use crate::test_utils::SharedBuf;
    use crate::types::ClientMsgId;
    use tempfile::tempdir;

    struct Fixture {
        poller: ReconciliationPoller,
        output: SharedBuf,
        watermark: Arc<WatermarkStore>,
        _dir: tempfile::TempDir,
    }

    fn fixture(own_bot_id: Option<&str>) -> Fixture {
        let dir = tempdir().unwrap();
        let recent = Arc::new(RecentIdSet::load(dir.path().join("seen-ids")).unwrap());
        let watermark = Arc::new(WatermarkStore::load(dir.path().join("watermark")).unwrap());
        let output = SharedBuf::default();
        let emitter = Arc::new(Emitter::with_writer(Box::new(output.clone())));
        let slack = SlackClient::new("http://localhost:9998", "xoxb-test").unwrap();
        let poller = ReconciliationPoller::new(
            slack,
            ChannelId::new("C123"),
            Duration::from_secs(60),
            EventFilter::new(own_bot_id.map(String::from), recent),
            Arc::clone(&watermark),
            emitter,
        );
        Fixture {
            poller,
            output,
            watermark,
            _dir: dir,
        }
    }

    /// A history item: no channel, no event_ts, just like the API returns.
    fn history_message(text: &str, ts: &str, msg_id: &str) -> InnerEvent {
        InnerEvent {
            kind: Some("message".to_string()),
            user: Some("U123".to_string()),
            text: Some(text.to_string()),
            ts: Some(EventTs::new(ts)),
            client_msg_id: Some(ClientMsgId::new(msg_id)),
            ..InnerEvent::default()
        }
    }

    #[test]
    fn replays_a_page_oldest_first_and_advances_both_cursors() {
        let fx = fixture(None);
        // Newest first, as conversations.history returns it.
        let page = vec![
            history_message("newest", "300.000100", "id-3"),
            history_message("middle", "200.000100", "id-2"),
            history_message("oldest", "100.000100", "id-1"),
        ];

        let next = fx.poller.apply_page(&page, &EventTs::zero());

        let lines = fx.output.json_lines();
        let texts: Vec<_> = lines.iter().map(|l| l["text"].as_str().unwrap()).collect();
        assert_eq!(texts, vec!["oldest", "middle", "newest"]);
        assert_eq!(next, EventTs::new("300.000100"));
        assert_eq!(fx.watermark.current(), EventTs::new("300.000100"));
    }

    #[test]
    fn messages_at_or_below_the_cursor_are_skipped() {
        let fx = fixture(None);
        let page = vec![
            history_message("new", "300.0", "id-new"),
            history_message("boundary", "200.0", "id-boundary"),
            history_message("old", "100.0", "id-old"),
        ];

        let next = fx.poller.apply_page(&page, &EventTs::new("200.0"));

        let lines = fx.output.json_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["text"], "new");
        assert_eq!(next, EventTs::new("300.0"));
    }

    #[test]
    fn injects_the_channel_into_history_messages() {
        let fx = fixture(None);
        let page = vec![history_message("bare", "50.0", "id-1")];

        fx.poller.apply_page(&page, &EventTs::zero());

        assert_eq!(fx.output.json_lines()[0]["channel"], "C123");
    }

    #[test]
    fn keeps_an_existing_channel_untouched() {
        let fx = fixture(None);
        let mut message = history_message("tagged", "50.0", "id-1");
        message.channel = Some(ChannelId::new("C999"));

        fx.poller.apply_page(&[message], &EventTs::zero());

        assert_eq!(fx.output.json_lines()[0]["channel"], "C999");
    }

    #[test]
    fn duplicate_ids_within_a_page_emit_once() {
        let fx = fixture(None);
        // The same message surfaces twice; the older copy replays first
        // and records the id, so the newer copy is filtered.
        let page = vec![
            history_message("copy", "300.0", "dup-id"),
            history_message("copy", "200.0", "dup-id"),
        ];

        let next = fx.poller.apply_page(&page, &EventTs::zero());

        assert_eq!(fx.output.json_lines().len(), 1);
        assert_eq!(next, EventTs::new("200.0"));
    }

    #[test]
    fn unorderable_messages_are_skipped_not_emitted() {
        let fx = fixture(None);
        let page = vec![history_message("garbled", "not-a-ts", "id-1")];

        let next = fx.poller.apply_page(&page, &EventTs::zero());

        assert!(fx.output.contents().is_empty());
        assert_eq!(next, EventTs::zero());
    }

    #[test]
    fn an_unorderable_cursor_skips_the_whole_page() {
        let fx = fixture(None);
        let page = vec![history_message("fine", "100.0", "id-1")];
        let corrupt = EventTs::new("corrupted");

        let next = fx.poller.apply_page(&page, &corrupt);

        assert!(fx.output.contents().is_empty());
        assert_eq!(next, corrupt);
    }

    #[test]
    fn empty_pages_leave_the_cursor_alone() {
        let fx = fixture(None);
        let next = fx.poller.apply_page(&[], &EventTs::new("123.0"));
        assert_eq!(next, EventTs::new("123.0"));
        assert_eq!(fx.watermark.current(), EventTs::zero());
    }

    #[test]
    fn own_bot_messages_are_filtered_during_reconciliation_too() {
        let fx = fixture(Some("B_SELF"));
        let mut own = history_message("echo", "100.0", "");
        own.client_msg_id = None;
        own.bot_id = Some("B_SELF".to_string());

        fx.poller.apply_page(&[own], &EventTs::zero());

        assert!(fx.output.contents().is_empty());
    }
}
