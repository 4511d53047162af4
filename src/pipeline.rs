//! The decision core shared by every delivery path.
//!
//! Whether an event arrived through the sidecar drain or straight over
//! HTTP, the question is the same: is this a relevant, fresh message?
//! The answer runs filter → watermark gate → emit → advance, in that
//! order. The watermark advances only after the message is actually on
//! stdout; a failed write leaves the cursor put.
//!
//! Reconciliation does not come through here: the history poller orders
//! against its own local cursor and advances the shared watermark in
//! batches (see `worker::poll`).

use std::sync::Arc;

use tracing::{debug, warn};

use crate::emit::Emitter;
use crate::state::WatermarkStore;
use crate::webhooks::{EventFilter, InnerEvent};

/// What became of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Relayed to stdout; the watermark moved up to its timestamp.
    Emitted,
    /// Dropped by the relevance filter (wrong type, own bot, edit,
    /// duplicate id).
    Filtered,
    /// Relevant but not newer than the watermark; already relayed once.
    Stale,
    /// Relevant and fresh, but writing it out failed; the watermark did
    /// not move. Only an id-less event is re-deliverable after this:
    /// the filter has already recorded any `client_msg_id`, so a
    /// redelivery bearing one is dropped as a duplicate.
    Failed,
}

/// Filter, gate, emit, advance — one event at a time.
#[derive(Debug, Clone)]
pub struct EventPipeline {
    filter: EventFilter,
    watermark: Arc<WatermarkStore>,
    emitter: Arc<Emitter>,
}

impl EventPipeline {
    pub fn new(filter: EventFilter, watermark: Arc<WatermarkStore>, emitter: Arc<Emitter>) -> Self {
        EventPipeline {
            filter,
            watermark,
            emitter,
        }
    }

    pub fn watermark(&self) -> &Arc<WatermarkStore> {
        &self.watermark
    }

    /// Runs one event through the shared decision sequence.
    pub fn process(&self, event: &InnerEvent) -> Disposition {
        let Some(message) = self.filter.filter(event) else {
            return Disposition::Filtered;
        };

        let ts = event.effective_ts();
        if !self.watermark.is_eligible(&ts) {
            debug!(ts = %ts, "event at or below watermark, dropping");
            return Disposition::Stale;
        }

        if let Err(err) = self.emitter.emit(&message) {
            warn!(error = %err, ts = %ts, "failed to emit message");
            return Disposition::Failed;
        }

        if let Err(err) = self.watermark.advance(&ts) {
            // The message is already out and the in-memory cursor has
            // moved; only the durable copy is behind.
            warn!(error = %err, ts = %ts, "failed to persist watermark");
        }
        Disposition::Emitted
    }
}
