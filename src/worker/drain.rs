//! The sidecar drain loop: the processor's primary delivery path.
//!
//! One long poll at a time, forever. A successful poll (even an empty
//! one) resets the backoff; a failed one waits out the policy's delay
//! before the next attempt. Each delivered event is checked (source tag,
//! then signature, then envelope shape) before it reaches the shared
//! pipeline. Rejections are per-event: one bad delivery never takes down
//! the batch.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pipeline::EventPipeline;
use crate::sidecar::{RawEvent, SidecarClient};
use crate::webhooks::{
    parse_envelope, verify_signature, WebhookEnvelope, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};

use super::retry::{Backoff, RetryPolicy};

/// Drains one sidecar queue into the pipeline.
#[derive(Debug)]
pub struct DrainLoop {
    sidecar: SidecarClient,
    signing_secret: Option<String>,
    pipeline: EventPipeline,
    retry: RetryPolicy,
}

impl DrainLoop {
    pub fn new(
        sidecar: SidecarClient,
        signing_secret: Option<String>,
        pipeline: EventPipeline,
        retry: RetryPolicy,
    ) -> Self {
        DrainLoop {
            sidecar,
            signing_secret,
            pipeline,
            retry,
        }
    }

    /// Polls until cancelled. Never returns an error: every failure mode
    /// is either a per-event drop or a backed-off retry.
    pub async fn run(self, cancel: CancellationToken) {
        info!(source = self.sidecar.source(), "draining sidecar queue");
        let mut backoff = Backoff::new(self.retry);
        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => return,
                result = self.sidecar.fetch_pending() => result,
            };
            match batch {
                Ok(events) => {
                    backoff.on_success();
                    for raw in &events {
                        self.process_raw(raw);
                    }
                }
                Err(err) => {
                    let delay = backoff.on_failure();
                    warn!(
                        error = %err,
                        delay_secs = delay.as_secs(),
                        "sidecar unavailable, backing off"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Checks and processes one captured delivery.
    fn process_raw(&self, raw: &RawEvent) {
        if raw.source != self.sidecar.source() {
            debug!(source = raw.source, "delivery for another source, skipping");
            return;
        }

        let accepted = verify_signature(
            raw.body.as_bytes(),
            raw.header(TIMESTAMP_HEADER),
            raw.header(SIGNATURE_HEADER),
            self.signing_secret.as_deref().map(str::as_bytes),
        );
        if !accepted {
            warn!("rejected delivery with invalid signature");
            return;
        }

        let envelope = match parse_envelope(raw.body.as_bytes()) {
            Ok(envelope) => envelope,
            Err(err) => {
                debug!(error = %err, "undecodable delivery body, dropping");
                return;
            }
        };
        match envelope {
            WebhookEnvelope::EventCallback { event } => {
                let disposition = self.pipeline.process(&event);
                debug!(?disposition, "processed delivery");
            }
            // The drain path never answers challenges; only the live
            // receiver endpoint does.
            WebhookEnvelope::UrlVerification { .. } | WebhookEnvelope::Other => {
                debug!("non-callback envelope, dropping");
            }
        }
    }
}
