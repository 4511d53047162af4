//! HTTP receiver for direct Slack deliveries.
//!
//! The `serve` mode binds this minimal endpoint instead of draining the
//! sidecar. Slack POSTs straight to `/slack/events`; the handler answers
//! the `url_verification` handshake at the transport boundary and runs
//! everything else through the same decision core as the processor. The
//! receiver is single-shot: once one message has been relayed, the `done`
//! token is cancelled and the server drains and exits.
//!
//! # Endpoints
//!
//! - `POST /slack/events` - Accepts Slack Events API deliveries
//! - `GET /healthz` - Returns 200 if server is running

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub mod health;
pub mod webhook;

pub use health::healthz_handler;
pub use webhook::receive_event;

use crate::pipeline::EventPipeline;

/// Shared receiver state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Signing secret for delivery verification; `None` disables it.
    signing_secret: Option<Vec<u8>>,

    /// The decision core shared with the processor mode.
    pipeline: EventPipeline,

    /// Cancelled after the first emission; the server's shutdown signal.
    done: CancellationToken,
}

impl AppState {
    pub fn new(
        signing_secret: Option<Vec<u8>>,
        pipeline: EventPipeline,
        done: CancellationToken,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                signing_secret,
                pipeline,
                done,
            }),
        }
    }

    /// Returns the signing secret, if verification is enabled.
    pub fn signing_secret(&self) -> Option<&[u8]> {
        self.inner.signing_secret.as_deref()
    }

    /// Returns the shared decision core.
    pub fn pipeline(&self) -> &EventPipeline {
        &self.inner.pipeline
    }

    /// Signals that the receiver has relayed its one message.
    pub fn finish(&self) {
        self.inner.done.cancel();
    }

    /// Whether the single-shot receiver has finished.
    pub fn is_finished(&self) -> bool {
        self.inner.done.is_cancelled()
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/slack/events", post(receive_event))
        .route("/healthz", get(healthz_handler))
        .with_state(app_state)
}
