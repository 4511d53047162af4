//! Events endpoint handler.
//!
//! Accepts Slack Events API deliveries, validates signatures, and runs the
//! event through the shared pipeline. Everything after a valid signature
//! answers 200: Slack re-delivers on any other status, so a deliberate drop
//! (wrong event type, stale timestamp, unparsable body) must not look like
//! a failure to the platform.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::pipeline::Disposition;
use crate::webhooks::{
    parse_envelope, verify_signature, WebhookEnvelope, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};

/// Errors that reject a delivery outright.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Signature missing or wrong; the only non-200 response.
    #[error("invalid delivery signature")]
    InvalidSignature,
}

impl IntoResponse for ReceiverError {
    fn into_response(self) -> Response {
        match self {
            ReceiverError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
        }
    }
}

/// Events handler.
///
/// # Request
///
/// - Method: POST
/// - Headers (required when a signing secret is configured):
///   - `X-Slack-Request-Timestamp`: Unix seconds at send time
///   - `X-Slack-Signature`: `v0=<hex HMAC-SHA256>` over the timestamp and body
/// - Body: JSON envelope (`url_verification` or `event_callback`)
///
/// # Response
///
/// - 200 OK with the challenge string: `url_verification` handshake
/// - 200 OK: everything else that verified, relayed or not
/// - 401 Unauthorized: signature verification failed
pub async fn receive_event(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ReceiverError> {
    // Verify the signature BEFORE any parsing. With no secret configured
    // this passes everything; with one, missing headers fail too.
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let signature = header_str(&headers, SIGNATURE_HEADER);
    if !verify_signature(&body, timestamp, signature, app_state.signing_secret()) {
        warn!("rejecting delivery with invalid signature");
        return Err(ReceiverError::InvalidSignature);
    }

    let envelope = match parse_envelope(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!(error = %err, "ignoring unparsable delivery");
            return Ok(StatusCode::OK.into_response());
        }
    };

    match envelope {
        WebhookEnvelope::UrlVerification { challenge } => {
            info!("answering url_verification challenge");
            Ok((StatusCode::OK, challenge).into_response())
        }
        WebhookEnvelope::EventCallback { event } => {
            let disposition = app_state.pipeline().process(&event);
            debug!(?disposition, "processed delivery");
            if disposition == Disposition::Emitted {
                info!("message relayed, shutting down");
                app_state.finish();
            }
            Ok(StatusCode::OK.into_response())
        }
        WebhookEnvelope::Other => {
            debug!("ignoring non-event delivery");
            Ok(StatusCode::OK.into_response())
        }
    }
}

/// Extracts an optional header value as a string.
fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
