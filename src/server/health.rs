//! Health check endpoint for liveness probes.
//!
//! Returns 200 OK while the receiver is still waiting for its message.

use axum::http::StatusCode;

/// Health check handler.
///
/// Returns 200 OK with the text "OK". This simple endpoint is used
/// to verify that the server is running and accepting connections.
pub async fn healthz_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
