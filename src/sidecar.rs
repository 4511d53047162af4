//! Client for the local capture sidecar's long-poll queue.
//!
//! The sidecar sits on `localhost`, accepts webhook deliveries from the
//! wider world, and queues them per source tag. `GET /events?wait=true`
//! holds the connection (about 35 seconds) until events arrive or the
//! hold expires with an empty array. An empty array is a normal idle
//! poll; anything that is not an array means the sidecar is misbehaving
//! and is reported as an error so the caller backs off instead of
//! hammering it.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// End-to-end budget for one long-poll request: the sidecar's ~35 s hold
/// plus headroom for transit. Hitting this means the sidecar is gone, not
/// slow.
pub const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(40);

/// Errors raised while draining the sidecar.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("sidecar request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sidecar response was not an event array: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One captured delivery, exactly as the sidecar stored it: the raw body
/// bytes (signature verification needs them untouched) plus the original
/// request headers.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
}

impl RawEvent {
    /// Case-insensitive header lookup; proxies in front of the sidecar
    /// rewrite header casing freely.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP client for one sidecar queue, scoped to a source tag.
#[derive(Clone)]
pub struct SidecarClient {
    http: reqwest::Client,
    base_url: String,
    source: String,
}

impl SidecarClient {
    /// Creates a client for the queue at `base_url`, draining events
    /// tagged with `source`.
    pub fn new(base_url: impl Into<String>, source: impl Into<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(LONG_POLL_TIMEOUT)
            .build()?;
        Ok(SidecarClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            source: source.into(),
        })
    }

    /// The source tag this client drains (and checks deliveries against).
    pub fn source(&self) -> &str {
        &self.source
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.base_url)
    }

    /// One long poll. Returns the pending batch, which is empty when the
    /// hold expired with nothing to deliver.
    pub async fn fetch_pending(&self) -> Result<Vec<RawEvent>, FetchError> {
        let response = self
            .http
            .get(self.events_url())
            .query(&[("wait", "true"), ("source", self.source.as_str())])
            .send()
            .await?
            .error_for_status()?;
        let value: serde_json::Value = response.json().await?;
        decode_batch(value)
    }
}

impl std::fmt::Debug for SidecarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SidecarClient")
            .field("base_url", &self.base_url)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

fn decode_batch(value: serde_json::Value) -> Result<Vec<RawEvent>, FetchError> {
    Ok(serde_json::from_value(value)?)
}
