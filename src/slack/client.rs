//! Minimal `conversations.history` client.
//!
//! The reconciliation poller is the only caller: it re-reads the recent
//! tail of one channel to catch messages the push path missed. Slack
//! wraps every Web API response in an `ok`/`error` envelope; `ok: false`
//! comes back as [`ApiError::Api`] so the poller logs it and waits for
//! the next tick rather than treating it as an empty page.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::types::{ChannelId, EventTs};
use crate::webhooks::InnerEvent;

/// Default Web API base; overridable for tests and proxies.
pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// History page size. Reconciliation only needs the recent tail; anything
/// older than twenty messages ago was either relayed already or lost long
/// before this safety net could help.
pub const HISTORY_PAGE_LIMIT: u32 = 20;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while reading channel history.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("history request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Slack API error: {0}")]
    Api(String),
}

/// The `conversations.history` response envelope.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    messages: Vec<InnerEvent>,
    #[serde(default)]
    error: Option<String>,
}

impl HistoryResponse {
    fn into_messages(self) -> Result<Vec<InnerEvent>, ApiError> {
        if self.ok {
            Ok(self.messages)
        } else {
            Err(ApiError::Api(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// Bearer-authenticated Web API client.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(SlackClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn history_url(&self) -> String {
        format!("{}/conversations.history", self.base_url)
    }

    /// Fetches the newest messages in `channel`, newest first.
    ///
    /// `oldest` bounds the page to messages strictly after that
    /// timestamp; `None` reads from the start of what Slack retains.
    pub async fn history(
        &self,
        channel: &ChannelId,
        oldest: Option<&EventTs>,
    ) -> Result<Vec<InnerEvent>, ApiError> {
        let limit = HISTORY_PAGE_LIMIT.to_string();
        let mut request = self
            .http
            .get(self.history_url())
            .bearer_auth(&self.token)
            .query(&[("channel", channel.as_str()), ("limit", limit.as_str())]);
        if let Some(oldest) = oldest {
            request = request.query(&[("oldest", oldest.as_str())]);
        }
        let response = request.send().await?.error_for_status()?;
        let page: HistoryResponse = response.json().await?;
        page.into_messages()
    }
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
