//! Slack Events API payload modeling.
//!
//! Every delivery is an envelope discriminated by its top-level `type`.
//! Only two kinds matter here: `url_verification` (Slack probing the
//! endpoint, answered by echoing the challenge) and `event_callback`
//! (carrying the actual event). Everything else parses into
//! [`WebhookEnvelope::Other`] and is dropped.
//!
//! The inner event is deliberately lenient: all fields optional, unknown
//! fields ignored. Slack adds fields freely and this relay only ever reads
//! a handful, so a strict model would be a standing breakage risk.

use serde::Deserialize;

use crate::types::{ChannelId, ClientMsgId, EventTs};

/// A parsed Events API delivery, discriminated on the top-level `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEnvelope {
    /// Slack verifying endpoint ownership; the challenge is echoed back.
    #[serde(rename = "url_verification")]
    UrlVerification {
        #[serde(default)]
        challenge: String,
    },
    /// A real event delivery wrapping one inner event.
    #[serde(rename = "event_callback")]
    EventCallback {
        #[serde(default)]
        event: InnerEvent,
    },
    /// Any other envelope type; ignored.
    #[serde(other)]
    Other,
}

/// Parses a raw delivery body into an envelope.
///
/// Fails only on malformed JSON or a missing/unrecognizable `type` tag;
/// callers treat that as "not for us" and drop the delivery.
pub fn parse_envelope(body: &[u8]) -> Result<WebhookEnvelope, serde_json::Error> {
    serde_json::from_slice(body)
}

/// The event inside an `event_callback`, as loosely as Slack sends it.
///
/// `conversations.history` returns message objects of the same shape
/// (minus `channel`), so the reconciliation poller reuses this type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InnerEvent {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub subtype: Option<String>,
    pub user: Option<String>,
    pub text: Option<String>,
    pub ts: Option<EventTs>,
    pub event_ts: Option<EventTs>,
    pub channel: Option<ChannelId>,
    pub thread_ts: Option<EventTs>,
    pub bot_id: Option<String>,
    pub client_msg_id: Option<ClientMsgId>,
}

impl InnerEvent {
    /// The timestamp used for watermark ordering: `event_ts`, falling back
    /// to `ts`, falling back to `"0"` (which never advances anything).
    pub fn effective_ts(&self) -> EventTs {
        self.event_ts
            .clone()
            .or_else(|| self.ts.clone())
            .unwrap_or_else(EventTs::zero)
    }
}
