//! Shared test fixtures: capturable output, canned events, signed
//! deliveries.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::{ChannelId, CleanMessage, ClientMsgId, EventTs};
use crate::webhooks::envelope::InnerEvent;
use crate::webhooks::{compute_signature, format_signature_header};

/// A clonable in-memory writer so tests can hand an emitter a sink and
/// read back what it wrote.
#[derive(Debug, Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// The emitted output split into parsed JSON lines.
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.contents()
            .lines()
            .map(|line| serde_json::from_str(line).expect("output line is JSON"))
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A plain user message event with the given text and timestamp.
pub fn message_event(text: &str, ts: &str) -> InnerEvent {
    InnerEvent {
        kind: Some("message".to_string()),
        user: Some("U123".to_string()),
        text: Some(text.to_string()),
        ts: Some(EventTs::new(ts)),
        event_ts: Some(EventTs::new(ts)),
        channel: Some(ChannelId::new("C123")),
        client_msg_id: Some(ClientMsgId::new(format!("cmid-{ts}"))),
        ..InnerEvent::default()
    }
}

/// A minimal clean message, for exercising the emitter directly.
pub fn sample_message(text: &str) -> CleanMessage {
    CleanMessage {
        user: "U123".to_string(),
        text: text.to_string(),
        ts: EventTs::new("1731000000.000100"),
        channel: ChannelId::new("C123"),
        kind: "message".to_string(),
        thread_ts: None,
        bot_id: None,
    }
}

/// Wraps an inner event in an `event_callback` envelope body.
pub fn callback_body(event: &InnerEvent) -> Vec<u8> {
    let mut inner = serde_json::Map::new();
    if let Some(kind) = &event.kind {
        inner.insert("type".into(), kind.clone().into());
    }
    if let Some(subtype) = &event.subtype {
        inner.insert("subtype".into(), subtype.clone().into());
    }
    if let Some(user) = &event.user {
        inner.insert("user".into(), user.clone().into());
    }
    if let Some(text) = &event.text {
        inner.insert("text".into(), text.clone().into());
    }
    if let Some(ts) = &event.ts {
        inner.insert("ts".into(), ts.as_str().into());
    }
    if let Some(event_ts) = &event.event_ts {
        inner.insert("event_ts".into(), event_ts.as_str().into());
    }
    if let Some(channel) = &event.channel {
        inner.insert("channel".into(), channel.as_str().into());
    }
    if let Some(thread_ts) = &event.thread_ts {
        inner.insert("thread_ts".into(), thread_ts.as_str().into());
    }
    if let Some(bot_id) = &event.bot_id {
        inner.insert("bot_id".into(), bot_id.clone().into());
    }
    if let Some(id) = &event.client_msg_id {
        inner.insert("client_msg_id".into(), id.as_str().into());
    }
    serde_json::to_vec(&serde_json::json!({
        "type": "event_callback",
        "event": serde_json::Value::Object(inner),
    }))
    .expect("fixture serializes")
}

/// Current wall-clock seconds as Slack renders its timestamp header.
pub fn fresh_timestamp_header() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Signs `body` the way Slack would, returning `(timestamp, signature)`
/// header values that verify right now.
pub fn sign_body(secret: &str, body: &[u8]) -> (String, String) {
    let ts = fresh_timestamp_header();
    let sig = compute_signature(secret.as_bytes(), &ts, body);
    (ts, format_signature_header(&sig))
}
