//! The clean message record emitted on stdout.

use serde::{Deserialize, Serialize};

use super::{ChannelId, EventTs};

/// One relayed message, serialized as a single JSON line on stdout.
///
/// This is the entire downstream contract: consumers see these objects and
/// nothing else. The core fields are always present (empty strings when the
/// upstream event lacked them); `thread_ts` and `bot_id` appear only when
/// the event carried a non-empty value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanMessage {
    pub user: String,
    pub text: String,
    pub ts: EventTs,
    pub channel: ChannelId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<EventTs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
}
