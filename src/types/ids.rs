//! Newtype wrappers for Slack identifiers.
//!
//! These types keep channel IDs, message IDs, and event timestamps from being
//! mixed up in signatures that would otherwise take three bare strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Slack channel identifier (e.g. `C0123456789`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(s: impl Into<String>) -> Self {
        ChannelId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        ChannelId(s)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        ChannelId(s.to_string())
    }
}

/// A client-assigned message identifier, unique per user message.
///
/// Slack repeats it across duplicate deliveries of the same message (push
/// and history alike), which is what makes it usable as a dedupe key.
/// Bot and system messages often have none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientMsgId(pub String);

impl ClientMsgId {
    pub fn new(s: impl Into<String>) -> Self {
        ClientMsgId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ClientMsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientMsgId {
    fn from(s: String) -> Self {
        ClientMsgId(s)
    }
}

impl From<&str> for ClientMsgId {
    fn from(s: &str) -> Self {
        ClientMsgId(s.to_string())
    }
}

/// A Slack event timestamp: a decimal string like `1731000000.123456`.
///
/// Slack orders events by these, so the relay compares them numerically,
/// but they are carried verbatim as strings; re-formatting one would lose
/// the sub-second suffix that makes it a unique message key upstream.
/// `Default` is the empty string, mirroring an event that carried no
/// timestamp at all; use [`EventTs::zero`] for the explicit origin cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTs(pub String);

impl EventTs {
    pub fn new(s: impl Into<String>) -> Self {
        EventTs(s.into())
    }

    /// The `"0"` timestamp: older than every real event, used as the
    /// starting watermark and as the "from the beginning" history cursor.
    pub fn zero() -> Self {
        EventTs("0".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value for ordering comparisons, if this parses as one.
    ///
    /// Timestamps that fail to parse are handled by policy at each call
    /// site (the watermark fails open, the poller skips), so this returns
    /// an `Option` rather than an error.
    pub fn numeric(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok()
    }

    /// True for the values that mean "no cursor yet": empty or `"0"`.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty() || self.0 == "0"
    }
}

impl fmt::Display for EventTs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EventTs {
    fn from(s: String) -> Self {
        EventTs(s)
    }
}

impl From<&str> for EventTs {
    fn from(s: &str) -> Self {
        EventTs(s.to_string())
    }
}
