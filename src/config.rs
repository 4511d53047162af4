//! Environment-derived configuration.
//!
//! Every knob is an environment variable, and parsing is lenient: a value
//! that does not parse falls back to its default with a warning rather than
//! refusing to start. The relay runs unattended on the same box as the
//! sidecar, and a dead relay loses more messages than a default interval
//! ever could.
//!
//! Empty values count as unset, so `SLACK_SIGNING_SECRET=""` disables
//! verification the same way as not exporting it at all.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::types::ChannelId;

/// Default sidecar base URL; the sidecar is expected on the same host.
pub const DEFAULT_SIDECAR_URL: &str = "http://localhost:9999";

/// Default source tag to drain from the sidecar.
pub const DEFAULT_SIDECAR_SOURCE: &str = "slack";

/// Default reconciliation interval (seconds).
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

const DEFAULT_WATERMARK_FILE: &str = "/tmp/slack-relay-watermark";
const DEFAULT_SEEN_IDS_FILE: &str = "/tmp/slack-relay-seen-ids";

/// Default Slack Web API base URL.
const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Runtime configuration shared by both relay modes.
#[derive(Debug, Clone)]
pub struct Config {
    /// Signing secret for delivery verification; `None` disables it.
    pub signing_secret: Option<String>,

    /// The relay's own bot id; `None` disables self-filtering.
    pub bot_id: Option<String>,

    /// Web API token for history reconciliation.
    pub token: Option<String>,

    /// Channel whose history is reconciled.
    pub channel: Option<ChannelId>,

    /// Interval between reconciliation polls; zero disables the poller.
    ///
    /// Default: 60 seconds. Configure via `SLACK_POLL_INTERVAL`.
    pub poll_interval: Duration,

    /// Sidecar base URL, normalized without a trailing slash.
    pub sidecar_url: String,

    /// Source tag the drain loop asks the sidecar for.
    pub sidecar_source: String,

    /// Path of the persisted watermark file.
    pub watermark_file: PathBuf,

    /// Path of the persisted recent-id file.
    pub seen_ids_file: PathBuf,

    /// Slack Web API base URL; overridable for tests and proxies.
    pub api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates a `Config` with every default in place.
    pub fn new() -> Self {
        Config {
            signing_secret: None,
            bot_id: None,
            token: None,
            channel: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            sidecar_url: DEFAULT_SIDECAR_URL.to_string(),
            sidecar_source: DEFAULT_SIDECAR_SOURCE.to_string(),
            watermark_file: PathBuf::from(DEFAULT_WATERMARK_FILE),
            seen_ids_file: PathBuf::from(DEFAULT_SEEN_IDS_FILE),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Reads the configuration from the environment.
    ///
    /// Recognized variables: `SLACK_SIGNING_SECRET`, `SLACK_BOT_ID`,
    /// `SLACK_TOKEN`, `SLACK_CHANNEL`, `SLACK_POLL_INTERVAL`,
    /// `SIDECAR_URL`, `SIDECAR_SOURCE`, `SLACK_WATERMARK_FILE`,
    /// `SLACK_SEEN_IDS_FILE`, `SLACK_API_URL`.
    pub fn from_env() -> Self {
        let defaults = Config::new();
        Config {
            signing_secret: non_empty_var("SLACK_SIGNING_SECRET"),
            bot_id: non_empty_var("SLACK_BOT_ID"),
            token: non_empty_var("SLACK_TOKEN"),
            channel: non_empty_var("SLACK_CHANNEL").map(ChannelId::from),
            poll_interval: non_empty_var("SLACK_POLL_INTERVAL")
                .map(|raw| parse_interval(&raw))
                .unwrap_or(defaults.poll_interval),
            sidecar_url: non_empty_var("SIDECAR_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.sidecar_url),
            sidecar_source: non_empty_var("SIDECAR_SOURCE").unwrap_or(defaults.sidecar_source),
            watermark_file: non_empty_var("SLACK_WATERMARK_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.watermark_file),
            seen_ids_file: non_empty_var("SLACK_SEEN_IDS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.seen_ids_file),
            api_base: non_empty_var("SLACK_API_URL").unwrap_or(defaults.api_base),
        }
    }

    /// The reconciliation settings, when the poller is fully configured.
    ///
    /// Requires all three of: a token, a channel, and a positive interval.
    /// Anything less and the relay runs on webhook delivery alone.
    pub fn reconciliation(&self) -> Option<(String, ChannelId)> {
        if self.poll_interval.is_zero() {
            return None;
        }
        match (&self.token, &self.channel) {
            (Some(token), Some(channel)) => Some((token.clone(), channel.clone())),
            _ => None,
        }
    }
}

/// Reads a variable, treating absent, unreadable, and blank all as unset.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses the poll interval, falling back to the default on garbage.
fn parse_interval(raw: &str) -> Duration {
    match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => {
            warn!(
                value = raw,
                "SLACK_POLL_INTERVAL is not a whole number of seconds, using {DEFAULT_POLL_INTERVAL_SECS}"
            );
            Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)
        }
    }
}
