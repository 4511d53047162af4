//! Relay Slack Events API traffic to a line-oriented JSON stream.
//!
//! Two runtime modes share one decision core. The **processor** (default)
//! drains captured webhook deliveries from a local sidecar queue, verifies
//! and filters each event, and prints one clean JSON message per line on
//! stdout, with a background poller replaying `conversations.history` to
//! catch anything the push path missed. The **receiver** (`serve [port]`)
//! is a minimal HTTP endpoint that accepts one Slack delivery directly,
//! emits it, and exits.
//!
//! Stdout is the output protocol: every line written there is a
//! [`types::CleanMessage`]. All diagnostics go to stderr via `tracing`.

pub mod config;
pub mod emit;
pub mod pipeline;
pub mod server;
pub mod sidecar;
pub mod slack;
pub mod state;
pub mod types;
pub mod webhooks;
pub mod worker;

#[cfg(test)]
pub mod test_utils;
