//! Slack Web API access.

pub mod client;

pub use client::{ApiError, SlackClient, DEFAULT_API_BASE, HISTORY_PAGE_LIMIT};
