//! Inbound Slack delivery handling.
//!
//! This module provides:
//! - Signature verification for deliveries (HMAC-SHA256, `v0` scheme)
//! - Envelope and inner-event parsing
//! - The relevance filter shared by every delivery path

pub mod envelope;
pub mod filter;
pub mod signature;

pub use envelope::{parse_envelope, InnerEvent, WebhookEnvelope};
pub use filter::EventFilter;
pub use signature::{
    compute_signature, format_signature_header, parse_signature_header, verify_signature,
    MAX_TIMESTAMP_AGE_SECS, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
