//! The processor runtime: drain, reconcile, back off.
//!
//! # Architecture
//!
//! Two long-running tasks share one pipeline and one set of state stores:
//!
//! - [`drain`]: long-polls the sidecar queue, the primary low-latency
//!   delivery path;
//! - [`poll`]: periodically replays recent channel history, the safety
//!   net for anything the push path dropped.
//!
//! Both honor the same cancellation token and exit quietly on shutdown.
//!
//! # Module Structure
//!
//! - [`drain`]: the sidecar drain loop
//! - [`poll`]: history reconciliation
//! - [`retry`]: backoff pacing for sidecar reconnects

pub mod drain;
pub mod poll;
pub mod retry;

pub use drain::DrainLoop;
pub use poll::ReconciliationPoller;
pub use retry::{Backoff, RetryPolicy};
