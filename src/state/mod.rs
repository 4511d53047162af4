//! Durable relay state: the emission watermark and the recent-id set.
//!
//! Both stores keep an authoritative in-memory value and mirror it to a
//! flat file through [`fsync::write_atomic`], so a crash mid-update leaves
//! the previous state intact rather than a torn file.

pub mod fsync;
pub mod recent_ids;
pub mod watermark;

// Re-export commonly used types at the module level
pub use recent_ids::{RecentIdSet, MAX_RECENT_IDS};
pub use watermark::WatermarkStore;

use thiserror::Error;

/// Errors raised while loading or persisting relay state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O: {0}")]
    Io(#[from] std::io::Error),
}
