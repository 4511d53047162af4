//! The emission watermark: the newest event timestamp relayed so far.
//!
//! On disk this is a flat file holding a single decimal timestamp string.
//! The in-memory value is authoritative at runtime; the file is the record
//! that survives restarts. Comparisons are numeric and strictly
//! greater-than, so replaying the same event twice never re-emits it.
//!
//! Policy for malformed values is deliberately asymmetric:
//! - a candidate that does not parse is still *eligible* (fail open, the
//!   message is not lost) but never *advances* the cursor;
//! - a stored value that does not parse makes everything eligible, and the
//!   next successful advance overwrites it, healing the file.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::types::EventTs;

use super::{fsync, StateError};

/// Durable high-water mark over event timestamps.
#[derive(Debug)]
pub struct WatermarkStore {
    path: PathBuf,
    current: Mutex<EventTs>,
}

impl WatermarkStore {
    /// Opens the store, reading any persisted value.
    ///
    /// A missing or empty file means "nothing emitted yet" and loads as
    /// `"0"`. Any other read failure is surfaced: starting with an
    /// unreadable watermark would replay the full history downstream.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let raw = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        let trimmed = raw.trim();
        let current = if trimmed.is_empty() {
            EventTs::zero()
        } else {
            EventTs::new(trimmed)
        };
        Ok(WatermarkStore {
            path,
            current: Mutex::new(current),
        })
    }

    /// The current watermark value.
    pub fn current(&self) -> EventTs {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether an event with this timestamp is new enough to emit.
    ///
    /// Strictly greater than the stored value; if either side does not
    /// parse as a number, the event is eligible.
    pub fn is_eligible(&self, ts: &EventTs) -> bool {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match (ts.numeric(), current.numeric()) {
            (Some(candidate), Some(stored)) => candidate > stored,
            _ => true,
        }
    }

    /// Moves the watermark forward to `ts` if it is numerically newer.
    ///
    /// Returns whether the cursor moved. A candidate that does not parse
    /// is ignored, so the file only ever holds values this store can order
    /// on the next run.
    ///
    /// The in-memory cursor advances before the file write: on a
    /// persistence error the run keeps deduplicating correctly and the
    /// error is returned for the caller to log. The next restart replays
    /// from the last persisted value, which duplicates rather than loses.
    pub fn advance(&self, ts: &EventTs) -> Result<bool, StateError> {
        let Some(candidate) = ts.numeric() else {
            return Ok(false);
        };
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        // An unparseable stored value loses to any real candidate.
        let floor = current.numeric().unwrap_or(f64::NEG_INFINITY);
        // Written as `!(>)` rather than `<=`: a NaN candidate compares
        // false both ways and must not reach the update below.
        #[allow(clippy::neg_cmp_op_on_partial_ord)]
        if !(candidate > floor) {
            return Ok(false);
        }
        *current = ts.clone();
        fsync::write_atomic(&self.path, ts.as_str().as_bytes())?;
        Ok(true)
    }
}
