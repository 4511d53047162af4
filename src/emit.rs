//! The output seam: one JSON object per line.
//!
//! Stdout is the relay's entire downstream interface, so nothing else in
//! the process may print there (diagnostics go to stderr). Writes are
//! serialized through a mutex and flushed per message; a consumer reading
//! the pipe sees each message exactly when it was accepted, never half of
//! one interleaved with another.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::types::CleanMessage;

/// Errors raised while emitting a message.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("serializing message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("writing message: {0}")]
    Io(#[from] io::Error),
}

/// Writes clean messages as JSON lines, one per emission.
///
/// The writer is injectable so tests can capture output; production code
/// uses [`Emitter::stdout`].
pub struct Emitter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Emitter {
    /// An emitter bound to the process's stdout.
    pub fn stdout() -> Self {
        Emitter::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Emitter {
            writer: Mutex::new(writer),
        }
    }

    /// Serializes `message` and writes it as a single flushed line.
    pub fn emit(&self, message: &CleanMessage) -> Result<(), EmitError> {
        let line = serde_json::to_string(message)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}
