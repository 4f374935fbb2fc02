use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while bracketing monitored loops
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// `end_iter` or `end_for` was called without a matching `begin_for`
    #[error("No monitored loop is open. Call begin_for() before bracketing iterations")]
    NoOpenLoop,

    /// `end_iter` was called without a matching `begin_iter`
    #[error("No iteration is open. Call begin_iter() before end_iter()")]
    NoOpenIteration,

    /// The per-process loop log could not be written
    #[error("Failed to write loop log {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },
}
