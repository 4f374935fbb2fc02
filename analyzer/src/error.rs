use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop the offline analyzer from producing a report at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyzerError {
    /// None of the per-process logs could be read
    #[error("No loop log could be read for any of the {processes} processes in {dir:?}")]
    NoInput { processes: u32, dir: PathBuf },

    /// The consolidated report could not be written
    #[error("Failed to write leak report {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },
}

/// A signature sum no longer fits in 64 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("signature sums overflow 64 bits")]
pub struct SumOverflow;

/// Errors that reject one process's loop log from the aggregate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// Adding this process's signature overflows an iteration's sums
    #[error("Signature sums of loop [{loop_index}] overflow at iteration {iteration}")]
    Overflow { loop_index: u64, iteration: u64 },

    /// An iteration index too far past the defining log's iteration count
    #[error("Loop [{loop_index}] lists iteration {iteration}, but at most {bound} iterations are accepted")]
    IterationOutOfRange {
        loop_index: u64,
        iteration: u64,
        bound: usize,
    },
}
