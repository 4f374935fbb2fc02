//! # Commwatch Shared
//! Common functionality shared between the commwatch-monitor &
//! commwatch-analyzer crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod clock;
mod envelope;
pub mod loop_log;
mod signature;
mod types;

pub use clock::LogicalClock;
pub use envelope::{Envelope, EnvelopeError, CLOCK_TRAILER_BYTES};
pub use loop_log::{parse_loops, read_loops, write_loop, LoopLogError};
pub use signature::{IterationGroup, Loop, Values};
pub use types::{Rank, Source, Tag, TagFilter, Tick};
