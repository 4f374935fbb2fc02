//! # Commwatch Monitor
//! An interception layer that sits between a message-passing program and its
//! communication library. Every point-to-point message carries the sender's
//! logical clock; the root process logs its receives and runs a heuristic
//! deadlock detector over them, while every process records per-iteration
//! communication signatures for offline leak analysis.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub mod root;
pub mod shared {
    pub use commwatch_shared::{
        Envelope, EnvelopeError, IterationGroup, LogicalClock, Loop, Rank, Source, Tag, TagFilter,
        Tick, Values,
    };
}

mod error;
mod monitor;
mod monitor_config;
mod summary;
mod tracker;
mod transport;

pub use error::TrackerError;
pub use monitor::Monitor;
pub use monitor_config::MonitorConfig;
pub use root::{
    controller::{DeadlockController, DeadlockFlag, PruneHorizon},
    event_log::{RootEvent, RootEventLog},
    report::DeadlockReport,
    RootMonitor,
};
pub use summary::{peak_memory_kb, FinalSummary};
pub use tracker::IterationTracker;
pub use transport::{Communicator, ReduceOp, Status};
