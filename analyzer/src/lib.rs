//! # Commwatch Analyzer
//! Offline leak analysis over the per-process loop signature logs written by
//! commwatch-monitor. Sums every process's signature per iteration and checks
//! that sends and receives balance.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod analyzer;
mod analyzer_config;
mod error;
mod leak;
mod pattern;
mod report;

pub use analyzer::Analyzer;
pub use analyzer_config::AnalyzerConfig;
pub use error::{AnalyzerError, PatternError, SumOverflow};
pub use leak::{analyze, Aggregate, IterationVerdict, LeakReport, LoopAnalysis, SkippedRank, Verdict};
pub use pattern::{LoopPatterns, Pattern, MAX_ITERATIONS};
