use std::{fmt, time::Duration};

use log::warn;

use commwatch_shared::{Loop, Rank};

use crate::{
    error::PatternError,
    pattern::{LoopPatterns, Pattern},
};

/// Outcome of the conservation check for one iteration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    NoLeaks,
    MessageLeaks,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::NoLeaks => write!(f, "No Leaks"),
            Verdict::MessageLeaks => write!(f, "Message Leaks"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IterationVerdict {
    pub iteration: u64,
    /// This iteration's own aggregates, not the running total
    pub pattern: Pattern,
    pub verdict: Verdict,
}

/// Verdicts for every iteration of one loop, in iteration order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopAnalysis {
    pub index: u64,
    pub iterations: Vec<IterationVerdict>,
}

impl LoopAnalysis {
    /// Runs the conservation check over a never-reset running total. Once
    /// a prefix fails, every later iteration is reported as leaking.
    pub fn check(patterns: &LoopPatterns) -> Self {
        let mut running = Pattern::default();
        let mut leaking = false;
        let mut iterations = Vec::with_capacity(patterns.patterns.len());

        for (iteration, pattern) in (0u64..).zip(patterns.patterns.iter()) {
            // totals past 64 bits cannot be shown to balance
            let balanced = running.accumulate(pattern).is_ok() && running.is_balanced();
            leaking = leaking || !balanced;
            iterations.push(IterationVerdict {
                iteration,
                pattern: *pattern,
                verdict: if leaking {
                    Verdict::MessageLeaks
                } else {
                    Verdict::NoLeaks
                },
            });
        }

        Self {
            index: patterns.index,
            iterations,
        }
    }

    /// First iteration reported as leaking
    pub fn first_leak(&self) -> Option<u64> {
        self.iterations
            .iter()
            .find(|iteration| iteration.verdict == Verdict::MessageLeaks)
            .map(|iteration| iteration.iteration)
    }

    pub fn is_clean(&self) -> bool {
        self.first_leak().is_none()
    }
}

/// A process whose log contributed nothing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedRank {
    pub rank: Rank,
    pub reason: String,
}

/// Everything the analyzer found
#[derive(Clone, Debug, PartialEq)]
pub struct LeakReport {
    pub processes: u32,
    pub loops: Vec<LoopAnalysis>,
    pub skipped: Vec<SkippedRank>,
    pub elapsed: Duration,
}

impl LeakReport {
    pub fn has_leaks(&self) -> bool {
        self.loops.iter().any(|analysis| !analysis.is_clean())
    }

    pub fn skipped_ranks(&self) -> Vec<Rank> {
        self.skipped.iter().map(|skipped| skipped.rank).collect()
    }
}

/// Outcome of [`analyze`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub loops: Vec<LoopAnalysis>,
    /// Processes whose logs parsed but could not be aggregated
    pub rejected: Vec<SkippedRank>,
}

/// Aggregates every process's loops and checks each one.
///
/// `inputs` is ordered by rank; the first entry that can be aggregated
/// defines loop boundaries and iteration counts. Loops are matched by their
/// position in each log. A process whose log lists out-of-range iterations
/// or overflows a sum contributes nothing and is listed in `rejected`.
pub fn analyze(inputs: &[(Rank, Vec<Loop>)]) -> Aggregate {
    let mut defined: Option<(Rank, Vec<LoopPatterns>)> = None;
    let mut rejected = Vec::new();

    for (rank, loops) in inputs {
        let staged = match &defined {
            Some((defining_rank, per_loop)) => {
                absorb_rank(per_loop.clone(), *rank, loops, *defining_rank)
            }
            None => loops
                .iter()
                .map(LoopPatterns::with_shape)
                .collect::<Result<Vec<_>, _>>()
                .and_then(|per_loop| absorb_rank(per_loop, *rank, loops, *rank)),
        };
        match staged {
            Ok(per_loop) => {
                let defining_rank = defined.as_ref().map_or(*rank, |(defining, _)| *defining);
                defined = Some((defining_rank, per_loop));
            }
            Err(error) => {
                warn!("leaving rank {} out of the aggregate: {}", rank, error);
                rejected.push(SkippedRank {
                    rank: *rank,
                    reason: error.to_string(),
                });
            }
        }
    }

    let loops = defined
        .map(|(_, per_loop)| per_loop.iter().map(LoopAnalysis::check).collect())
        .unwrap_or_default();
    Aggregate { loops, rejected }
}

/// Adds one process's loops into a copy of the aggregate, so a rejected
/// process leaves no partial contribution behind
fn absorb_rank(
    mut per_loop: Vec<LoopPatterns>,
    rank: Rank,
    loops: &[Loop],
    defining_rank: Rank,
) -> Result<Vec<LoopPatterns>, PatternError> {
    if loops.len() > per_loop.len() {
        warn!(
            "rank {} logged {} loops, rank {} only {}: ignoring the extra ones",
            rank,
            loops.len(),
            defining_rank,
            per_loop.len()
        );
    }
    for (patterns, lp) in per_loop.iter_mut().zip(loops.iter()) {
        if lp.index != patterns.index {
            warn!(
                "rank {} logged loop [{}] where rank {} logged [{}]",
                rank, lp.index, defining_rank, patterns.index
            );
        }
        patterns.absorb(lp, rank)?;
    }
    Ok(per_loop)
}
