use commwatch_shared::{Loop, Rank, Values};

use crate::error::{PatternError, SumOverflow};

/// Most iterations one loop may span
pub const MAX_ITERATIONS: usize = 1 << 20;
const MIN_ITERATION_BOUND: usize = 1024;
const ITERATION_SLACK: usize = 4;

/// Communication of every process during one iteration, summed up
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pattern {
    pub send_count: u64,
    pub recv_count: u64,
    pub source_sum: u64,
    pub dest_sum: u64,
    /// `send_count * rank` over every contributing process
    pub weighted_send: u64,
    /// `recv_count * rank` over every contributing process
    pub weighted_recv: u64,
    pub source_xor: u64,
    pub dest_xor: u64,
}

impl Pattern {
    /// Adds one process's signature for this iteration. On overflow `self`
    /// is left as it was.
    pub fn absorb(&mut self, values: &Values, rank: Rank) -> Result<(), SumOverflow> {
        let rank = u64::from(rank);
        let weighted = Pattern {
            send_count: values.send_count,
            recv_count: values.recv_count,
            source_sum: values.source_sum,
            dest_sum: values.dest_sum,
            weighted_send: values.send_count.checked_mul(rank).ok_or(SumOverflow)?,
            weighted_recv: values.recv_count.checked_mul(rank).ok_or(SumOverflow)?,
            source_xor: values.source_xor,
            dest_xor: values.dest_xor,
        };
        self.accumulate(&weighted)
    }

    /// Folds another pattern into this one. On overflow `self` is left as
    /// it was.
    pub fn accumulate(&mut self, other: &Pattern) -> Result<(), SumOverflow> {
        let add = |a: u64, b: u64| a.checked_add(b).ok_or(SumOverflow);
        *self = Pattern {
            send_count: add(self.send_count, other.send_count)?,
            recv_count: add(self.recv_count, other.recv_count)?,
            source_sum: add(self.source_sum, other.source_sum)?,
            dest_sum: add(self.dest_sum, other.dest_sum)?,
            weighted_send: add(self.weighted_send, other.weighted_send)?,
            weighted_recv: add(self.weighted_recv, other.weighted_recv)?,
            source_xor: self.source_xor ^ other.source_xor,
            dest_xor: self.dest_xor ^ other.dest_xor,
        };
        Ok(())
    }

    /// Every message sent has been received by the rank it was sent to
    pub fn is_balanced(&self) -> bool {
        self.send_count == self.recv_count
            && self.source_sum == self.weighted_send
            && self.dest_sum == self.weighted_recv
            && self.source_xor == self.dest_xor
    }
}

/// One [`Pattern`] per iteration of one loop
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopPatterns {
    pub index: u64,
    pub patterns: Vec<Pattern>,
    /// Iteration indices at or past this are rejected
    pub bound: usize,
}

impl LoopPatterns {
    /// Sized from the loop that defines the iteration count. Other logs may
    /// list iterations up to a few times past that count.
    pub fn with_shape(defining: &Loop) -> Result<Self, PatternError> {
        let count = defining.iteration_count();
        let shape = match usize::try_from(count) {
            Ok(shape) if shape <= MAX_ITERATIONS => shape,
            _ => {
                return Err(PatternError::IterationOutOfRange {
                    loop_index: defining.index,
                    iteration: count.saturating_sub(1),
                    bound: MAX_ITERATIONS,
                })
            }
        };
        Ok(Self {
            index: defining.index,
            patterns: vec![Pattern::default(); shape],
            bound: shape
                .saturating_mul(ITERATION_SLACK)
                .clamp(MIN_ITERATION_BOUND, MAX_ITERATIONS),
        })
    }

    /// Adds every group of `lp` into each iteration it lists. Stops at the
    /// first out-of-range iteration or overflowing sum; groups absorbed
    /// before that stay absorbed.
    pub fn absorb(&mut self, lp: &Loop, rank: Rank) -> Result<(), PatternError> {
        for group in &lp.groups {
            for &iteration in &group.iterations {
                let slot = match usize::try_from(iteration) {
                    Ok(slot) if slot < self.bound => slot,
                    _ => {
                        return Err(PatternError::IterationOutOfRange {
                            loop_index: self.index,
                            iteration,
                            bound: self.bound,
                        })
                    }
                };
                if slot >= self.patterns.len() {
                    self.patterns.resize(slot + 1, Pattern::default());
                }
                self.patterns[slot]
                    .absorb(&group.values, rank)
                    .map_err(|_| PatternError::Overflow {
                        loop_index: self.index,
                        iteration,
                    })?;
            }
        }
        Ok(())
    }
}
