use std::{fmt, time::Duration};

use commwatch_shared::Rank;

use crate::DeadlockFlag;

/// What a process reports when it finalizes
#[derive(Clone, Debug, PartialEq)]
pub struct FinalSummary {
    pub rank: Rank,
    pub is_root: bool,
    /// Flag count per expected peer, root only
    pub deadlock_counts: Vec<(Rank, u64)>,
    /// Every flag raised during the run, root only
    pub flags: Vec<DeadlockFlag>,
    pub peak_memory_kb: Option<u64>,
    pub wall_time: Duration,
}

impl FinalSummary {
    pub fn total_deadlocks(&self) -> u64 {
        self.deadlock_counts.iter().map(|(_, count)| count).sum()
    }
}

impl fmt::Display for FinalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rank {} summary", self.rank)?;
        if self.is_root {
            writeln!(f, "  deadlocks: {}", self.total_deadlocks())?;
            for (peer, count) in &self.deadlock_counts {
                writeln!(f, "    rank {}: {}", peer, count)?;
            }
        }
        match self.peak_memory_kb {
            Some(kb) => writeln!(f, "  peak memory: {} kB", kb)?,
            None => writeln!(f, "  peak memory: unavailable")?,
        }
        write!(f, "  wall time: {:.3} s", self.wall_time.as_secs_f64())
    }
}

cfg_if! {
    if #[cfg(target_os = "linux")]
    {
        /// Peak resident set size of this process, in kB
        pub fn peak_memory_kb() -> Option<u64> {
            let status = std::fs::read_to_string("/proc/self/status").ok()?;
            status
                .lines()
                .find_map(|line| line.strip_prefix("VmHWM:"))
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|kb| kb.parse::<u64>().ok())
        }
    }
    else
    {
        /// Peak resident set size is only probed on Linux
        pub fn peak_memory_kb() -> Option<u64> {
            None
        }
    }
}
