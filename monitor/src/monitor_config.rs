use std::{default::Default, path::PathBuf};

use commwatch_shared::Rank;

/// Contains Config properties which will be used by the Monitor
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// The process that owns the root event log and runs deadlock detection
    pub root: Rank,
    /// Whether instrumentation starts switched on. Toggled afterwards with
    /// `beginning()` / `ending()`
    pub enabled: bool,
    /// Directory that receives one loop signature log per rank
    pub log_dir: PathBuf,
    /// Where the root writes one line per flagged deadlock
    pub report_path: PathBuf,
    /// Number of root receives between two attempts to prune the root event log
    pub prune_interval: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            root: 0,
            enabled: true,
            log_dir: PathBuf::from("."),
            report_path: PathBuf::from("deadlock_report.txt"),
            prune_interval: 1024,
        }
    }
}
