use std::{default::Default, path::PathBuf};

/// Contains Config properties which will be used by the Analyzer
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    /// Number of processes whose logs are expected, named `0..processes`
    pub processes: u32,
    /// Directory holding the per-process loop logs
    pub dir: PathBuf,
    /// Where the consolidated leak report is written
    pub output: PathBuf,
}

impl AnalyzerConfig {
    pub fn new(processes: u32) -> Self {
        Self {
            processes,
            ..Self::default()
        }
    }

    pub fn log_path(&self, rank: u32) -> PathBuf {
        self.dir.join(rank.to_string())
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            processes: 1,
            dir: PathBuf::from("."),
            output: PathBuf::from("leak_report.txt"),
        }
    }
}
