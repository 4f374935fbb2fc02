use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    time::Instant,
};

use log::{info, warn};

use commwatch_shared::{read_loops, Loop, Rank};

use crate::{
    leak::{analyze, LeakReport, SkippedRank},
    AnalyzerConfig, AnalyzerError,
};

/// Reads every process's loop log, aggregates it and writes the report
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Loads every readable log. Missing or malformed logs are skipped.
    pub fn load(&self) -> (Vec<(Rank, Vec<Loop>)>, Vec<SkippedRank>) {
        let mut inputs = Vec::new();
        let mut skipped = Vec::new();

        for rank in 0..self.config.processes {
            let path = self.config.log_path(rank);
            let loaded = File::open(&path)
                .map_err(|error| error.to_string())
                .and_then(|file| {
                    read_loops(BufReader::new(file)).map_err(|error| error.to_string())
                });
            match loaded {
                Ok(loops) => inputs.push((rank, loops)),
                Err(reason) => {
                    warn!("skipping rank {} ({}): {}", rank, path.display(), reason);
                    skipped.push(SkippedRank { rank, reason });
                }
            }
        }

        (inputs, skipped)
    }

    /// Builds the report without writing it
    pub fn analyze(&self) -> Result<LeakReport, AnalyzerError> {
        let started = Instant::now();
        let (inputs, mut skipped) = self.load();
        let aggregate = analyze(&inputs);
        // nothing read, or everything read was rejected
        if aggregate.rejected.len() == inputs.len() {
            return Err(AnalyzerError::NoInput {
                processes: self.config.processes,
                dir: self.config.dir.clone(),
            });
        }

        skipped.extend(aggregate.rejected);
        skipped.sort_by_key(|skipped| skipped.rank);
        Ok(LeakReport {
            processes: self.config.processes,
            loops: aggregate.loops,
            skipped,
            elapsed: started.elapsed(),
        })
    }

    /// Analyzes and writes the report to the configured output file
    pub fn run(&self) -> Result<LeakReport, AnalyzerError> {
        let report = self.analyze()?;
        self.write(&report)?;

        for analysis in &report.loops {
            match analysis.first_leak() {
                Some(iteration) => warn!(
                    "loop [{}]: message leaks from iteration {}",
                    analysis.index, iteration
                ),
                None => info!(
                    "loop [{}]: {} iterations, no leaks",
                    analysis.index,
                    analysis.iterations.len()
                ),
            }
        }
        info!("leak report written to {}", self.config.output.display());
        Ok(report)
    }

    pub fn write(&self, report: &LeakReport) -> Result<(), AnalyzerError> {
        let path = &self.config.output;
        let io_error = |error: std::io::Error| AnalyzerError::Io {
            path: path.clone(),
            reason: error.to_string(),
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
        write!(writer, "{}", report).map_err(io_error)?;
        writer.flush().map_err(io_error)
    }
}
