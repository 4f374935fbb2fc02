use std::{
    fs::OpenOptions,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::debug;

use commwatch_shared::{write_loop, Loop, Rank, Values};

use crate::TrackerError;

/// Builds one process's loop signatures, one iteration at a time
pub struct IterationTracker {
    log_dir: PathBuf,
    current_loop: Option<Loop>,
    in_flight: Option<Values>,
}

impl IterationTracker {
    pub fn new<P: Into<PathBuf>>(log_dir: P) -> Self {
        Self {
            log_dir: log_dir.into(),
            current_loop: None,
            in_flight: None,
        }
    }

    /// Path of the log file for `rank`: the rank number, inside the log directory
    pub fn log_path(&self, rank: Rank) -> PathBuf {
        self.log_dir.join(rank.to_string())
    }

    pub fn is_in_loop(&self) -> bool {
        self.current_loop.is_some()
    }

    pub fn is_in_iteration(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn current_loop(&self) -> Option<&Loop> {
        self.current_loop.as_ref()
    }

    pub fn begin_for(&mut self) {
        if self.current_loop.is_some() {
            debug!("begin_for() while a loop is open, discarding it");
        }
        self.current_loop = Some(Loop::default());
        self.in_flight = None;
    }

    pub fn begin_iter(&mut self) {
        self.in_flight = Some(Values::new());
    }

    pub fn record_send(&mut self, dest: Rank) {
        if let Some(values) = self.in_flight.as_mut() {
            values.record_send(dest);
        }
    }

    pub fn record_receive(&mut self, source: Rank) {
        if let Some(values) = self.in_flight.as_mut() {
            values.record_receive(source);
        }
    }

    pub fn end_iter(&mut self, iteration: u64, rank: Rank) -> Result<(), TrackerError> {
        let values = self.in_flight.take().ok_or(TrackerError::NoOpenIteration)?;
        let current = self.current_loop.as_mut().ok_or(TrackerError::NoOpenLoop)?;
        current.record(iteration, values.sealed(rank));
        Ok(())
    }

    /// Closes the open loop and appends it to `rank`'s log file
    pub fn end_for(
        &mut self,
        loop_index: u64,
        wall_seconds: Option<f64>,
        rank: Rank,
    ) -> Result<Loop, TrackerError> {
        let mut finished = self.current_loop.take().ok_or(TrackerError::NoOpenLoop)?;
        self.in_flight = None;
        finished.index = loop_index;
        finished.wall_seconds = wall_seconds;

        let path = self.log_path(rank);
        append_loop(&path, &finished).map_err(|error| TrackerError::Io {
            path: path.clone(),
            reason: error.to_string(),
        })?;
        debug!(
            "loop {} on rank {}: {} signature groups written to {}",
            loop_index,
            rank,
            finished.groups.len(),
            path.display()
        );
        Ok(finished)
    }
}

fn append_loop(path: &Path, finished: &Loop) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    write_loop(&mut writer, finished)?;
    writer.flush()
}
