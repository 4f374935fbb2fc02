use std::{io::Write, time::Instant};

use log::{error, info, warn};

use commwatch_shared::{Envelope, EnvelopeError, Loop, LogicalClock, Rank, Source, Tag, TagFilter};

use crate::{
    root::{report::DeadlockReport, RootMonitor},
    summary::{peak_memory_kb, FinalSummary},
    transport::{Communicator, ReduceOp, Status},
    IterationTracker, MonitorConfig,
};

/// Per-process instrumentation context wrapping the real message-passing
/// library.
///
/// Created by [`Monitor::init`] and consumed by [`Monitor::finalize`]. Every
/// wrapped call returns exactly what the underlying [`Communicator`] returned;
/// the bookkeeping runs strictly before or after the delegated call.
pub struct Monitor<C: Communicator> {
    comm: C,
    config: MonitorConfig,
    rank: Rank,
    size: u32,
    enabled: bool,
    clock: LogicalClock,
    root: Option<RootMonitor>,
    tracker: IterationTracker,
    started: Instant,
}

impl<C: Communicator> Monitor<C> {
    /// Initializes the underlying library and sets up this process's context.
    /// The root opens its deadlock report at `config.report_path`.
    pub fn init(comm: C, config: MonitorConfig) -> Result<Self, C::Error> {
        let report_path = config.report_path.clone();
        Self::init_with(comm, config, move || DeadlockReport::create(&report_path))
    }

    /// Like [`Monitor::init`], with the root's deadlock report going to `sink`
    pub fn init_with_report_sink(
        comm: C,
        config: MonitorConfig,
        sink: Box<dyn Write + Send>,
    ) -> Result<Self, C::Error> {
        Self::init_with(comm, config, move || DeadlockReport::from_writer(sink))
    }

    fn init_with<F: FnOnce() -> DeadlockReport>(
        mut comm: C,
        config: MonitorConfig,
        open_report: F,
    ) -> Result<Self, C::Error> {
        comm.init()?;

        let rank = comm.rank();
        let size = comm.size();
        let root = if rank == config.root {
            info!("rank {} is root of {} processes, deadlock detection active", rank, size);
            Some(RootMonitor::new(
                config.root,
                size,
                open_report(),
                config.prune_interval,
            ))
        } else {
            None
        };

        Ok(Self {
            comm,
            rank,
            size,
            enabled: config.enabled,
            clock: LogicalClock::new(),
            root,
            tracker: IterationTracker::new(config.log_dir.clone()),
            started: Instant::now(),
            config,
        })
    }

    // Instrumentation toggle

    /// Switches instrumentation on
    pub fn beginning(&mut self) {
        self.enabled = true;
    }

    /// Switches instrumentation off; every wrapper becomes a pass-through
    pub fn ending(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // Point-to-point

    pub fn send(&mut self, payload: &[u8], dest: Rank, tag: Tag) -> Result<(), C::Error> {
        if !self.enabled {
            return self.comm.send(payload, dest, tag);
        }

        let envelope = match Envelope::encode(payload, self.clock.value()) {
            Ok(bytes) => bytes,
            Err(EnvelopeError::Allocation { requested }) => {
                error!(
                    "rank {}: cannot allocate a {}-byte envelope, aborting",
                    self.rank, requested
                );
                std::process::abort();
            }
            Err(other) => {
                error!("rank {}: cannot build envelope: {}, aborting", self.rank, other);
                std::process::abort();
            }
        };

        self.comm.send(&envelope, dest, tag)?;
        self.tracker.record_send(dest);
        Ok(())
    }

    pub fn receive(
        &mut self,
        source: Source,
        tag: TagFilter,
    ) -> Result<(Vec<u8>, Status), C::Error> {
        if !self.enabled {
            return self.comm.receive(source, tag);
        }

        let (bytes, mut status) = self.comm.receive(source, tag)?;
        self.tracker.record_receive(status.source);

        let (payload, sender_clock) = match Envelope::split(&bytes) {
            Ok((payload, sender_clock)) => (payload.to_vec(), sender_clock),
            Err(error) => {
                warn!(
                    "rank {}: message from rank {} carries no clock ({}), passing it through",
                    self.rank, status.source, error
                );
                return Ok((bytes, status));
            }
        };
        status.len = payload.len();

        match self.root.as_mut() {
            Some(root) => {
                root.on_receive(&mut self.clock, source, status.source, sender_clock);
            }
            None => self.clock.observe(sender_clock),
        }

        Ok((payload, status))
    }

    // Collectives

    pub fn broadcast(&mut self, buffer: &mut Vec<u8>, root: Rank) -> Result<(), C::Error> {
        self.comm.broadcast(buffer, root)?;
        self.sync_clock()
    }

    pub fn reduce(
        &mut self,
        values: &[i64],
        op: ReduceOp,
        root: Rank,
    ) -> Result<Option<Vec<i64>>, C::Error> {
        let reduced = self.comm.reduce(values, op, root)?;
        self.sync_clock()?;
        Ok(reduced)
    }

    pub fn barrier(&mut self) -> Result<(), C::Error> {
        self.comm.barrier()?;
        self.sync_clock()
    }

    /// `clock = max(clock)` over the whole group
    fn sync_clock(&mut self) -> Result<(), C::Error> {
        if !self.enabled {
            return Ok(());
        }
        let group_max = self.comm.all_reduce_max(self.clock.value())?;
        self.clock.merge(group_max);
        Ok(())
    }

    // Loop bracketing

    pub fn begin_for(&mut self) {
        self.tracker.begin_for();
    }

    pub fn begin_iter(&mut self) {
        self.tracker.begin_iter();
    }

    pub fn end_iter(&mut self, iteration: u64) {
        if let Err(error) = self.tracker.end_iter(iteration, self.rank) {
            warn!("rank {}: end_iter({}) ignored: {}", self.rank, iteration, error);
        }
    }

    /// Closes the open loop and appends its signatures to this rank's log
    pub fn end_for(&mut self, loop_index: u64, wall_seconds: Option<f64>) -> Option<Loop> {
        match self.tracker.end_for(loop_index, wall_seconds, self.rank) {
            Ok(finished) => Some(finished),
            Err(error) => {
                warn!("rank {}: end_for({}) ignored: {}", self.rank, loop_index, error);
                None
            }
        }
    }

    // Accessors

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_root(&self) -> bool {
        self.root.is_some()
    }

    pub fn clock(&self) -> &LogicalClock {
        &self.clock
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Root-only state, `None` on every other process
    pub fn root_monitor(&self) -> Option<&RootMonitor> {
        self.root.as_ref()
    }

    pub fn tracker(&self) -> &IterationTracker {
        &self.tracker
    }

    pub fn communicator(&self) -> &C {
        &self.comm
    }

    // Lifecycle

    /// Waits for the whole group, drains the root's queues, logs a summary and
    /// finalizes the underlying library
    pub fn finalize(mut self) -> Result<FinalSummary, C::Error> {
        if self.enabled {
            self.comm.barrier()?;
        }

        let mut summary = FinalSummary {
            rank: self.rank,
            is_root: self.root.is_some(),
            deadlock_counts: Vec::new(),
            flags: Vec::new(),
            peak_memory_kb: peak_memory_kb(),
            wall_time: self.started.elapsed(),
        };

        if let Some(root) = self.root.as_mut() {
            root.check_remaining();
            let controller = root.controller();
            summary.deadlock_counts = controller
                .expected_peers()
                .map(|peer| (peer, controller.deadlock_count(peer)))
                .collect();
            summary.flags = controller.flags().to_vec();
            root.report_mut().flush();
        }

        for line in summary.to_string().lines() {
            info!("{}", line);
        }

        self.comm.finalize()?;
        Ok(summary)
    }
}
