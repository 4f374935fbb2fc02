pub mod controller;
pub mod event_log;
pub mod report;

use log::debug;

use commwatch_shared::{LogicalClock, Rank, Source, Tick};

use controller::{DeadlockController, DeadlockFlag, PruneHorizon};
use event_log::RootEventLog;
use report::DeadlockReport;

/// Everything only the root process keeps: the event log, the controller
/// reading it, and the report the controller's flags go to
pub struct RootMonitor {
    log: RootEventLog,
    controller: DeadlockController,
    report: DeadlockReport,
    prune_interval: usize,
    receives_since_prune: usize,
}

impl RootMonitor {
    pub fn new(root: Rank, size: u32, report: DeadlockReport, prune_interval: usize) -> Self {
        Self {
            log: RootEventLog::new(),
            controller: DeadlockController::new(root, size),
            report,
            prune_interval,
            receives_since_prune: 0,
        }
    }

    /// Logs the receive, runs one controller step and periodically prunes
    pub fn on_receive(
        &mut self,
        clock: &mut LogicalClock,
        requested: Source,
        resolved: Rank,
        sender_clock: Tick,
    ) -> Tick {
        let tick = self.log.record(clock, requested);
        let flags = self.controller.step(&self.log, resolved, sender_clock, tick);
        self.report.write_flags(flags);

        self.receives_since_prune += 1;
        if self.prune_interval > 0 && self.receives_since_prune >= self.prune_interval {
            self.receives_since_prune = 0;
            self.prune();
        }
        tick
    }

    /// Prunes up to the controller's horizon, if there is one yet
    pub fn prune(&mut self) -> usize {
        match self.controller.min_pre_remove() {
            PruneHorizon::SafeUpTo(up_to) => self.log.prune(up_to),
            PruneHorizon::NotYetSafe => {
                debug!("root event log not prunable yet, {} events retained", self.log.len());
                0
            }
        }
    }

    /// Drains every expected peer's queue at the end of the run
    pub fn check_remaining(&mut self) -> Vec<DeadlockFlag> {
        let peers: Vec<Rank> = self.controller.expected_peers().collect();
        let mut raised = Vec::new();
        for peer in peers {
            let flags = self.controller.check_remain_queue(peer);
            self.report.write_flags(flags);
            raised.extend_from_slice(flags);
        }
        self.report.flush();
        raised
    }

    pub fn controller(&self) -> &DeadlockController {
        &self.controller
    }

    pub fn log(&self) -> &RootEventLog {
        &self.log
    }

    pub fn report_mut(&mut self) -> &mut DeadlockReport {
        &mut self.report
    }
}
