use std::collections::{btree_map::Entry, BTreeMap, VecDeque};

use log::warn;

use commwatch_shared::{Rank, Tick};

use super::event_log::{RootEvent, RootEventLog};

/// A root receive the controller believes a peer left unresolved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeadlockFlag {
    pub tick: Tick,
    pub peer: Rank,
}

/// How far the root event log may be pruned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PruneHorizon {
    /// Some expected peer has not been heard from yet
    NotYetSafe,
    /// Every event below this tick is no longer needed by any peer
    SafeUpTo(Tick),
}

/// Per-peer expectation state
#[derive(Debug, Default)]
struct Expectation {
    queue: VecDeque<RootEvent>,
    watermark: Option<Tick>,
    scanned_through: Tick,
    deadlock_count: u64,
}

impl Expectation {
    /// Appends every retained event in `(after, through]` that `peer` could
    /// have satisfied. Events at or below the last scanned tick are never
    /// enqueued twice.
    fn scan(&mut self, log: &RootEventLog, peer: Rank, after: Tick, through: Tick) {
        let after = after.max(self.scanned_through);
        self.queue.extend(
            log.range(after, through)
                .filter(|event| event.source.admits(peer))
                .copied(),
        );
        self.scanned_through = self.scanned_through.max(through);
    }

    fn pop_watermark(&mut self) {
        if let Some(event) = self.queue.pop_front() {
            debug_assert!(self.watermark.map_or(true, |mark| mark <= event.tick));
            self.watermark = Some(self.watermark.map_or(event.tick, |mark| mark.max(event.tick)));
        }
    }

    fn back(&self) -> Option<Tick> {
        self.queue.back().map(|event| event.tick)
    }
}

/// Heuristic deadlock detector driven by the root's receives.
///
/// Keeps, per peer, a FIFO of root receives that peer could still resolve.
/// Each message from a peer consumes one entry; a receive posted for exactly
/// that peer that is still queued once the peer's clock shows it has moved
/// past it is flagged.
pub struct DeadlockController {
    root: Rank,
    size: u32,
    peers: BTreeMap<Rank, Expectation>,
    flags: Vec<DeadlockFlag>,
}

impl DeadlockController {
    pub fn new(root: Rank, size: u32) -> Self {
        Self {
            root,
            size,
            peers: BTreeMap::new(),
            flags: Vec::new(),
        }
    }

    /// Processes the root receive logged at `tick`, satisfied by a message
    /// from `src` that carried `sender_clock`. Returns the flags it raised.
    pub fn step(
        &mut self,
        log: &RootEventLog,
        src: Rank,
        sender_clock: Tick,
        tick: Tick,
    ) -> &[DeadlockFlag] {
        let first_new = self.flags.len();
        let mut flagged: Vec<Tick> = Vec::new();

        match self.peers.entry(src) {
            Entry::Vacant(entry) => {
                let peer = entry.insert(Expectation::default());
                peer.scan(log, src, sender_clock, tick);
                peer.pop_watermark();
            }
            Entry::Occupied(entry) => {
                let peer = entry.into_mut();
                match peer.back() {
                    None => {
                        let after = peer.watermark.unwrap_or(0).max(sender_clock);
                        peer.scan(log, src, after, tick);
                        peer.pop_watermark();
                    }
                    Some(back) if sender_clock > back => {
                        // src has moved past everything root still expects of it
                        flagged.extend(
                            peer.queue
                                .drain(..)
                                .filter(|event| event.source.is_exactly(src))
                                .map(|event| event.tick),
                        );
                        let gap_from = back.max(peer.scanned_through);
                        flagged.extend(
                            log.range(gap_from, sender_clock)
                                .filter(|event| event.source.is_exactly(src))
                                .map(|event| event.tick),
                        );
                        peer.scanned_through = peer.scanned_through.max(sender_clock);
                        peer.scan(log, src, sender_clock, tick);
                        peer.pop_watermark();
                    }
                    Some(_) => {
                        while let Some(front) = peer.queue.front().copied() {
                            if front.tick > sender_clock {
                                break;
                            }
                            peer.queue.pop_front();
                            if front.source.is_exactly(src) {
                                flagged.push(front.tick);
                            }
                        }
                        let scanned_through = peer.scanned_through;
                        peer.scan(log, src, scanned_through, tick);
                        peer.pop_watermark();
                    }
                }
            }
        }

        self.raise(src, flagged);
        &self.flags[first_new..]
    }

    /// Drains what is left for `peer` at the end of the run. Every remaining
    /// receive posted for exactly `peer` is flagged.
    pub fn check_remain_queue(&mut self, peer: Rank) -> &[DeadlockFlag] {
        let first_new = self.flags.len();
        let flagged: Vec<Tick> = match self.peers.get_mut(&peer) {
            Some(expectation) => expectation
                .queue
                .drain(..)
                .filter(|event| event.source.is_exactly(peer))
                .map(|event| event.tick)
                .collect(),
            None => Vec::new(),
        };
        self.raise(peer, flagged);
        &self.flags[first_new..]
    }

    /// Lowest watermark across every expected peer
    pub fn min_pre_remove(&self) -> PruneHorizon {
        let mut lowest: Option<Tick> = None;
        for peer in self.expected_peers() {
            let Some(mark) = self.watermark(peer) else {
                return PruneHorizon::NotYetSafe;
            };
            lowest = Some(lowest.map_or(mark, |low| low.min(mark)));
        }
        lowest.map_or(PruneHorizon::NotYetSafe, PruneHorizon::SafeUpTo)
    }

    /// Every rank but the root
    pub fn expected_peers(&self) -> impl Iterator<Item = Rank> + '_ {
        (0..self.size).filter(move |rank| *rank != self.root)
    }

    pub fn watermark(&self, peer: Rank) -> Option<Tick> {
        self.peers.get(&peer).and_then(|expectation| expectation.watermark)
    }

    pub fn queue_len(&self, peer: Rank) -> usize {
        self.peers.get(&peer).map_or(0, |expectation| expectation.queue.len())
    }

    /// Ticks still queued for `peer`, oldest first
    pub fn queued_ticks(&self, peer: Rank) -> Vec<Tick> {
        self.peers.get(&peer).map_or_else(Vec::new, |expectation| {
            expectation.queue.iter().map(|event| event.tick).collect()
        })
    }

    pub fn deadlock_count(&self, peer: Rank) -> u64 {
        self.peers.get(&peer).map_or(0, |expectation| expectation.deadlock_count)
    }

    pub fn total_deadlocks(&self) -> u64 {
        self.flags.len() as u64
    }

    pub fn flags(&self) -> &[DeadlockFlag] {
        &self.flags
    }

    fn raise(&mut self, peer: Rank, ticks: Vec<Tick>) {
        if ticks.is_empty() {
            return;
        }
        if let Some(expectation) = self.peers.get_mut(&peer) {
            expectation.deadlock_count += ticks.len() as u64;
        }
        for tick in ticks {
            warn!("possible deadlock: root receive at tick {} was left unresolved by rank {}", tick, peer);
            self.flags.push(DeadlockFlag { tick, peer });
        }
    }
}
