use std::collections::VecDeque;

use log::debug;

use commwatch_shared::{LogicalClock, Source, Tick};

/// One receive completed on the root
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootEvent {
    pub tick: Tick,
    /// The source the receive was posted for
    pub source: Source,
}

/// Append-only, prunable sequence of root receive events, ordered by tick.
///
/// Pruned events are gone for good; the remaining ones stay addressable by
/// tick through binary search over the retained window.
pub struct RootEventLog {
    events: VecDeque<RootEvent>,
    pruned: usize,
}

impl RootEventLog {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
            pruned: 0,
        }
    }

    /// `tick = ++clock`, then logs the receive under that tick
    pub fn record(&mut self, clock: &mut LogicalClock, source: Source) -> Tick {
        let tick = clock.advance();
        // the clock only ever advances here on the root, so ticks stay ordered
        debug_assert!(self.newest().map_or(true, |newest| newest < tick));
        self.events.push_back(RootEvent { tick, source });
        tick
    }

    pub fn newest(&self) -> Option<Tick> {
        self.events.back().map(|event| event.tick)
    }

    pub fn oldest(&self) -> Option<Tick> {
        self.events.front().map(|event| event.tick)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total number of events discarded by [`RootEventLog::prune`]
    pub fn pruned(&self) -> usize {
        self.pruned
    }

    pub fn get(&self, tick: Tick) -> Option<&RootEvent> {
        let index = self.events.partition_point(|event| event.tick < tick);
        self.events.get(index).filter(|event| event.tick == tick)
    }

    /// Retained events with `after < tick <= through`, in tick order
    pub fn range(&self, after: Tick, through: Tick) -> impl Iterator<Item = &RootEvent> + '_ {
        let start = self.events.partition_point(|event| event.tick <= after);
        self.events
            .range(start..)
            .take_while(move |event| event.tick <= through)
    }

    /// Discards every event with `tick < up_to` and returns how many went
    pub fn prune(&mut self, up_to: Tick) -> usize {
        let count = self.events.partition_point(|event| event.tick < up_to);
        if count > 0 {
            self.events.drain(..count);
            self.pruned += count;
            debug!(
                "pruned {} root events below tick {} ({} retained)",
                count,
                up_to,
                self.events.len()
            );
        }
        count
    }
}

impl Default for RootEventLog {
    fn default() -> Self {
        Self::new()
    }
}
