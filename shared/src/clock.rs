use crate::Tick;

/// Scalar logical clock piggybacked on every point-to-point message.
///
/// On the root process the clock only moves through [`LogicalClock::advance`],
/// once per receive, so its value is always the newest root event tick. Every
/// other process only ever learns values that originated on the root, through
/// [`LogicalClock::observe`] and [`LogicalClock::merge`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogicalClock {
    value: Tick,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self { value: 0 }
    }

    pub fn value(&self) -> Tick {
        self.value
    }

    /// Increments the clock and returns the new value
    pub fn advance(&mut self) -> Tick {
        self.value += 1;
        self.value
    }

    /// `clock = max(clock, sender_clock)`
    pub fn observe(&mut self, sender_clock: Tick) {
        if sender_clock > self.value {
            self.value = sender_clock;
        }
    }

    /// Adopts the result of a group-wide max reduction
    pub fn merge(&mut self, group_max: Tick) {
        self.observe(group_max);
    }
}
