use crate::Rank;

/// Communication fingerprint of one process during one loop iteration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Values {
    pub send_count: u64,
    pub recv_count: u64,
    pub source_sum: u64,
    pub dest_sum: u64,
    pub source_xor: u64,
    pub dest_xor: u64,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send(&mut self, dest: Rank) {
        self.send_count += 1;
        self.dest_sum += u64::from(dest);
        self.dest_xor ^= u64::from(dest);
    }

    pub fn record_receive(&mut self, source: Rank) {
        self.recv_count += 1;
        self.source_sum += u64::from(source);
        self.source_xor ^= u64::from(source);
    }

    /// Folds the owning rank into both XOR fields, once per message.
    ///
    /// After sealing, every message `s -> d` has contributed `s ^ d` to the
    /// sender's `dest_xor` and the same `s ^ d` to the receiver's
    /// `source_xor`.
    pub fn sealed(mut self, rank: Rank) -> Self {
        let rank = u64::from(rank);
        if self.send_count % 2 == 1 {
            self.dest_xor ^= rank;
        }
        if self.recv_count % 2 == 1 {
            self.source_xor ^= rank;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.send_count == 0 && self.recv_count == 0
    }
}

/// A `Values` signature and every iteration index that produced it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IterationGroup {
    pub values: Values,
    pub iterations: Vec<u64>,
}

impl IterationGroup {
    pub fn new(values: Values, first_iteration: u64) -> Self {
        Self {
            values,
            iterations: vec![first_iteration],
        }
    }
}

/// Every distinct signature one process produced within one monitored loop,
/// in order of first appearance
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Loop {
    pub index: u64,
    pub groups: Vec<IterationGroup>,
    pub wall_seconds: Option<f64>,
}

impl Loop {
    pub fn new(index: u64) -> Self {
        Self {
            index,
            groups: Vec::new(),
            wall_seconds: None,
        }
    }

    /// Files `iteration` under the first group whose signature equals
    /// `values`, or opens a new group at the end.
    pub fn record(&mut self, iteration: u64, values: Values) {
        match self.groups.iter_mut().find(|group| group.values == values) {
            Some(group) => group.iterations.push(iteration),
            None => self.groups.push(IterationGroup::new(values, iteration)),
        }
    }

    /// One past the largest iteration index recorded in this loop
    pub fn iteration_count(&self) -> u64 {
        self.groups
            .iter()
            .flat_map(|group| group.iterations.iter())
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }
}
