use std::fmt::Debug;

use commwatch_shared::{Rank, Source, Tag, TagFilter};

/// Completion information for a receive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
    /// The rank the message actually came from
    pub source: Rank,
    pub tag: Tag,
    /// Payload length in bytes
    pub len: usize,
}

/// Element-wise reduction applied by [`Communicator::reduce`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
}

impl ReduceOp {
    pub fn apply(&self, a: i64, b: i64) -> i64 {
        match self {
            ReduceOp::Sum => a.wrapping_add(b),
            ReduceOp::Max => a.max(b),
            ReduceOp::Min => a.min(b),
        }
    }
}

/// The underlying message-passing library.
///
/// Every call blocks exactly as the real library does; the [`crate::Monitor`]
/// wraps an implementation and hands its errors back untouched.
pub trait Communicator {
    type Error: Debug;

    fn init(&mut self) -> Result<(), Self::Error>;

    /// This process's rank within the group
    fn rank(&self) -> Rank;

    /// Number of processes in the group
    fn size(&self) -> u32;

    /// Sends one opaque message
    fn send(&mut self, payload: &[u8], dest: Rank, tag: Tag) -> Result<(), Self::Error>;

    /// Blocks until a message matching `source` and `tag` arrives
    fn receive(
        &mut self,
        source: Source,
        tag: TagFilter,
    ) -> Result<(Vec<u8>, Status), Self::Error>;

    /// Replaces `buffer` on every non-root process with the root's contents
    fn broadcast(&mut self, buffer: &mut Vec<u8>, root: Rank) -> Result<(), Self::Error>;

    /// Reduces `values` element-wise onto `root`; only the root gets `Some`
    fn reduce(
        &mut self,
        values: &[i64],
        op: ReduceOp,
        root: Rank,
    ) -> Result<Option<Vec<i64>>, Self::Error>;

    fn barrier(&mut self) -> Result<(), Self::Error>;

    /// Group-wide maximum of `value`, delivered to every process
    fn all_reduce_max(&mut self, value: u64) -> Result<u64, Self::Error>;

    fn finalize(&mut self) -> Result<(), Self::Error>;
}
