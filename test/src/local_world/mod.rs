//! In-memory communicator for end-to-end testing.
//! Runs every rank on its own thread and routes messages through shared
//! mailboxes without any network I/O.


pub use error::LocalCommError;

use std::{
    collections::VecDeque,
    panic,
    sync::{Arc, Barrier, Condvar, Mutex, MutexGuard},
    thread,
    time::{Duration, Instant},
};

use log::trace;

use commwatch_monitor::{Communicator, ReduceOp, Status};
use commwatch_shared::{Rank, Source, Tag, TagFilter};

const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

struct Parcel {
    source: Rank,
    tag: Tag,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct Mailbox {
    parcels: Mutex<VecDeque<Parcel>>,
    arrived: Condvar,
}

struct Shared {
    size: u32,
    mailboxes: Vec<Mailbox>,
    barrier: Barrier,
    reduce_slots: Mutex<Vec<Vec<i64>>>,
    clock_slots: Mutex<Vec<u64>>,
    broadcast_slot: Mutex<Vec<u8>>,
    receive_timeout: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, LocalCommError> {
    mutex.lock().map_err(|_| LocalCommError::Poisoned)
}

/// A group of in-memory ranks
pub struct LocalWorld;

impl LocalWorld {
    /// One communicator per rank, `0..size`
    pub fn new(size: u32) -> Vec<LocalComm> {
        Self::with_receive_timeout(size, DEFAULT_RECEIVE_TIMEOUT)
    }

    /// Like [`LocalWorld::new`]; a receive that waits longer than `timeout`
    /// fails instead of hanging the test
    pub fn with_receive_timeout(size: u32, timeout: Duration) -> Vec<LocalComm> {
        let ranks = size as usize;
        let shared = Arc::new(Shared {
            size,
            mailboxes: (0..ranks).map(|_| Mailbox::default()).collect(),
            barrier: Barrier::new(ranks),
            reduce_slots: Mutex::new(vec![Vec::new(); ranks]),
            clock_slots: Mutex::new(vec![0; ranks]),
            broadcast_slot: Mutex::new(Vec::new()),
            receive_timeout: timeout,
        });
        (0..size)
            .map(|rank| LocalComm {
                rank,
                shared: shared.clone(),
                finalized: false,
            })
            .collect()
    }

    /// Runs `body` once per rank, each on its own thread, and returns the
    /// results in rank order
    pub fn run<T, F>(size: u32, body: F) -> Vec<T>
    where
        T: Send,
        F: Fn(LocalComm) -> T + Sync,
    {
        let comms = Self::new(size);
        let body = &body;
        thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| scope.spawn(move || body(comm)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect()
        })
    }
}

/// One rank's endpoint into a [`LocalWorld`]
pub struct LocalComm {
    rank: Rank,
    shared: Arc<Shared>,
    finalized: bool,
}

impl LocalComm {
    fn check_open(&self) -> Result<(), LocalCommError> {
        if self.finalized {
            return Err(LocalCommError::Finalized { rank: self.rank });
        }
        Ok(())
    }

    fn check_rank(&self, rank: Rank) -> Result<usize, LocalCommError> {
        if rank >= self.shared.size {
            return Err(LocalCommError::UnknownRank {
                rank,
                size: self.shared.size,
            });
        }
        Ok(rank as usize)
    }

    fn index(&self) -> usize {
        self.rank as usize
    }

    /// Number of messages delivered to this rank and not yet received
    pub fn pending(&self) -> Result<usize, LocalCommError> {
        Ok(lock(&self.shared.mailboxes[self.index()].parcels)?.len())
    }
}

impl Communicator for LocalComm {
    type Error = LocalCommError;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.check_open()
    }

    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> u32 {
        self.shared.size
    }

    fn send(&mut self, payload: &[u8], dest: Rank, tag: Tag) -> Result<(), Self::Error> {
        self.check_open()?;
        let mailbox = &self.shared.mailboxes[self.check_rank(dest)?];
        lock(&mailbox.parcels)?.push_back(Parcel {
            source: self.rank,
            tag,
            bytes: payload.to_vec(),
        });
        mailbox.arrived.notify_all();
        trace!("rank {} -> rank {}: {} bytes, tag {}", self.rank, dest, payload.len(), tag);
        Ok(())
    }

    fn receive(
        &mut self,
        source: Source,
        tag: TagFilter,
    ) -> Result<(Vec<u8>, Status), Self::Error> {
        self.check_open()?;
        if let Source::Rank(rank) = source {
            self.check_rank(rank)?;
        }

        let timeout = self.shared.receive_timeout;
        let deadline = Instant::now() + timeout;
        let mailbox = &self.shared.mailboxes[self.index()];
        let mut parcels = lock(&mailbox.parcels)?;
        loop {
            // first match in arrival order, so messages from one sender never overtake
            let found = parcels
                .iter()
                .position(|parcel| source.admits(parcel.source) && tag.admits(parcel.tag));
            if let Some(parcel) = found.and_then(|position| parcels.remove(position)) {
                let status = Status {
                    source: parcel.source,
                    tag: parcel.tag,
                    len: parcel.bytes.len(),
                };
                return Ok((parcel.bytes, status));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(LocalCommError::Timeout {
                    rank: self.rank,
                    waited: timeout,
                });
            }
            parcels = mailbox
                .arrived
                .wait_timeout(parcels, deadline - now)
                .map_err(|_| LocalCommError::Poisoned)?
                .0;
        }
    }

    fn broadcast(&mut self, buffer: &mut Vec<u8>, root: Rank) -> Result<(), Self::Error> {
        self.check_open()?;
        self.check_rank(root)?;
        if self.rank == root {
            *lock(&self.shared.broadcast_slot)? = buffer.clone();
        }
        self.shared.barrier.wait();
        if self.rank != root {
            *buffer = lock(&self.shared.broadcast_slot)?.clone();
        }
        self.shared.barrier.wait();
        Ok(())
    }

    fn reduce(
        &mut self,
        values: &[i64],
        op: ReduceOp,
        root: Rank,
    ) -> Result<Option<Vec<i64>>, Self::Error> {
        self.check_open()?;
        self.check_rank(root)?;
        lock(&self.shared.reduce_slots)?[self.index()] = values.to_vec();
        self.shared.barrier.wait();

        let reduced = if self.rank == root {
            let slots = lock(&self.shared.reduce_slots)?;
            let mut folded = values.to_vec();
            for (rank, other) in slots.iter().enumerate() {
                if rank == self.index() {
                    continue;
                }
                for (acc, value) in folded.iter_mut().zip(other.iter()) {
                    *acc = op.apply(*acc, *value);
                }
            }
            Some(folded)
        } else {
            None
        };

        self.shared.barrier.wait();
        Ok(reduced)
    }

    fn barrier(&mut self) -> Result<(), Self::Error> {
        self.check_open()?;
        self.shared.barrier.wait();
        Ok(())
    }

    fn all_reduce_max(&mut self, value: u64) -> Result<u64, Self::Error> {
        self.check_open()?;
        lock(&self.shared.clock_slots)?[self.index()] = value;
        self.shared.barrier.wait();
        let max = lock(&self.shared.clock_slots)?
            .iter()
            .copied()
            .max()
            .unwrap_or(value);
        self.shared.barrier.wait();
        Ok(max)
    }

    fn finalize(&mut self) -> Result<(), Self::Error> {
        self.check_open()?;
        self.finalized = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directed_receive_skips_other_senders() {
        let mut comms = LocalWorld::new(3);
        let mut root = comms.remove(0);
        let mut one = comms.remove(0);
        let mut two = comms.remove(0);

        two.send(b"from two", 0, 5).unwrap();
        one.send(b"from one", 0, 5).unwrap();

        let (bytes, status) = root.receive(Source::Rank(1), TagFilter::Any).unwrap();
        assert_eq!(bytes, b"from one");
        assert_eq!(status.source, 1);
        let (bytes, status) = root.receive(Source::Any, TagFilter::Exact(5)).unwrap();
        assert_eq!(bytes, b"from two");
        assert_eq!(status.len, 8);
    }

    #[test]
    fn receive_times_out_instead_of_hanging() {
        let mut comms = LocalWorld::with_receive_timeout(2, Duration::from_millis(20));
        let result = comms[0].receive(Source::Any, TagFilter::Any);
        assert!(matches!(result, Err(LocalCommError::Timeout { rank: 0, .. })));
    }

    #[test]
    fn unknown_destination_is_rejected() {
        let mut comms = LocalWorld::new(2);
        assert_eq!(
            comms[0].send(b"x", 7, 0),
            Err(LocalCommError::UnknownRank { rank: 7, size: 2 })
        );
    }

    #[test]
    fn collectives_agree_across_threads() {
        let results = LocalWorld::run(4, |mut comm| {
            let rank = comm.rank();
            let max = comm.all_reduce_max(u64::from(rank) * 10).unwrap();
            let sum = comm
                .reduce(&[i64::from(rank), 1], ReduceOp::Sum, 0)
                .unwrap();
            let mut buffer = if rank == 2 { b"hello".to_vec() } else { Vec::new() };
            comm.broadcast(&mut buffer, 2).unwrap();
            (max, sum, buffer)
        });

        for (rank, (max, sum, buffer)) in results.into_iter().enumerate() {
            assert_eq!(max, 30);
            assert_eq!(buffer, b"hello");
            if rank == 0 {
                assert_eq!(sum, Some(vec![6, 4]));
            } else {
                assert_eq!(sum, None);
            }
        }
    }

    #[test]
    fn finalized_comm_refuses_work() {
        let mut comms = LocalWorld::new(1);
        comms[0].finalize().unwrap();
        assert_eq!(comms[0].barrier(), Err(LocalCommError::Finalized { rank: 0 }));
    }
}
