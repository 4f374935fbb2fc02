//! Small monitored programs shared by the integration tests

use commwatch_monitor::Monitor;
use commwatch_shared::{Source, Tag, TagFilter};

use crate::{LocalComm, LocalCommError};

const PING_TAG: Tag = 1;
const GATHER_TAG: Tag = 2;

/// Pairs rank `2k` with `2k + 1`. Even iterations send from the even rank,
/// odd iterations from the odd one. Every iteration is bracketed and the
/// whole loop is logged as `loop_index`.
pub fn ping_pong(
    monitor: &mut Monitor<LocalComm>,
    loop_index: u64,
    iterations: u64,
) -> Result<(), LocalCommError> {
    let rank = monitor.rank();
    let partner = rank ^ 1;

    monitor.begin_for();
    for iteration in 0..iterations {
        monitor.begin_iter();
        let sending = (iteration % 2 == 0) == (rank % 2 == 0);
        if sending {
            monitor.send(&iteration.to_le_bytes(), partner, PING_TAG)?;
        } else {
            monitor.receive(Source::Rank(partner), TagFilter::Exact(PING_TAG))?;
        }
        monitor.end_iter(iteration);
    }
    monitor.end_for(loop_index, None);
    Ok(())
}

/// Every non-root rank sends `rounds` messages to the root, which takes
/// them with directed receives, one peer after the other
pub fn gather_to_root(monitor: &mut Monitor<LocalComm>, rounds: u32) -> Result<(), LocalCommError> {
    let root = monitor.config().root;
    let size = monitor.size();
    if monitor.rank() == root {
        for _ in 0..rounds {
            for peer in (0..size).filter(|peer| *peer != root) {
                monitor.receive(Source::Rank(peer), TagFilter::Exact(GATHER_TAG))?;
            }
        }
    } else {
        for round in 0..rounds {
            monitor.send(&round.to_le_bytes(), root, GATHER_TAG)?;
        }
    }
    Ok(())
}
