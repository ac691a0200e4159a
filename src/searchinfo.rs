//! State shared between the search guide and its workers: the stop level,
//! global node/tbhit counters, and the ponder flags. Everything here is
//! atomically-read scalars; workers never take a lock.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

/// Coarse cancellation state. Transitions are monotonic within one search:
/// workers only ever raise the level (and only the guide raises it past
/// `StopSoon`); nobody clears it until the next search begins.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum StopLevel {
    Run = 0,
    /// The search has what it came for (bench termination and such).
    WantStop = 1,
    /// Advisory: finish the current iteration, then stop.
    StopSoon = 2,
    /// Mandatory: unwind now, discarding the current iteration.
    StopImmediately = 3,
    /// All workers have come to rest.
    Stopped = 4,
    TerminatedSearch = 5,
}

impl StopLevel {
    const fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Self::Run,
            1 => Self::WantStop,
            2 => Self::StopSoon,
            3 => Self::StopImmediately,
            4 => Self::Stopped,
            _ => Self::TerminatedSearch,
        }
    }
}

pub struct SharedSearchState {
    stop: AtomicU8,
    /// One counter per worker; workers publish their local totals here.
    nodes: Vec<AtomicU64>,
    pub tbhits: AtomicU64,
    pondering: AtomicBool,
    ponderhit: AtomicBool,
}

impl SharedSearchState {
    pub fn new(threads: usize, pondering: bool) -> Self {
        Self {
            stop: AtomicU8::new(StopLevel::Run as u8),
            nodes: (0..threads).map(|_| AtomicU64::new(0)).collect(),
            tbhits: AtomicU64::new(0),
            pondering: AtomicBool::new(pondering),
            ponderhit: AtomicBool::new(false),
        }
    }

    pub fn stop_level(&self) -> StopLevel {
        StopLevel::from_bits(self.stop.load(Ordering::Relaxed))
    }

    /// Raises the stop level; lowering is impossible by construction.
    pub fn raise_stop(&self, level: StopLevel) {
        self.stop.fetch_max(level as u8, Ordering::Relaxed);
    }

    pub fn publish_nodes(&self, thread_id: usize, nodes: u64) {
        self.nodes[thread_id].store(nodes, Ordering::Relaxed);
    }

    pub fn total_nodes(&self) -> u64 {
        self.nodes.iter().map(|n| n.load(Ordering::Relaxed)).sum()
    }

    pub fn add_tbhit(&self) {
        self.tbhits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_tbhits(&self) -> u64 {
        self.tbhits.load(Ordering::Relaxed)
    }

    pub fn is_pondering(&self) -> bool {
        self.pondering.load(Ordering::Relaxed)
    }

    pub fn ponderhit(&self) {
        self.ponderhit.store(true, Ordering::Relaxed);
    }

    /// Consumes a pending ponderhit, converting the hypothetical search into
    /// the real one.
    pub fn take_ponderhit(&self) -> bool {
        if self.ponderhit.swap(false, Ordering::Relaxed) {
            self.pondering.store(false, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

/// Options settable over UCI that shape the search.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub multipv: usize,
    pub ponder: bool,
    pub move_overhead: u64,
    pub syzygy_path: Option<String>,
    pub syzygy_probe_limit: u32,
    pub syzygy_50_move_rule: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            hash_mb: 16,
            threads: 1,
            multipv: 1,
            ponder: false,
            move_overhead: 10,
            syzygy_path: None,
            syzygy_probe_limit: 7,
            syzygy_50_move_rule: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_level_is_monotonic() {
        let shared = SharedSearchState::new(1, false);
        shared.raise_stop(StopLevel::StopImmediately);
        shared.raise_stop(StopLevel::StopSoon);
        assert_eq!(shared.stop_level(), StopLevel::StopImmediately);
        shared.raise_stop(StopLevel::Stopped);
        assert_eq!(shared.stop_level(), StopLevel::Stopped);
    }
}
