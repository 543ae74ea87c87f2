//! # Stats — Atomic Round Counters
//!
//! Counters shared between an orchestrator task and whoever holds a handle.
//! Only the orchestrator writes them; readers take a [`StatsSnapshot`] which
//! serializes to JSON for the CLI.
//!
//! Per resolved `Next()` that needed a round, `broadcasts` grows by exactly
//! one more than `candidates_rejected`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct SieveStats {
    pub seeds_served: AtomicU64,
    pub primes_found: AtomicU64,
    pub broadcasts: AtomicU64,
    pub candidates_rejected: AtomicU64,
    pub votes_received: AtomicU64,
    pub stale_votes_dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub seeds_served: u64,
    pub primes_found: u64,
    pub broadcasts: u64,
    pub candidates_rejected: u64,
    pub votes_received: u64,
    pub stale_votes_dropped: u64,
}

impl SieveStats {
    pub fn new() -> Arc<Self> {
        Arc::new(SieveStats::default())
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            seeds_served: self.seeds_served.load(Ordering::Relaxed),
            primes_found: self.primes_found.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            candidates_rejected: self.candidates_rejected.load(Ordering::Relaxed),
            votes_received: self.votes_received.load(Ordering::Relaxed),
            stale_votes_dropped: self.stale_votes_dropped.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Counter deltas between an earlier snapshot and this one.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            seeds_served: self.seeds_served.saturating_sub(earlier.seeds_served),
            primes_found: self.primes_found.saturating_sub(earlier.primes_found),
            broadcasts: self.broadcasts.saturating_sub(earlier.broadcasts),
            candidates_rejected: self.candidates_rejected.saturating_sub(earlier.candidates_rejected),
            votes_received: self.votes_received.saturating_sub(earlier.votes_received),
            stale_votes_dropped: self.stale_votes_dropped.saturating_sub(earlier.stale_votes_dropped),
        }
    }
}
