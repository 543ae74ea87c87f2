//! # shardsieve — Incremental Primes from a Pool of Shard Actors
//!
//! Primes are discovered one at a time. Knowledge of the primes found so far
//! is scattered over a fixed pool of shard actors; each new candidate is put
//! to every shard, and only a unanimous `Prime` vote lets it through. The
//! winner is then handed to one shard at random, so the pool keeps learning.
//!
//! ## Flow
//!
//! ```text
//! client ──Next──▶ orchestrator ──IsPrime(c)──▶ shard 0..n
//!    ▲                 │    ▲                       │
//!    │                 │    └──────── votes ────────┘
//!    └──── prime ──────┘──Add(p)──▶ random shard
//! ```
//!
//! ## Modules
//!
//! - [`candidates`]: wheel-10 candidate generator (11, 13, 17, 19, 21, ...).
//! - [`shard`]: per-shard knowledge, voting rule and actor loop.
//! - [`pool`]: the immutable shard pool (seed, broadcast, random store, shutdown).
//! - [`tally`]: one round's vote accumulator with stale-vote filtering.
//! - [`continuation`]: single-use reply handle for a waiting caller.
//! - [`orchestrator`]: the non-blocking coordinator.
//! - [`blocking`]: the blocking coordinator with per-round cancellation.
//! - [`primes`]: async handle, `Stream` adaptor and blocking iterator.
//! - [`config`], [`stats`], [`error`], [`message`]: supporting types.

pub mod blocking;
pub mod candidates;
pub mod config;
pub mod continuation;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod pool;
pub mod primes;
pub mod shard;
pub mod stats;
pub mod tally;

pub use config::{Seeding, SieveConfig, Variant};
pub use error::SieveError;
pub use message::{OrchestratorStatus, RoundState, Vote};
pub use primes::{Primes, Sieve, SieveHandle};
pub use stats::StatsSnapshot;

/// Bootstrap primes, answered without consulting any shard.
pub const SEED_PRIMES: [u64; 4] = [2, 3, 5, 7];

/// Trial-division reference used to check the sieve's output.
pub fn is_prime_reference(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3u64;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}
