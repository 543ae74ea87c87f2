//! # Blocking — Orchestrator That Awaits Each Round Inline
//!
//! The simpler historical form of the coordinator. A `Next` request is served
//! start to finish inside its handler: for each candidate the orchestrator
//! broadcasts, then waits on the votes before looking at its mailbox again.
//! `Status` requests queued behind a round are answered only once it ends.
//!
//! ## Round Cancellation
//!
//! Each candidate gets a fresh reply channel. Votes are read in arrival order
//! and the first negative one settles the round. Returning drops the
//! receiver, so any shard still holding that candidate finds the channel
//! closed and discards its vote. A late vote therefore never reaches a later
//! round, and nothing accumulates across rejected candidates.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::candidates::Candidates;
use crate::config::SieveConfig;
use crate::continuation::ReplyContinuation;
use crate::error::SieveError;
use crate::message::{NextReply, OrchestratorRequest, OrchestratorStatus, RoundState};
use crate::pool::ShardPool;
use crate::stats::SieveStats;
use crate::tally::{Tally, TallyOutcome};
use crate::SEED_PRIMES;

pub struct BlockingOrchestrator {
    pool: ShardPool,
    seeds: VecDeque<u64>,
    candidates: Candidates,
    stats: Arc<SieveStats>,
}

/// Spawns the shard pool and a blocking orchestrator task. Returns its mailbox.
pub async fn spawn(
    config: &SieveConfig,
    stats: Arc<SieveStats>,
) -> Result<mpsc::Sender<OrchestratorRequest>, SieveError> {
    let pool = ShardPool::spawn(config).await?;
    let (tx, rx) = mpsc::channel(config.mailbox_capacity);
    tokio::spawn(BlockingOrchestrator::new(pool, stats).run(rx));
    Ok(tx)
}

impl BlockingOrchestrator {
    pub fn new(pool: ShardPool, stats: Arc<SieveStats>) -> Self {
        BlockingOrchestrator {
            pool,
            seeds: SEED_PRIMES.iter().copied().collect(),
            candidates: Candidates::new(),
            stats,
        }
    }

    pub async fn run(mut self, mut requests: mpsc::Receiver<OrchestratorRequest>) {
        info!(shards = self.pool.len(), "orchestrator started (blocking)");

        while let Some(request) = requests.recv().await {
            match request {
                OrchestratorRequest::Next { reply } => {
                    if reply.is_closed() {
                        continue;
                    }
                    let mut continuation = ReplyContinuation::new(reply);
                    let outcome = self.next_prime().await;
                    let _ = continuation.resolve(outcome);
                }
                OrchestratorRequest::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                OrchestratorRequest::ShardSnapshots { reply } => {
                    let _ = reply.send(self.pool.snapshots().await);
                }
                OrchestratorRequest::Shutdown { response } => {
                    self.pool.shutdown().await;
                    let _ = response.send(());
                    info!("orchestrator stopped");
                    return;
                }
            }
        }

        self.pool.shutdown().await;
        info!("orchestrator stopped");
    }

    async fn next_prime(&mut self) -> NextReply {
        if let Some(seed) = self.seeds.pop_front() {
            SieveStats::bump(&self.stats.seeds_served);
            return Ok(seed);
        }

        loop {
            let candidate = self
                .candidates
                .next()
                .ok_or(SieveError::CandidatesExhausted)?;
            if self.poll(candidate).await? {
                self.pool.store(candidate).await?;
                SieveStats::bump(&self.stats.primes_found);
                debug!(prime = candidate, "prime accepted");
                return Ok(candidate);
            }
            SieveStats::bump(&self.stats.candidates_rejected);
            trace!(candidate, "candidate rejected");
        }
    }

    /// Runs one round. `true` when every shard voted `Prime`.
    async fn poll(&self, candidate: u64) -> Result<bool, SieveError> {
        let (tx, mut rx) = mpsc::channel(self.pool.len());
        SieveStats::bump(&self.stats.broadcasts);
        self.pool.broadcast(candidate, &tx).await?;
        drop(tx);

        let mut tally = Tally::new(self.pool.len());
        tally.open(candidate);
        while let Some(reply) = rx.recv().await {
            SieveStats::bump(&self.stats.votes_received);
            if !reply.vote.is_affirmative() {
                return Ok(false);
            }
            match tally.record(reply) {
                TallyOutcome::Accepted(_) => return Ok(true),
                TallyOutcome::Rejected(_) => return Ok(false),
                TallyOutcome::Pending => {}
                TallyOutcome::Stale => SieveStats::bump(&self.stats.stale_votes_dropped),
            }
        }

        // Every shard dropped the round's sender without voting.
        Err(SieveError::ReplyDropped)
    }

    fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            state: RoundState::Idle,
            active_candidate: None,
            votes_collected: 0,
            shard_count: self.pool.len(),
            seeds_remaining: self.seeds.len(),
            backlog: 0,
            stats: self.stats.snapshot(),
        }
    }
}
