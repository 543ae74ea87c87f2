//! # Orchestrator — Non-Blocking Round Coordinator
//!
//! Serves `Next()` requests by polling every shard about one candidate at a
//! time, without ever suspending its own task on a shard reply.
//!
//! ## State Machine
//!
//! ```text
//!            Next (seeds left)            vote (not last)
//!          ┌──────────────────┐         ┌────────────────┐
//!          │                  ▼         │                ▼
//!        IDLE ──Next──▶ AWAITING_VOTES ─┴─ last vote ─┬─ all Prime ──▶ store, reply, IDLE
//!                        ▲                            │
//!                        └──── next candidate ◀───────┴─ otherwise
//! ```
//!
//! - Seeds 2, 3, 5, 7 are answered directly, with no broadcast.
//! - Entering `AWAITING_VOTES` captures the caller's [`ReplyContinuation`],
//!   draws a candidate, opens the [`Tally`] and broadcasts `IsPrime`.
//! - Votes arrive on a second mailbox and are handled one at a time like any
//!   other message. Votes for another candidate are dropped.
//! - A rejected candidate keeps the same continuation and moves on to the
//!   next candidate. An accepted one is stored in a random shard and the
//!   continuation is resolved exactly once.
//!
//! A `Next` that arrives mid-round waits in a FIFO backlog and starts its own
//! round after the current one resolves, so at most one round is ever in flight.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::candidates::Candidates;
use crate::config::SieveConfig;
use crate::continuation::ReplyContinuation;
use crate::error::SieveError;
use crate::message::{
    NextReply, OrchestratorRequest, OrchestratorStatus, RoundState, VoteReply,
};
use crate::pool::ShardPool;
use crate::stats::SieveStats;
use crate::tally::{Tally, TallyOutcome};
use crate::SEED_PRIMES;

pub struct Orchestrator {
    pool: ShardPool,
    seeds: VecDeque<u64>,
    candidates: Candidates,
    tally: Tally,
    continuation: Option<ReplyContinuation>,
    backlog: VecDeque<oneshot::Sender<NextReply>>,
    votes_tx: mpsc::Sender<VoteReply>,
    stats: Arc<SieveStats>,
}

/// Spawns the shard pool and a non-blocking orchestrator task. Returns its mailbox.
pub async fn spawn(
    config: &SieveConfig,
    stats: Arc<SieveStats>,
) -> Result<mpsc::Sender<OrchestratorRequest>, SieveError> {
    let pool = ShardPool::spawn(config).await?;
    let (votes_tx, votes_rx) = mpsc::channel(config.mailbox_capacity.max(config.shards));
    let (tx, rx) = mpsc::channel(config.mailbox_capacity);
    let orchestrator = Orchestrator::new(pool, votes_tx, stats);
    tokio::spawn(orchestrator.run(rx, votes_rx));
    Ok(tx)
}

impl Orchestrator {
    pub fn new(pool: ShardPool, votes_tx: mpsc::Sender<VoteReply>, stats: Arc<SieveStats>) -> Self {
        let tally = Tally::new(pool.len());
        Orchestrator {
            pool,
            seeds: SEED_PRIMES.iter().copied().collect(),
            candidates: Candidates::new(),
            tally,
            continuation: None,
            backlog: VecDeque::new(),
            votes_tx,
            stats,
        }
    }

    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<OrchestratorRequest>,
        mut votes: mpsc::Receiver<VoteReply>,
    ) {
        info!(shards = self.pool.len(), "orchestrator started (non-blocking)");

        loop {
            tokio::select! {
                biased;
                Some(vote) = votes.recv() => self.on_vote(vote).await,
                request = requests.recv() => match request {
                    Some(OrchestratorRequest::Next { reply }) => self.on_next(reply).await,
                    Some(OrchestratorRequest::Status { reply }) => {
                        let _ = reply.send(self.status());
                    }
                    Some(OrchestratorRequest::ShardSnapshots { reply }) => {
                        let _ = reply.send(self.pool.snapshots().await);
                    }
                    Some(OrchestratorRequest::Shutdown { response }) => {
                        self.stop().await;
                        let _ = response.send(());
                        break;
                    }
                    None => {
                        self.stop().await;
                        break;
                    }
                },
            }
            self.serve_backlog().await;
        }

        info!("orchestrator stopped");
    }

    fn in_flight(&self) -> bool {
        self.continuation.is_some()
    }

    async fn on_next(&mut self, reply: oneshot::Sender<NextReply>) {
        if reply.is_closed() {
            trace!("skipping Next from a caller that stopped waiting");
            return;
        }
        if self.in_flight() {
            self.backlog.push_back(reply);
            return;
        }
        if let Some(seed) = self.seeds.pop_front() {
            SieveStats::bump(&self.stats.seeds_served);
            trace!(seed, "serving seed");
            let _ = reply.send(Ok(seed));
            return;
        }

        debug_assert!(self.tally.is_empty());
        self.continuation = Some(ReplyContinuation::new(reply));
        self.advance().await;
    }

    /// Draws the next candidate and broadcasts it. Fails the round if that is impossible.
    async fn advance(&mut self) {
        let Some(candidate) = self.candidates.next() else {
            self.finish(Err(SieveError::CandidatesExhausted));
            return;
        };
        self.tally.open(candidate);
        SieveStats::bump(&self.stats.broadcasts);
        if let Err(e) = self.pool.broadcast(candidate, &self.votes_tx).await {
            warn!(candidate, error = %e, "broadcast failed");
            self.finish(Err(e));
        }
    }

    async fn on_vote(&mut self, vote: VoteReply) {
        SieveStats::bump(&self.stats.votes_received);
        match self.tally.record(vote) {
            TallyOutcome::Stale => {
                SieveStats::bump(&self.stats.stale_votes_dropped);
                debug!(
                    candidate = vote.candidate,
                    shard = vote.shard,
                    active = ?self.tally.active_candidate(),
                    "dropping stale vote"
                );
            }
            TallyOutcome::Pending => {}
            TallyOutcome::Rejected(candidate) => {
                SieveStats::bump(&self.stats.candidates_rejected);
                trace!(candidate, "candidate rejected");
                self.advance().await;
            }
            TallyOutcome::Accepted(prime) => {
                let stored = self.pool.store(prime).await;
                SieveStats::bump(&self.stats.primes_found);
                debug!(prime, "prime accepted");
                self.finish(stored.map(|_| prime));
            }
        }
    }

    /// Resolves the captured continuation, returning to `IDLE`.
    fn finish(&mut self, outcome: NextReply) {
        self.tally.close();
        if let Some(mut continuation) = self.continuation.take() {
            if let Err(e) = continuation.resolve(outcome) {
                warn!(error = %e, "continuation resolved twice");
            }
        }
    }

    /// Starts queued requests until one of them opens a round.
    async fn serve_backlog(&mut self) {
        while !self.in_flight() {
            match self.backlog.pop_front() {
                Some(reply) => self.on_next(reply).await,
                None => break,
            }
        }
    }

    fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            state: if self.in_flight() {
                RoundState::AwaitingVotes
            } else {
                RoundState::Idle
            },
            active_candidate: self.tally.active_candidate(),
            votes_collected: self.tally.len(),
            shard_count: self.pool.len(),
            seeds_remaining: self.seeds.len(),
            backlog: self.backlog.len(),
            stats: self.stats.snapshot(),
        }
    }

    async fn stop(&mut self) {
        if let Some(mut continuation) = self.continuation.take() {
            let _ = continuation.resolve(Err(SieveError::orchestrator_gone()));
        }
        for reply in self.backlog.drain(..) {
            let _ = reply.send(Err(SieveError::orchestrator_gone()));
        }
        self.pool.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    //! Drives the state machine by hand: the test owns the vote mailbox and
    //! forwards each vote explicitly, so interleavings are deterministic.

    use super::*;
    use crate::message::Vote;

    async fn manual() -> (Orchestrator, mpsc::Receiver<VoteReply>, Arc<SieveStats>) {
        let config = SieveConfig {
            rng_seed: Some(1),
            ..SieveConfig::default()
        };
        let pool = ShardPool::spawn(&config).await.unwrap();
        let (votes_tx, votes_rx) = mpsc::channel(16);
        let stats = SieveStats::new();
        (
            Orchestrator::new(pool, votes_tx, Arc::clone(&stats)),
            votes_rx,
            stats,
        )
    }

    async fn drain_seeds(o: &mut Orchestrator) {
        for expected in SEED_PRIMES {
            let (tx, rx) = oneshot::channel();
            o.on_next(tx).await;
            assert_eq!(rx.await.unwrap(), Ok(expected));
        }
    }

    /// Pumps votes until the pending reply resolves.
    async fn pump(
        o: &mut Orchestrator,
        votes: &mut mpsc::Receiver<VoteReply>,
        mut rx: oneshot::Receiver<NextReply>,
    ) -> NextReply {
        loop {
            if let Ok(v) = rx.try_recv() {
                return v;
            }
            let vote = votes.recv().await.unwrap();
            o.on_vote(vote).await;
            o.serve_backlog().await;
        }
    }

    #[tokio::test]
    async fn seeds_skip_the_shards() {
        let (mut o, _votes, stats) = manual().await;
        drain_seeds(&mut o).await;
        let s = stats.snapshot();
        assert_eq!(s.seeds_served, 4);
        assert_eq!(s.broadcasts, 0);
        assert_eq!(o.status().state, RoundState::Idle);
    }

    #[tokio::test]
    async fn first_round_resolves_to_eleven() {
        let (mut o, mut votes, stats) = manual().await;
        drain_seeds(&mut o).await;

        let (tx, rx) = oneshot::channel();
        o.on_next(tx).await;
        let status = o.status();
        assert_eq!(status.state, RoundState::AwaitingVotes);
        assert_eq!(status.active_candidate, Some(11));
        assert_eq!(status.votes_collected, 0);

        assert_eq!(pump(&mut o, &mut votes, rx).await, Ok(11));
        let status = o.status();
        assert_eq!(status.state, RoundState::Idle);
        assert_eq!(status.votes_collected, 0);
        assert_eq!(status.active_candidate, None);
        assert_eq!(stats.snapshot().broadcasts, 1);
    }

    #[tokio::test]
    async fn stale_vote_is_dropped_mid_round() {
        let (mut o, mut votes, stats) = manual().await;
        drain_seeds(&mut o).await;

        let (tx, rx) = oneshot::channel();
        o.on_next(tx).await;

        let first = votes.recv().await.unwrap();
        o.on_vote(first).await;
        assert_eq!(o.status().votes_collected, 1);

        o.on_vote(VoteReply {
            shard: 2,
            candidate: 9,
            vote: Vote::NotPrime,
        })
        .await;
        assert_eq!(o.status().votes_collected, 1);
        assert_eq!(stats.snapshot().stale_votes_dropped, 1);

        assert_eq!(pump(&mut o, &mut votes, rx).await, Ok(11));
    }

    #[tokio::test]
    async fn rejected_candidates_reuse_the_continuation() {
        let (mut o, mut votes, stats) = manual().await;
        drain_seeds(&mut o).await;
        let mut found = Vec::new();
        for _ in 0..6 {
            let (tx, rx) = oneshot::channel();
            o.on_next(tx).await;
            found.push(pump(&mut o, &mut votes, rx).await.unwrap());
        }
        assert_eq!(found, vec![11, 13, 17, 19, 23, 29]);
        // 21 and 27 were the only composites drawn on the way to 29.
        let s = stats.snapshot();
        assert_eq!(s.candidates_rejected, 2);
        assert_eq!(s.broadcasts, 8);
    }

    #[tokio::test]
    async fn mid_round_requests_are_queued() {
        let (mut o, mut votes, _stats) = manual().await;
        drain_seeds(&mut o).await;

        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        o.on_next(tx1).await;
        o.on_next(tx2).await;
        assert_eq!(o.status().backlog, 1);

        assert_eq!(pump(&mut o, &mut votes, rx1).await, Ok(11));
        // The backlog entry started its own round as soon as 11 resolved.
        assert_eq!(o.status().backlog, 0);
        assert_eq!(o.status().active_candidate, Some(13));
        assert_eq!(pump(&mut o, &mut votes, rx2).await, Ok(13));
    }

    #[tokio::test]
    async fn abandoned_callers_are_skipped() {
        let (mut o, _votes, stats) = manual().await;
        let (tx, rx) = oneshot::channel();
        drop(rx);
        o.on_next(tx).await;
        assert_eq!(stats.snapshot().seeds_served, 0);
        assert_eq!(o.status().seeds_remaining, 4);
    }

    #[tokio::test]
    async fn shutdown_fails_pending_callers() {
        let (mut o, _votes, _stats) = manual().await;
        drain_seeds(&mut o).await;
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        o.on_next(tx1).await;
        o.on_next(tx2).await;
        o.stop().await;
        assert_eq!(rx1.await.unwrap(), Err(SieveError::orchestrator_gone()));
        assert_eq!(rx2.await.unwrap(), Err(SieveError::orchestrator_gone()));
    }
}
