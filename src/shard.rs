//! # Shard — One Slice of the Known Primes
//!
//! A shard owns an append-only list of primes and answers primality queries
//! against that list alone. Shards do not know about each other and nothing
//! keeps their lists disjoint; the orchestrator hands each new prime to a
//! randomly picked shard.
//!
//! ## Voting Rule
//!
//! | Knowledge | Some known `p` with `p != c` and `p ∣ c` | Vote |
//! |-----------|-------------------------------------------|------|
//! | empty | n/a | `Unknown` |
//! | non-empty | yes | `NotPrime` |
//! | non-empty | no (including `c` itself known) | `Prime` |
//!
//! ## Actor
//!
//! [`shard_loop`] runs as one Tokio task per shard and drains its mailbox one
//! request at a time, so the list needs no lock. Every `IsPrime` request gets
//! exactly one [`VoteReply`]; if the round that asked has been cancelled the
//! reply channel is closed and the vote is discarded here.

use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::error::SieveError;
use crate::message::{ShardRequest, Vote, VoteReply};

/// The primes a single shard has been given, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct ShardKnowledge {
    primes: Vec<u64>,
}

impl ShardKnowledge {
    pub fn new() -> Self {
        ShardKnowledge { primes: Vec::new() }
    }

    /// Appends unconditionally. Duplicates are kept.
    pub fn add(&mut self, value: u64) {
        self.primes.push(value);
    }

    pub fn vote(&self, candidate: u64) -> Vote {
        if self.primes.is_empty() {
            return Vote::Unknown;
        }
        let divided = self
            .primes
            .iter()
            .any(|&p| p != 0 && candidate != p && candidate % p == 0);
        if divided {
            Vote::NotPrime
        } else {
            Vote::Prime
        }
    }

    pub fn primes(&self) -> &[u64] {
        &self.primes
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }
}

/// Shard actor loop. Runs until a `Shutdown` request arrives or every sender is dropped.
pub async fn shard_loop(shard_id: usize, mut rx: mpsc::Receiver<ShardRequest>) {
    trace!(shard = shard_id, "shard started");
    let mut knowledge = ShardKnowledge::new();

    while let Some(request) = rx.recv().await {
        match request {
            ShardRequest::Add { value } => {
                knowledge.add(value);
                trace!(shard = shard_id, value, known = knowledge.len(), "prime added");
            }
            ShardRequest::IsPrime { candidate, reply } => {
                let vote = knowledge.vote(candidate);
                let answer = VoteReply {
                    shard: shard_id,
                    candidate,
                    vote,
                };
                if reply.send(answer).await.is_err() {
                    trace!(shard = shard_id, candidate, "round cancelled, vote discarded");
                }
            }
            ShardRequest::Snapshot { reply } => {
                let _ = reply.send(knowledge.primes().to_vec());
            }
            ShardRequest::Shutdown { response } => {
                trace!(shard = shard_id, "shard received shutdown signal");
                let _ = response.send(());
                break;
            }
        }
    }

    trace!(shard = shard_id, known = knowledge.len(), "shard stopped");
}

/// Cheap, cloneable address of a running shard.
#[derive(Clone, Debug)]
pub struct ShardHandle {
    id: usize,
    tx: mpsc::Sender<ShardRequest>,
}

impl ShardHandle {
    /// Spawns a shard task on the current Tokio runtime.
    pub fn spawn(id: usize, mailbox_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(mailbox_capacity);
        tokio::spawn(shard_loop(id, rx));
        ShardHandle { id, tx }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Fire-and-forget append.
    pub async fn add(&self, value: u64) -> Result<(), SieveError> {
        self.send(ShardRequest::Add { value }).await
    }

    /// Asks for a vote, delivered later on `reply`.
    pub async fn request_vote(
        &self,
        candidate: u64,
        reply: mpsc::Sender<VoteReply>,
    ) -> Result<(), SieveError> {
        self.send(ShardRequest::IsPrime { candidate, reply }).await
    }

    /// Asks for a vote and waits for it. Mostly useful outside a round.
    pub async fn is_prime(&self, candidate: u64) -> Result<Vote, SieveError> {
        let (tx, mut rx) = mpsc::channel(1);
        self.request_vote(candidate, tx).await?;
        rx.recv()
            .await
            .map(|reply| reply.vote)
            .ok_or(SieveError::ReplyDropped)
    }

    pub async fn snapshot(&self) -> Result<Vec<u64>, SieveError> {
        let (tx, rx) = oneshot::channel();
        self.send(ShardRequest::Snapshot { reply: tx }).await?;
        rx.await.map_err(|_| SieveError::ReplyDropped)
    }

    /// Sends `Shutdown` and returns the acknowledgement receiver.
    pub async fn shutdown(&self) -> Result<oneshot::Receiver<()>, SieveError> {
        let (tx, rx) = oneshot::channel();
        self.send(ShardRequest::Shutdown { response: tx }).await?;
        Ok(rx)
    }

    async fn send(&self, request: ShardRequest) -> Result<(), SieveError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| SieveError::shard_gone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEEDS: [u64; 4] = [2, 3, 5, 7];

    fn seeded() -> ShardKnowledge {
        let mut k = ShardKnowledge::new();
        for s in SEEDS {
            k.add(s);
        }
        k
    }

    // ── Pure voting rule ─────────────────────────────────────────────

    #[test]
    fn empty_shard_votes_unknown() {
        let k = ShardKnowledge::new();
        for c in 1..=1000 {
            assert_eq!(k.vote(c), Vote::Unknown, "candidate {c}");
        }
    }

    /// With {2,3,5,7} known, the vote is Prime exactly when the candidate
    /// shares no factor with the seeds.
    #[test]
    fn seeded_shard_matches_coprimality() {
        let k = seeded();
        for c in 10..=1000u64 {
            let divisible = SEEDS.iter().any(|&s| c % s == 0);
            let expected = if divisible { Vote::NotPrime } else { Vote::Prime };
            assert_eq!(k.vote(c), expected, "candidate {c}");
        }
    }

    #[test]
    fn known_prime_is_not_its_own_divisor() {
        let k = seeded();
        for s in SEEDS {
            assert_eq!(k.vote(s), Vote::Prime, "seed {s}");
        }
    }

    #[test]
    fn multiples_of_known_primes_are_rejected() {
        let k = seeded();
        for s in SEEDS {
            for m in 2..=100 {
                assert_eq!(k.vote(s * m), Vote::NotPrime, "{s} * {m}");
            }
        }
    }

    #[test]
    fn partial_knowledge_only_judges_own_primes() {
        let mut k = ShardKnowledge::new();
        k.add(3);
        k.add(7);
        assert_eq!(k.vote(10), Vote::Prime);
        assert_eq!(k.vote(21), Vote::NotPrime);
        assert_eq!(k.vote(25), Vote::Prime);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut k = ShardKnowledge::new();
        k.add(11);
        k.add(11);
        assert_eq!(k.primes(), &[11, 11]);
        assert_eq!(k.vote(11), Vote::Prime);
        assert_eq!(k.vote(121), Vote::NotPrime);
    }

    // ── Actor ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn actor_answers_after_adds_in_mailbox_order() {
        let shard = ShardHandle::spawn(0, 16);
        assert_eq!(shard.is_prime(9).await.unwrap(), Vote::Unknown);
        shard.add(3).await.unwrap();
        assert_eq!(shard.is_prime(9).await.unwrap(), Vote::NotPrime);
        assert_eq!(shard.is_prime(3).await.unwrap(), Vote::Prime);
        assert_eq!(shard.snapshot().await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn vote_is_tagged_with_shard_and_candidate() {
        let shard = ShardHandle::spawn(7, 4);
        shard.add(2).await.unwrap();
        let (tx, mut rx) = mpsc::channel(1);
        shard.request_vote(15, tx).await.unwrap();
        let reply = rx.recv().await.unwrap();
        assert_eq!(
            reply,
            VoteReply {
                shard: 7,
                candidate: 15,
                vote: Vote::Prime
            }
        );
    }

    #[tokio::test]
    async fn closed_reply_channel_does_not_stop_the_shard() {
        let shard = ShardHandle::spawn(0, 4);
        shard.add(5).await.unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        shard.request_vote(25, tx).await.unwrap();
        assert_eq!(shard.is_prime(25).await.unwrap(), Vote::NotPrime);
    }

    #[tokio::test]
    async fn shutdown_is_acknowledged_and_closes_mailbox() {
        let shard = ShardHandle::spawn(0, 4);
        let ack = shard.shutdown().await.unwrap();
        ack.await.unwrap();
        // The loop has exited; the receiver is dropped once the task finishes.
        tokio::task::yield_now().await;
        let err = loop {
            match shard.add(1).await {
                Ok(()) => tokio::task::yield_now().await,
                Err(e) => break e,
            }
        };
        assert_eq!(err, SieveError::shard_gone());
    }
}
