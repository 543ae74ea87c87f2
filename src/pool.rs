//! # Pool — Fixed Set of Shard Actors
//!
//! Spawns the shards, hands them their seed primes, and offers the three
//! operations an orchestrator needs: broadcast a vote request, store a new
//! prime in a random shard, and shut everything down.
//!
//! Membership never changes after [`ShardPool::spawn`], so picking a shard is
//! a plain index draw over a fixed-size slice. The draw is with replacement:
//! the same shard may be chosen many times in a row.

use std::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::config::SieveConfig;
use crate::error::SieveError;
use crate::message::VoteReply;
use crate::shard::ShardHandle;

pub struct ShardPool {
    shards: Vec<ShardHandle>,
    rng: StdRng,
    shutdown_timeout: Duration,
}

impl ShardPool {
    /// Spawns `config.shards` shard tasks and queues their seed primes.
    ///
    /// Seeds are sent before this returns, so they sit ahead of any vote
    /// request in each shard's mailbox.
    pub async fn spawn(config: &SieveConfig) -> Result<Self, SieveError> {
        let shards: Vec<ShardHandle> = (0..config.shards)
            .map(|id| ShardHandle::spawn(id, config.mailbox_capacity))
            .collect();

        for shard in &shards {
            for seed in config.seeds_for(shard.id()) {
                shard.add(seed).await?;
            }
        }

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        info!(
            shards = shards.len(),
            seeding = %config.seeding,
            "shard pool started"
        );

        Ok(ShardPool {
            shards,
            rng,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        })
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Sends `IsPrime(candidate)` to every shard, replies going to `reply`.
    pub async fn broadcast(
        &self,
        candidate: u64,
        reply: &mpsc::Sender<VoteReply>,
    ) -> Result<(), SieveError> {
        trace!(candidate, "broadcasting candidate");
        for shard in &self.shards {
            shard.request_vote(candidate, reply.clone()).await?;
        }
        Ok(())
    }

    /// Adds `prime` to one shard chosen uniformly at random. Returns its index.
    pub async fn store(&mut self, prime: u64) -> Result<usize, SieveError> {
        let idx = self.rng.random_range(0..self.shards.len());
        self.shards[idx].add(prime).await?;
        debug!(prime, shard = idx, "prime stored");
        Ok(idx)
    }

    /// Collects a copy of every shard's primes, in shard order.
    pub async fn snapshots(&self) -> Result<Vec<Vec<u64>>, SieveError> {
        let mut out = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            out.push(shard.snapshot().await?);
        }
        Ok(out)
    }

    /// Asks every shard to stop and waits (bounded per shard) for acknowledgements.
    pub async fn shutdown(&self) {
        let mut pending = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            match shard.shutdown().await {
                Ok(rx) => pending.push((shard.id(), rx)),
                Err(e) => warn!(shard = shard.id(), error = %e, "failed to send shutdown"),
            }
        }

        let wait = self.shutdown_timeout;
        let acks = pending.into_iter().map(|(id, rx)| async move {
            match timeout(wait, rx).await {
                Ok(Ok(())) => trace!(shard = id, "shutdown acknowledged"),
                Ok(Err(_)) => warn!(shard = id, "shard dropped its shutdown acknowledgement"),
                Err(_) => warn!(shard = id, "shard shutdown timed out"),
            }
        });
        futures::future::join_all(acks).await;

        info!(shards = self.shards.len(), "shard pool stopped");
    }
}
