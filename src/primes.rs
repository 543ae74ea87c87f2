//! # Primes — Client Surface
//!
//! Three ways to pull primes out of a running sieve:
//!
//! 1. [`SieveHandle::next_prime`]: async, one prime per call.
//! 2. [`SieveHandle::stream`]: a `futures::Stream` over the same calls.
//! 3. [`Primes`]: a plain blocking `Iterator` that owns its own Tokio
//!    runtime; the caller blocks only inside `next()`.
//!
//! Handles are cheap to clone. Every clone talks to the same orchestrator,
//! which serializes the requests, so clones never see the same prime twice.

use futures::Stream;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::config::{SieveConfig, Variant};
use crate::error::SieveError;
use crate::message::{OrchestratorRequest, OrchestratorStatus};
use crate::stats::{SieveStats, StatsSnapshot};
use crate::{blocking, orchestrator};

/// Entry point for starting a sieve.
pub struct Sieve;

impl Sieve {
    /// Validates `config`, spawns shards and orchestrator on the current runtime.
    pub async fn spawn(config: SieveConfig) -> Result<SieveHandle, SieveError> {
        config.validate()?;
        let stats = SieveStats::new();
        let tx = match config.variant {
            Variant::Nonblocking => orchestrator::spawn(&config, Arc::clone(&stats)).await?,
            Variant::Blocking => blocking::spawn(&config, Arc::clone(&stats)).await?,
        };
        info!(
            variant = %config.variant,
            shards = config.shards,
            "sieve started"
        );
        Ok(SieveHandle { tx, stats })
    }
}

#[derive(Clone, Debug)]
pub struct SieveHandle {
    tx: mpsc::Sender<OrchestratorRequest>,
    stats: Arc<SieveStats>,
}

impl SieveHandle {
    pub async fn next_prime(&self) -> Result<u64, SieveError> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorRequest::Next { reply }).await?;
        rx.await.map_err(|_| SieveError::orchestrator_gone())?
    }

    /// The next `n` primes, in order.
    pub async fn take(&self, n: usize) -> Result<Vec<u64>, SieveError> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.next_prime().await?);
        }
        Ok(out)
    }

    pub async fn status(&self) -> Result<OrchestratorStatus, SieveError> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorRequest::Status { reply }).await?;
        rx.await.map_err(|_| SieveError::orchestrator_gone())
    }

    /// Copies of every shard's primes, in shard order.
    pub async fn shard_snapshots(&self) -> Result<Vec<Vec<u64>>, SieveError> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorRequest::ShardSnapshots { reply }).await?;
        rx.await.map_err(|_| SieveError::orchestrator_gone())?
    }

    /// Counters as of now, without a round trip through the orchestrator.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Infinite stream of primes. Ends after the first error, which it yields.
    pub fn stream(&self) -> impl Stream<Item = Result<u64, SieveError>> {
        futures::stream::unfold(Some(self.clone()), |state| async move {
            let handle = state?;
            match handle.next_prime().await {
                Ok(p) => Some((Ok(p), Some(handle))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Stops the orchestrator and every shard. Waits for the acknowledgement.
    pub async fn shutdown(&self) -> Result<(), SieveError> {
        let (response, rx) = oneshot::channel();
        self.send(OrchestratorRequest::Shutdown { response }).await?;
        rx.await.map_err(|_| SieveError::orchestrator_gone())
    }

    async fn send(&self, request: OrchestratorRequest) -> Result<(), SieveError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| SieveError::orchestrator_gone())
    }
}

/// Blocking, pull-based iterator over primes. Never restarts: build a new one
/// to begin again at 2.
pub struct Primes {
    runtime: tokio::runtime::Runtime,
    handle: SieveHandle,
    done: bool,
}

impl Primes {
    /// Builds a dedicated multi-threaded runtime and starts a sieve on it.
    pub fn start(config: SieveConfig) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("shardsieve")
            .build()?;
        let handle = runtime.block_on(Sieve::spawn(config))?;
        Ok(Primes {
            runtime,
            handle,
            done: false,
        })
    }

    pub fn handle(&self) -> &SieveHandle {
        &self.handle
    }

    /// Runs an async query against the sieve from blocking code.
    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }
}

impl Iterator for Primes {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.done {
            return None;
        }
        match self.runtime.block_on(self.handle.next_prime()) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "prime iteration stopped");
                self.done = true;
                None
            }
        }
    }
}

impl Drop for Primes {
    fn drop(&mut self) {
        if let Err(e) = self.runtime.block_on(self.handle.shutdown()) {
            warn!(error = %e, "sieve shutdown failed");
        }
    }
}
