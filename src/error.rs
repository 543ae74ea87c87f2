//! # Error — Failure Modes of the Sieve Actors
//!
//! The protocol itself has almost no failure surface: votes for the wrong
//! candidate are dropped silently and never become errors. What remains are
//! lifecycle failures (an actor's mailbox closed underneath a caller), the
//! single-use continuation being resolved twice, the candidate generator
//! running off the end of `u64`, and configuration rejected at startup.

/// Errors surfaced by the sieve library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SieveError {
    #[error("{actor} has shut down")]
    ActorGone { actor: &'static str },
    #[error("reply channel dropped before a value was delivered")]
    ReplyDropped,
    #[error("reply continuation was already resolved")]
    ContinuationSpent,
    #[error("candidate generator exhausted")]
    CandidatesExhausted,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SieveError {
    pub(crate) const fn orchestrator_gone() -> Self {
        SieveError::ActorGone {
            actor: "orchestrator",
        }
    }

    pub(crate) const fn shard_gone() -> Self {
        SieveError::ActorGone { actor: "shard" }
    }
}
