//! # Message — Closed Protocol Between Client, Orchestrator and Shards
//!
//! Every message an actor can receive is a variant of one of the enums below
//! and is matched exhaustively, so an unknown tag cannot reach a handler.
//!
//! | Message | Direction | Reply |
//! |---------|-----------|-------|
//! | `ShardRequest::Add` | orchestrator → shard | none |
//! | `ShardRequest::IsPrime` | orchestrator → shard | one `VoteReply` on the supplied channel |
//! | `ShardRequest::Snapshot` | anyone → shard | copy of the shard's primes |
//! | `OrchestratorRequest::Next` | client → orchestrator | the next prime, exactly once |
//! | `OrchestratorRequest::Status` | client → orchestrator | `OrchestratorStatus` |
//! | `OrchestratorRequest::ShardSnapshots` | client → orchestrator | every shard's primes |
//! | `*::Shutdown` | owner → actor | `()` acknowledgement |

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::error::SieveError;
use crate::stats::StatsSnapshot;

/// A shard's verdict on a candidate, relative to its own primes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    /// The shard holds no primes yet.
    Unknown,
    Prime,
    NotPrime,
}

impl Vote {
    /// Aggregation treats `Unknown` the same as `NotPrime`.
    pub fn is_affirmative(self) -> bool {
        matches!(self, Vote::Prime)
    }
}

/// A vote tagged with the candidate it answers, so late arrivals can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReply {
    pub shard: usize,
    pub candidate: u64,
    pub vote: Vote,
}

#[derive(Debug)]
pub enum ShardRequest {
    Add {
        value: u64,
    },
    IsPrime {
        candidate: u64,
        reply: mpsc::Sender<VoteReply>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<u64>>,
    },
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

/// Reply type for a `Next` request.
pub type NextReply = Result<u64, SieveError>;

#[derive(Debug)]
pub enum OrchestratorRequest {
    Next {
        reply: oneshot::Sender<NextReply>,
    },
    Status {
        reply: oneshot::Sender<OrchestratorStatus>,
    },
    /// Every shard's primes, in shard order.
    ShardSnapshots {
        reply: oneshot::Sender<Result<Vec<Vec<u64>>, SieveError>>,
    },
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    Idle,
    AwaitingVotes,
}

/// Point-in-time view of an orchestrator, answered between messages.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub state: RoundState,
    pub active_candidate: Option<u64>,
    pub votes_collected: usize,
    pub shard_count: usize,
    pub seeds_remaining: usize,
    pub backlog: usize,
    pub stats: StatsSnapshot,
}
