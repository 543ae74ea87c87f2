//! # Tally — Vote Accumulator for One Round
//!
//! Collects one vote per shard for the active candidate. Votes tagged with any
//! other candidate are stale (left over from a round that already resolved)
//! and are dropped without touching the accumulator.
//!
//! The accumulator never holds more votes than there are shards, and it is
//! emptied whenever a round completes, whatever the verdict.

use crate::message::{Vote, VoteReply};

/// Result of feeding one vote into the tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyOutcome {
    /// Tagged with a different candidate; ignored.
    Stale,
    /// Accepted, more votes still outstanding.
    Pending,
    /// Every shard voted `Prime`.
    Accepted(u64),
    /// At least one shard voted `NotPrime` or `Unknown`.
    Rejected(u64),
}

#[derive(Debug)]
pub struct Tally {
    candidate: Option<u64>,
    votes: Vec<Vote>,
    expected: usize,
}

impl Tally {
    pub fn new(expected: usize) -> Self {
        Tally {
            candidate: None,
            votes: Vec::with_capacity(expected),
            expected,
        }
    }

    /// Opens a round for `candidate`. Any leftover votes are discarded.
    pub fn open(&mut self, candidate: u64) {
        self.votes.clear();
        self.candidate = Some(candidate);
    }

    /// Abandons the current round, if any.
    pub fn close(&mut self) {
        self.votes.clear();
        self.candidate = None;
    }

    pub fn active_candidate(&self) -> Option<u64> {
        self.candidate
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn record(&mut self, reply: VoteReply) -> TallyOutcome {
        let candidate = match self.candidate {
            Some(c) if c == reply.candidate => c,
            _ => return TallyOutcome::Stale,
        };

        self.votes.push(reply.vote);
        if self.votes.len() < self.expected {
            return TallyOutcome::Pending;
        }

        let unanimous = self.votes.iter().all(|v| v.is_affirmative());
        self.close();
        if unanimous {
            TallyOutcome::Accepted(candidate)
        } else {
            TallyOutcome::Rejected(candidate)
        }
    }
}
