//! Property-based tests for the shard voting rule, the vote tally and the
//! candidate generator.
//!
//! These run purely in memory (no actors) and use `proptest` to check that
//! the invariants hold across randomly generated inputs.
//!
//! # How to run
//!
//! ```bash
//! cargo test --test property_tests
//! PROPTEST_CASES=10000 cargo test --test property_tests
//! ```

use proptest::prelude::*;
use shardsieve::candidates::Candidates;
use shardsieve::message::VoteReply;
use shardsieve::shard::ShardKnowledge;
use shardsieve::tally::{Tally, TallyOutcome};
use shardsieve::{is_prime_reference, Vote};

const SMALL_PRIMES: [u64; 15] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47];

fn generator_primes() -> Vec<u64> {
    (11u64..50_000).filter(|&n| is_prime_reference(n)).collect()
}

fn vote_strategy() -> impl Strategy<Value = Vote> {
    prop_oneof![Just(Vote::Unknown), Just(Vote::Prime), Just(Vote::NotPrime)]
}

proptest! {
    /// A shard votes `NotPrime` exactly when one of its primes, other than the
    /// candidate itself, divides the candidate.
    #[test]
    fn prop_shard_vote_matches_divisibility(
        mask in 1u16..(1 << 15),
        candidate in 1u64..100_000,
    ) {
        let mut k = ShardKnowledge::new();
        let known: Vec<u64> = SMALL_PRIMES
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, &p)| p)
            .collect();
        for &p in &known {
            k.add(p);
        }
        let divided = known.iter().any(|&p| p != candidate && candidate % p == 0);
        let expected = if divided { Vote::NotPrime } else { Vote::Prime };
        prop_assert_eq!(k.vote(candidate), expected);
    }

    /// Insertion order and duplicates never change a vote.
    #[test]
    fn prop_shard_vote_ignores_order_and_duplicates(
        mut primes in prop::collection::vec(prop::sample::select(SMALL_PRIMES.to_vec()), 1..20),
        candidate in 1u64..10_000,
    ) {
        let mut a = ShardKnowledge::new();
        for &p in &primes {
            a.add(p);
        }
        primes.sort_unstable();
        primes.dedup();
        let mut b = ShardKnowledge::new();
        for &p in primes.iter().rev() {
            b.add(p);
        }
        prop_assert_eq!(a.vote(candidate), b.vote(candidate));
    }

    /// Splitting knowledge over several shards and requiring unanimity gives
    /// the same verdict as one shard holding everything.
    #[test]
    fn prop_unanimity_over_split_equals_union(
        assignment in prop::collection::vec(0usize..4, SMALL_PRIMES.len()),
        candidate in 2u64..5_000,
    ) {
        let mut shards: Vec<ShardKnowledge> = (0..4).map(|_| ShardKnowledge::new()).collect();
        let mut union = ShardKnowledge::new();
        for (&p, &s) in SMALL_PRIMES.iter().zip(&assignment) {
            shards[s].add(p);
            union.add(p);
        }
        // Empty shards vote Unknown, which blocks acceptance outright.
        let any_empty = shards.iter().any(ShardKnowledge::is_empty);
        let unanimous = shards.iter().all(|s| s.vote(candidate).is_affirmative());
        if any_empty {
            prop_assert!(!unanimous);
        } else {
            prop_assert_eq!(unanimous, union.vote(candidate) == Vote::Prime);
        }
    }

    /// The tally accepts only when every vote is `Prime`, never holds more
    /// than `expected` votes, and ignores votes for other candidates.
    #[test]
    fn prop_tally_requires_unanimity(
        votes in prop::collection::vec(vote_strategy(), 1..12),
        stale in prop::collection::vec(1u64..1000, 0..6),
    ) {
        let candidate = 1001;
        let mut t = Tally::new(votes.len());
        t.open(candidate);
        for &s in &stale {
            prop_assert_eq!(
                t.record(VoteReply { shard: 0, candidate: s, vote: Vote::Prime }),
                TallyOutcome::Stale
            );
        }
        let mut last = TallyOutcome::Pending;
        for (i, &vote) in votes.iter().enumerate() {
            prop_assert!(t.len() <= votes.len());
            last = t.record(VoteReply { shard: i, candidate, vote });
        }
        let unanimous = votes.iter().all(|v| *v == Vote::Prime);
        if unanimous {
            prop_assert_eq!(last, TallyOutcome::Accepted(candidate));
        } else {
            prop_assert_eq!(last, TallyOutcome::Rejected(candidate));
        }
        prop_assert!(t.is_empty());
    }

    /// Every prime above 10 shows up in the candidate sequence.
    #[test]
    fn prop_generator_covers_every_prime(n in prop::sample::select(generator_primes())) {
        prop_assert!(Candidates::new().take_while(|&c| c <= n).any(|c| c == n));
    }
}
