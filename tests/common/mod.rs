//! Shared test helpers for integration tests.

#![allow(dead_code)]

use shardsieve::{is_prime_reference, SieveConfig, Variant};

/// Default config with a fixed RNG seed so shard layouts are reproducible.
pub fn config(variant: Variant) -> SieveConfig {
    SieveConfig {
        variant,
        rng_seed: Some(0x5eed),
        ..SieveConfig::default()
    }
}

/// The first `n` primes by trial division.
pub fn reference_primes(n: usize) -> Vec<u64> {
    (2u64..).filter(|&k| is_prime_reference(k)).take(n).collect()
}
