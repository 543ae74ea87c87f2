//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Resolves the
//! effective config (defaults ← file ← flags) and runs each subcommand on a
//! blocking [`Primes`] iterator.

use anyhow::{Context, Result};
use serde::Serialize;
use shardsieve::{Primes, SieveConfig, StatsSnapshot};
use std::io::Write;
use std::time::Instant;
use tracing::info;

use super::Cli;

// ── Config Resolution ───────────────────────────────────────────

pub fn resolve_config(cli: &Cli) -> Result<SieveConfig> {
    let mut config = match &cli.config {
        Some(path) => SieveConfig::load(path)?,
        None => SieveConfig::default(),
    };
    if let Some(shards) = cli.shards {
        config.shards = shards;
    }
    if let Some(variant) = cli.variant {
        config.variant = variant;
    }
    if let Some(seeding) = cli.seeding {
        config.seeding = seeding;
    }
    if let Some(capacity) = cli.mailbox_capacity {
        config.mailbox_capacity = capacity;
    }
    if cli.rng_seed.is_some() {
        config.rng_seed = cli.rng_seed;
    }
    config.validate()?;
    Ok(config)
}

// ── Subcommands ─────────────────────────────────────────────────

#[derive(Serialize)]
struct TakeReport {
    count: usize,
    primes: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shards: Option<Vec<Vec<u64>>>,
    stats: StatsSnapshot,
}

pub fn run_take(config: SieveConfig, count: usize, json: bool, show_shards: bool) -> Result<()> {
    info!(count, variant = %config.variant, shards = config.shards, "take starting");
    let start = Instant::now();
    let mut primes = Primes::start(config)?;
    let found: Vec<u64> = primes.by_ref().take(count).collect();
    anyhow::ensure!(
        found.len() == count,
        "sieve stopped after {} of {} primes",
        found.len(),
        count
    );

    let shards = if show_shards {
        Some(
            primes
                .block_on(primes.handle().shard_snapshots())
                .context("collecting shard snapshots")?,
        )
    } else {
        None
    };
    let stats = primes.handle().stats();
    info!(
        count,
        elapsed_ms = start.elapsed().as_millis() as u64,
        broadcasts = stats.broadcasts,
        "take complete"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        let report = TakeReport {
            count,
            primes: found,
            shards,
            stats,
        };
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        for p in &found {
            writeln!(out, "{p}")?;
        }
        if let Some(shards) = shards {
            for (i, known) in shards.iter().enumerate() {
                writeln!(out, "shard {i}: {known:?}")?;
            }
        }
    }
    Ok(())
}

pub fn run_nth(config: SieveConfig, n: usize) -> Result<()> {
    anyhow::ensure!(n >= 1, "--n is 1-based and must be at least 1");
    let mut primes = Primes::start(config)?;
    let nth = primes
        .nth(n - 1)
        .with_context(|| format!("sieve stopped before prime #{n}"))?;
    println!("{nth}");
    Ok(())
}

pub fn run_stats(config: SieveConfig, count: usize) -> Result<()> {
    let mut primes = Primes::start(config)?;
    let produced = primes.by_ref().take(count).count();
    anyhow::ensure!(produced == count, "sieve stopped after {produced} primes");
    let status = primes
        .block_on(primes.handle().status())
        .context("querying orchestrator status")?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
