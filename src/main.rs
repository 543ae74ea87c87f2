//! # Main — CLI Entry Point
//!
//! Parses arguments, sets up logging and hands off to `cli` for execution.
//!
//! ## Global Options
//!
//! - `--config` / `SHARDSIEVE_CONFIG`: TOML file with a `[sieve]` table.
//! - `--shards` / `SHARDSIEVE_SHARDS`: number of shard actors.
//! - `--variant`: `nonblocking` (default) or `blocking` orchestrator.
//! - `--seeding`: `spread` (one seed per shard) or `replicate`.
//! - `--rng-seed`: fixes the random shard choice for reproducible layouts.
//!
//! Flags override the config file, which overrides built-in defaults.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use shardsieve::{Seeding, Variant};
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "shardsieve", about = "Discover primes by polling a pool of shard actors")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, env = "SHARDSIEVE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of shard actors
    #[arg(long, env = "SHARDSIEVE_SHARDS")]
    shards: Option<usize>,

    /// Orchestrator variant
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// How the seed primes 2, 3, 5, 7 are placed on shards
    #[arg(long, value_enum)]
    seeding: Option<Seeding>,

    /// Per-actor mailbox capacity
    #[arg(long)]
    mailbox_capacity: Option<usize>,

    /// Seed for the random shard choice (random if unset)
    #[arg(long, env = "SHARDSIEVE_RNG_SEED")]
    rng_seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the first N primes
    Take {
        /// How many primes to produce
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Emit a JSON document instead of one prime per line
        #[arg(long)]
        json: bool,
        /// Also print what each shard knows at the end
        #[arg(long)]
        show_shards: bool,
    },
    /// Print the N-th prime (1-based)
    Nth {
        /// Position in the prime sequence
        #[arg(long)]
        n: usize,
    },
    /// Run N calls and print the round counters as JSON
    Stats {
        /// How many primes to produce first
        #[arg(long, default_value_t = 100)]
        count: usize,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for machine-readable logs, human-readable otherwise
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let config = cli::resolve_config(&cli)?;

    match &cli.command {
        Commands::Take {
            count,
            json,
            show_shards,
        } => cli::run_take(config, *count, *json, *show_shards),
        Commands::Nth { n } => cli::run_nth(config, *n),
        Commands::Stats { count } => cli::run_stats(config, *count),
    }
}
