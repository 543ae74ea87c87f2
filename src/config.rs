//! # Config — Sieve Settings from TOML and the Command Line
//!
//! A config file holds a single `[sieve]` table. Every field is optional and
//! falls back to the defaults below; CLI flags are applied on top.
//!
//! ```toml
//! [sieve]
//! shards = 4
//! variant = "nonblocking"   # or "blocking"
//! seeding = "spread"        # or "replicate"
//! mailbox_capacity = 64
//! rng_seed = 42
//! shutdown_timeout_secs = 3
//! ```
//!
//! ## Seeding
//!
//! - **spread**: seed prime `i` goes to shard `i % shards`. Only valid for up
//!   to four shards, otherwise a shard starts empty, votes `Unknown` on every
//!   candidate, and no prime past 7 is ever accepted.
//! - **replicate**: every shard gets all four seeds.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SieveError;
use crate::SEED_PRIMES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Orchestrator keeps servicing its mailbox while votes are outstanding.
    Nonblocking,
    /// Orchestrator awaits every round inline before taking the next message.
    Blocking,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Nonblocking => write!(f, "nonblocking"),
            Variant::Blocking => write!(f, "blocking"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Seeding {
    Spread,
    Replicate,
}

impl std::fmt::Display for Seeding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Seeding::Spread => write!(f, "spread"),
            Seeding::Replicate => write!(f, "replicate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SieveConfig {
    pub shards: usize,
    pub variant: Variant,
    pub seeding: Seeding,
    pub mailbox_capacity: usize,
    pub rng_seed: Option<u64>,
    pub shutdown_timeout_secs: u64,
}

impl Default for SieveConfig {
    fn default() -> Self {
        SieveConfig {
            shards: SEED_PRIMES.len(),
            variant: Variant::Nonblocking,
            seeding: Seeding::Spread,
            mailbox_capacity: 64,
            rng_seed: None,
            shutdown_timeout_secs: 3,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    sieve: SieveConfig,
}

impl SieveConfig {
    pub fn parse_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).context("invalid sieve config TOML")?;
        Ok(file.sieve)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse_toml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), SieveError> {
        if self.shards == 0 {
            return Err(SieveError::InvalidConfig(
                "at least one shard is required".into(),
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(SieveError::InvalidConfig(
                "mailbox_capacity must be positive".into(),
            ));
        }
        if self.seeding == Seeding::Spread && self.shards > SEED_PRIMES.len() {
            return Err(SieveError::InvalidConfig(format!(
                "spread seeding supports at most {} shards (got {}); use replicate seeding",
                SEED_PRIMES.len(),
                self.shards
            )));
        }
        Ok(())
    }

    /// Which seed primes shard `shard` starts with.
    pub fn seeds_for(&self, shard: usize) -> Vec<u64> {
        match self.seeding {
            Seeding::Replicate => SEED_PRIMES.to_vec(),
            Seeding::Spread => SEED_PRIMES
                .iter()
                .enumerate()
                .filter(|(i, _)| i % self.shards == shard)
                .map(|(_, &p)| p)
                .collect(),
        }
    }
}
