//! Batch runner.
//!
//! Runs one level under many seeds in parallel using rayon. Each run owns its
//! own [`flotilla_core::Simulation`], so runs share nothing but the inputs.

use std::collections::BTreeMap;
use std::time::Instant;

use flotilla_core::{LevelDesc, SimConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::runner::{run_level, RunConfig, RunSummary};

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of runs
    pub count: u32,
    /// Seed of the first run; run `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Worker threads (0 = rayon default)
    pub threads: usize,
    /// Settings shared by every run
    pub run: RunConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 16,
            seed_start: 0,
            threads: 0,
            run: RunConfig::default(),
        }
    }
}

impl BatchConfig {
    /// `count` runs with default settings.
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }

    /// Set the first seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the per-run settings.
    #[must_use]
    pub fn with_run(mut self, run: RunConfig) -> Self {
        self.run = run;
        self
    }
}

/// A run that failed to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed of the failing run
    pub seed: u64,
    /// Error text
    pub message: String,
}

/// Results of a batch, runs ordered by seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Completed runs
    pub runs: Vec<RunSummary>,
    /// Wins per team name; undecided runs count under "none"
    pub wins: BTreeMap<String, u32>,
    /// Runs that failed to start
    pub errors: Vec<BatchError>,
    /// Wall-clock time
    pub duration_seconds: f64,
}

/// Run `config.count` seeds of `level` in parallel.
///
/// Failures are collected per seed rather than aborting the batch.
#[must_use]
pub fn run_batch(level: &LevelDesc, sim_config: &SimConfig, config: &BatchConfig) -> BatchResults {
    let start = Instant::now();
    let seeds: Vec<u64> = (0..u64::from(config.count))
        .map(|i| config.seed_start.wrapping_add(i))
        .collect();

    let run_all = || -> Vec<(u64, flotilla_core::Result<RunSummary>)> {
        seeds
            .par_iter()
            .map(|&seed| (seed, run_level(level, sim_config, seed, &config.run)))
            .collect()
    };
    let outcomes = if config.threads == 0 {
        run_all()
    } else {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
        {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                warn!(error = %e, "Falling back to the global thread pool");
                run_all()
            }
        }
    };

    let mut runs = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    let mut wins = BTreeMap::new();
    for (seed, outcome) in outcomes {
        match outcome {
            Ok(summary) => {
                let key = summary
                    .winner
                    .map_or_else(|| "none".to_string(), |team| team.to_string());
                *wins.entry(key).or_insert(0) += 1;
                runs.push(summary);
            }
            Err(e) => {
                warn!(seed, error = %e, "Run failed");
                errors.push(BatchError {
                    seed,
                    message: e.to_string(),
                });
            }
        }
    }

    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        runs = runs.len(),
        errors = errors.len(),
        duration_seconds,
        "Batch complete"
    );
    BatchResults {
        config: config.clone(),
        runs,
        wins,
        errors,
        duration_seconds,
    }
}
