//! Headless Flotilla runner.
//!
//! # Usage
//!
//! ```bash
//! # One run of the bundled skirmish
//! cargo run -p flotilla-headless -- run --seed 7
//!
//! # 200 seeds of a custom level with tuned constants
//! cargo run -p flotilla-headless -- batch --level my_level.json --config tuning.json --count 200
//! ```
//!
//! Summaries go to stdout as JSON; logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flotilla_core::{LevelDesc, SimConfig};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flotilla_headless::{run_batch, run_level, BatchConfig, RunConfig, SKIRMISH};

#[derive(Parser)]
#[command(name = "flotilla-headless")]
#[command(about = "Run Flotilla levels without graphics")]
#[command(version)]
struct Cli {
    /// Enable debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Level description (defaults to the bundled skirmish)
    #[arg(short, long, global = true)]
    level: Option<PathBuf>,

    /// Simulation constants override
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Maximum ticks per run (60 per simulated second)
    #[arg(short, long, global = true, default_value = "7200")]
    ticks: u64,

    /// Keep running after one team has won
    #[arg(long, global = true)]
    full: bool,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single seed
    Run {
        /// Random seed
        #[arg(short, long, default_value = "0")]
        seed: u64,
    },

    /// Run many seeds in parallel
    Batch {
        /// Number of runs
        #[arg(short = 'n', long, default_value = "16")]
        count: u32,

        /// Seed of the first run
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Worker threads (0 = one per core)
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the JSON summary
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let level = load_level(cli.level.as_deref())?;
    let sim_config = load_config(cli.config.as_deref())?;
    let mut run = RunConfig::default().with_ticks(cli.ticks);
    if cli.full {
        run = run.run_to_end();
    }

    match cli.command {
        Commands::Run { seed } => {
            let summary = run_level(&level, &sim_config, seed, &run)
                .with_context(|| format!("run with seed {seed} failed"))?;
            print_json(&summary, cli.pretty)
        }
        Commands::Batch {
            count,
            seed,
            threads,
        } => {
            let config = BatchConfig {
                threads,
                ..BatchConfig::new(count).with_seed(seed).with_run(run)
            };
            let results = run_batch(&level, &sim_config, &config);
            print_json(&results, cli.pretty)
        }
    }
}

fn load_level(path: Option<&Path>) -> Result<LevelDesc> {
    let Some(path) = path else {
        return Ok(LevelDesc::from_json_str(SKIRMISH)?);
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read level {}", path.display()))?;
    LevelDesc::from_json_str(&json).with_context(|| format!("invalid level {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    SimConfig::from_json_str(&json).with_context(|| format!("invalid config {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
