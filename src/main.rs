//! nstep-collector: recurrent n-step trajectory collection
//!
//! Subcommands:
//!
//! - `collect` -- Run the collector against the simulated runner and write
//!   windows as JSON lines
//! - `config`  -- Print the effective configuration

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nstep_collector::agent::{ActionSpace, RandomAgent};
use nstep_collector::config::CollectorConfig;
use nstep_collector::env::{RunnerConfig, RunnerEnv};
use nstep_collector::trajectory::TrajectoryCollector;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Recurrent n-step trajectory collection for RL agents
#[derive(Parser)]
#[command(name = "nstep-collector", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect windows from the simulated runner with a random agent.
    Collect {
        /// Number of windows to collect.
        #[arg(long, default_value_t = 1000)]
        windows: usize,

        /// Write windows to this file as JSON lines.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Seed for the environment and the agent.
        #[arg(long)]
        seed: Option<u64>,

        /// Probability that a runner reset finds no playable screen.
        #[arg(long, default_value_t = 0.0)]
        reset_failure_rate: f64,
    },

    /// Print the effective configuration as JSON.
    Config,
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CollectorConfig::load(path)?,
        None => CollectorConfig::default(),
    };

    match cli.command {
        Commands::Collect {
            windows,
            output,
            seed,
            reset_failure_rate,
        } => cmd_collect(&config, windows, output.as_deref(), seed, reset_failure_rate),
        Commands::Config => cmd_config(&config),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_collect(
    config: &CollectorConfig,
    windows: usize,
    output: Option<&Path>,
    seed: Option<u64>,
    reset_failure_rate: f64,
) -> Result<()> {
    tracing::info!(windows, n_step = config.n_step, "Collecting windows");

    let runner = RunnerConfig {
        reset_failure_rate,
        ..RunnerConfig::default()
    };
    let actions = ActionSpace::new(config.num_actions);
    let (env, agent) = match seed {
        Some(seed) => (RunnerEnv::new(runner, seed), RandomAgent::new(actions, seed)),
        None => (
            RunnerEnv::new(runner, rand::random()),
            RandomAgent::from_entropy(actions),
        ),
    };
    let mut collector = TrajectoryCollector::new(config.clone(), env, agent)?;

    let mut sink = match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Some(BufWriter::new(file))
        }
        None => None,
    };

    let mut collected = 0usize;
    let mut returns: Vec<f64> = Vec::new();
    while collected < windows {
        let window = match collector.next() {
            Some(window) => window.context("Trajectory collection failed")?,
            None => break,
        };
        collected += 1;

        if let Some(out) = sink.as_mut() {
            serde_json::to_writer(&mut *out, &window)?;
            out.write_all(b"\n")?;
        }

        for ret in collector.drain_episode_rewards() {
            tracing::info!(episode = returns.len(), reward = ret, "Episode return");
            returns.push(ret);
        }
    }

    if let Some(mut out) = sink {
        out.flush()?;
    }

    let mean = if returns.is_empty() {
        0.0
    } else {
        returns.iter().sum::<f64>() / returns.len() as f64
    };
    tracing::info!(
        windows = collected,
        episodes = returns.len(),
        mean_return = format!("{mean:.2}"),
        "Collection finished"
    );
    if let Some(path) = output {
        tracing::info!(path = %path.display(), "Saved windows");
    }
    Ok(())
}

fn cmd_config(config: &CollectorConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
