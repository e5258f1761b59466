//! Headless skirmish runner.
//!
//! Runs scripted battles without graphics and prints JSON reports on stdout.
//! Designed for CI determinism checks, replay verification and AI tuning.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario and keep its replay
//! cargo run -p skirmish_headless -- run scenarios/skirmish.ron --replay-out match.replay
//!
//! # Check a scenario gives the same result on every thread
//! cargo run -p skirmish_headless -- verify scenarios/skirmish.ron --runs 8
//!
//! # Play a replay back and compare its final hash
//! cargo run -p skirmish_headless -- replay match.replay
//!
//! # Measure throughput
//! cargo run -p skirmish_headless --release -- bench --units 128 --ticks 2000
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the default level.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish_core::replay::Replay;
use skirmish_headless::runner::{bench, play_replay, run_scenario, verify_scenario, RunOptions};
use skirmish_headless::scenario::Scenario;

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless skirmish runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario to completion
    Run {
        /// Scenario file (RON)
        scenario: PathBuf,

        /// Override the scenario's tick limit
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Write a replay of the match here
        #[arg(long)]
        replay_out: Option<PathBuf>,
    },

    /// Run a scenario several times in parallel and compare results
    Verify {
        /// Scenario file (RON)
        scenario: PathBuf,

        /// Number of runs
        #[arg(short, long, default_value = "4")]
        runs: usize,
    },

    /// Play back a replay file and check its final hash
    Replay {
        /// Replay file
        file: PathBuf,

        /// The replay was recorded with navigation enabled
        #[arg(long)]
        navigated: bool,
    },

    /// Time a mirrored battle
    Bench {
        /// Units per side
        #[arg(short, long, default_value = "64")]
        units: u32,

        /// Ticks to simulate
        #[arg(short, long, default_value = "1000")]
        ticks: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // stdout carries the JSON report
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            ticks,
            replay_out,
        } => cmd_run(&scenario, ticks, replay_out.as_deref()),
        Commands::Verify { scenario, runs } => cmd_verify(&scenario, runs),
        Commands::Replay { file, navigated } => cmd_replay(&file, navigated),
        Commands::Bench { units, ticks } => cmd_bench(units, ticks),
    }
}

fn load_scenario(path: &Path) -> Scenario {
    match Scenario::load(path) {
        Ok(scenario) => scenario,
        Err(e) => fail(&format!("Cannot load scenario '{}': {e}", path.display())),
    }
}

fn cmd_run(path: &Path, ticks: Option<u64>, replay_out: Option<&Path>) {
    let scenario = load_scenario(path);
    let options = RunOptions {
        max_ticks: ticks,
        record_replay: replay_out.is_some(),
    };

    let outcome = match run_scenario(&scenario, options) {
        Ok(outcome) => outcome,
        Err(e) => fail(&format!("Match failed: {e}")),
    };

    if let (Some(out), Some(replay)) = (replay_out, outcome.replay.as_ref()) {
        if let Err(e) = replay.save(out) {
            fail(&format!("Failed to save replay '{}': {e}", out.display()));
        }
        tracing::info!(path = %out.display(), orders = replay.order_count(), "Replay saved");
    }

    print_json(&outcome.report);
}

fn cmd_verify(path: &Path, runs: usize) {
    let scenario = load_scenario(path);
    let report = match verify_scenario(&scenario, runs.max(2)) {
        Ok(report) => report,
        Err(e) => fail(&format!("Verification failed: {e}")),
    };
    print_json(&report);
    if !report.deterministic {
        std::process::exit(1);
    }
}

fn cmd_replay(path: &Path, navigated: bool) {
    let replay = match Replay::load(path) {
        Ok(replay) => replay,
        Err(e) => fail(&format!("Cannot load replay '{}': {e}", path.display())),
    };
    match play_replay(&replay, navigated) {
        Ok(sim) => {
            tracing::info!(tick = sim.get_tick(), "Replay verified");
            print_json(&serde_json::json!({
                "scenario": replay.scenario_id,
                "ticks": sim.get_tick(),
                "final_hash": sim.state_hash(),
                "verified": true,
            }));
        }
        Err(e) => fail(&format!("Replay verification failed: {e}")),
    }
}

fn cmd_bench(units: u32, ticks: u64) {
    match bench(units, ticks) {
        Ok(report) => {
            tracing::info!(
                ticks_per_second = format!("{:.1}", report.ticks_per_second),
                "Benchmark finished"
            );
            print_json(&report);
        }
        Err(e) => fail(&format!("Benchmark failed: {e}")),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(&format!("Failed to serialize report: {e}")),
    }
}

fn fail(message: &str) -> ! {
    tracing::error!("{message}");
    eprintln!("FATAL: {message}");
    std::process::exit(1);
}
