//! Headless match execution.
//!
//! Runs scenarios to completion, optionally recording a replay, and checks
//! determinism by running the same scenario on several threads.

use std::time::Instant;

use rayon::prelude::*;

use skirmish_core::dispatcher::OrderDispatcher;
use skirmish_core::replay::Replay;
use skirmish_core::simulation::Simulation;

use crate::report::{teams_standing, BenchReport, MatchReport, ReportCollector, VerifyReport};
use crate::scenario::{Scenario, ScenarioError};

/// Options for a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Override the scenario's tick limit.
    pub max_ticks: Option<u64>,
    /// Record every delivered order into a [`Replay`].
    pub record_replay: bool,
}

/// A finished match.
#[derive(Debug)]
pub struct MatchOutcome {
    /// Summary statistics.
    pub report: MatchReport,
    /// Recorded replay, when requested.
    pub replay: Option<Replay>,
}

/// Run `scenario` until one team is left standing or the tick limit is hit.
///
/// # Errors
///
/// Returns an error if the scenario cannot be built or the replay cannot be
/// snapshotted.
pub fn run_scenario(
    scenario: &Scenario,
    options: RunOptions,
) -> Result<MatchOutcome, ScenarioError> {
    let mut sim = scenario.build()?;
    let mut replay = if options.record_replay {
        Some(Replay::new(scenario.name.clone(), &sim)?)
    } else {
        None
    };

    let max_ticks = options.max_ticks.unwrap_or(scenario.max_ticks);
    let contested = teams_standing(&sim).len() > 1;
    let dispatcher = OrderDispatcher::default();
    let mut collector = ReportCollector::new(scenario.name.clone());

    tracing::info!(
        scenario = %scenario.name,
        max_ticks,
        units = sim.units().len(),
        "Match started"
    );

    while sim.get_tick() < max_ticks {
        let now = sim.get_tick();
        for scripted in scenario.orders_at(now) {
            match dispatcher.issue(&mut sim, &scripted.units, scripted.target.into()) {
                Ok(accepted) => {
                    collector.record_orders(accepted.len());
                    if let Some(replay) = replay.as_mut() {
                        for (unit, order) in accepted {
                            replay.record_order(now, unit, order);
                        }
                    }
                }
                Err(e) => tracing::warn!(tick = now, error = %e, "Scripted order skipped"),
            }
        }

        let events = sim.tick();
        collector.record(&events);

        if contested && teams_standing(&sim).len() <= 1 {
            tracing::info!(tick = sim.get_tick(), "Match decided");
            break;
        }
    }

    if let Some(replay) = replay.as_mut() {
        replay.finalize(sim.get_tick(), sim.state_hash());
    }

    let report = collector.finish(&sim);
    tracing::info!(
        ticks = report.ticks,
        winner = ?report.winner,
        deaths = report.deaths,
        "Match finished"
    );
    Ok(MatchOutcome { report, replay })
}

/// Run `scenario` `runs` times in parallel and compare final hashes.
///
/// # Errors
///
/// Returns the first error any run hit.
pub fn verify_scenario(scenario: &Scenario, runs: usize) -> Result<VerifyReport, ScenarioError> {
    let hashes = (0..runs)
        .into_par_iter()
        .map(|_| {
            run_scenario(scenario, RunOptions::default()).map(|outcome| outcome.report.final_hash)
        })
        .collect::<Result<Vec<u64>, ScenarioError>>()?;

    let report = VerifyReport::from_hashes(scenario.name.clone(), hashes);
    if report.deterministic {
        tracing::info!(runs, "All runs produced identical results");
    } else {
        tracing::error!(runs, hashes = ?report.hashes, "Non-determinism detected");
    }
    Ok(report)
}

/// Play a replay back and check it reproduces its recorded hash.
///
/// Pass `navigated` for replays recorded from scenarios with navigation on.
///
/// # Errors
///
/// Returns [`ScenarioError::Setup`] wrapping
/// [`skirmish_core::error::GameError::ReplayMismatch`] when playback diverges.
pub fn play_replay(replay: &Replay, navigated: bool) -> Result<Simulation, ScenarioError> {
    let sim = if navigated {
        let tolerance = replay.restore_initial_state()?.config().ai.arrival_tolerance;
        replay.play_with_navigation(Box::new(
            skirmish_core::navigation::DirectNavigator::new(tolerance),
        ))?
    } else {
        replay.play()?
    };
    Ok(sim)
}

/// Time a mirrored battle for `ticks` ticks.
///
/// # Errors
///
/// Returns an error if the built-in scenario fails to build.
pub fn bench(units_per_side: u32, ticks: u64) -> Result<BenchReport, ScenarioError> {
    let mut scenario = Scenario::mirror_battle(units_per_side);
    scenario.max_ticks = ticks;

    let mut sim = scenario.build()?;
    let mut collector = ReportCollector::new(scenario.name.clone());
    let start = Instant::now();
    for _ in 0..ticks {
        collector.record(&sim.tick());
    }
    let elapsed = start.elapsed();

    let ticks_per_second = if elapsed.as_secs_f64() > 0.0 {
        ticks as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };
    Ok(BenchReport {
        units_per_side,
        ticks,
        elapsed_ms: elapsed.as_millis(),
        ticks_per_second,
        report: collector.finish(&sim),
    })
}
