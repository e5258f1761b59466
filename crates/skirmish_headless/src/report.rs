//! Match reports printed as JSON.
//!
//! A [`ReportCollector`] folds every tick's events into running totals;
//! [`ReportCollector::finish`] turns them into a [`MatchReport`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use skirmish_core::components::Team;
use skirmish_core::events::TickEvents;
use skirmish_core::simulation::Simulation;

/// Outcome of one headless match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Scenario name.
    pub scenario: String,
    /// Ticks simulated.
    pub ticks: u64,
    /// Sole surviving team, if exactly one team has units left.
    pub winner: Option<u8>,
    /// Live units per team at the end, keyed by team.
    pub survivors: BTreeMap<u8, usize>,
    /// Units killed per team, keyed by the team that lost them.
    pub losses: BTreeMap<u8, usize>,
    /// Total deaths.
    pub deaths: usize,
    /// Total health removed.
    pub total_damage: u64,
    /// Attacks started.
    pub attacks: usize,
    /// Projectiles launched.
    pub projectiles: usize,
    /// Move orders given up as unreachable.
    pub moves_abandoned: usize,
    /// Orders delivered from the scenario script.
    pub orders_issued: usize,
    /// Final state hash.
    pub final_hash: u64,
}

/// Result of running one scenario several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Scenario name.
    pub scenario: String,
    /// Number of runs.
    pub runs: usize,
    /// Final hash of each run.
    pub hashes: Vec<u64>,
    /// Whether every run ended with the same hash.
    pub deterministic: bool,
}

impl VerifyReport {
    /// Build a report from per-run hashes.
    #[must_use]
    pub fn from_hashes(scenario: impl Into<String>, hashes: Vec<u64>) -> Self {
        Self {
            scenario: scenario.into(),
            runs: hashes.len(),
            deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
            hashes,
        }
    }
}

/// Throughput measurement from the `bench` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    /// Units per side.
    pub units_per_side: u32,
    /// Ticks simulated.
    pub ticks: u64,
    /// Wall-clock time spent ticking.
    pub elapsed_ms: u128,
    /// Ticks per wall-clock second.
    pub ticks_per_second: f64,
    /// The match itself.
    pub report: MatchReport,
}

/// Accumulates tick events into a [`MatchReport`].
#[derive(Debug, Clone, Default)]
pub struct ReportCollector {
    report: MatchReport,
}

impl ReportCollector {
    /// Start collecting for `scenario`.
    #[must_use]
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            report: MatchReport {
                scenario: scenario.into(),
                ..Default::default()
            },
        }
    }

    /// Fold one tick's events in.
    pub fn record(&mut self, events: &TickEvents) {
        let report = &mut self.report;
        for death in &events.deaths {
            *report.losses.entry(death.team.0).or_default() += 1;
        }
        report.deaths += events.deaths.len();
        report.total_damage += events.total_damage();
        report.attacks += events.attacks_started.len();
        report.projectiles += events.projectiles_spawned.len();
        report.moves_abandoned += events.moves_abandoned.len();
    }

    /// Count delivered scripted orders.
    pub fn record_orders(&mut self, count: usize) {
        self.report.orders_issued += count;
    }

    /// Close the report against the final simulation state.
    #[must_use]
    pub fn finish(mut self, sim: &Simulation) -> MatchReport {
        let mut survivors: BTreeMap<u8, usize> = BTreeMap::new();
        for (_, unit) in sim.units().iter() {
            if unit.alive {
                *survivors.entry(unit.team.0).or_default() += 1;
            }
        }
        for team in self.report.losses.keys() {
            survivors.entry(*team).or_default();
        }

        let standing: Vec<u8> = survivors
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(team, _)| *team)
            .collect();
        self.report.winner = match standing.as_slice() {
            [team] if survivors.len() > 1 => Some(*team),
            _ => None,
        };

        self.report.survivors = survivors;
        self.report.ticks = sim.get_tick();
        self.report.final_hash = sim.state_hash();
        self.report
    }
}

/// Teams with at least one live unit.
#[must_use]
pub fn teams_standing(sim: &Simulation) -> Vec<Team> {
    let mut teams: Vec<Team> = sim
        .units()
        .iter()
        .filter(|(_, unit)| unit.alive)
        .map(|(_, unit)| unit.team)
        .collect();
    teams.sort_unstable_by_key(|team| team.0);
    teams.dedup();
    teams
}
