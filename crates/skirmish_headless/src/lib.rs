//! Headless skirmish runner for CI and AI tuning.
//!
//! Loads battle scenarios from RON, runs them on [`skirmish_core`] without
//! graphics and reports the outcome as JSON:
//!
//! - **Scenarios**: unit types, placements, patrol routes and scripted orders
//! - **Determinism checks**: the same scenario run in parallel must hash equal
//! - **Replays**: recorded orders played back against the recorded hash
//!
//! # Example
//!
//! ```bash
//! cargo run -p skirmish_headless -- run scenarios/skirmish.ron
//! ```

pub mod report;
pub mod runner;
pub mod scenario;

pub use report::{BenchReport, MatchReport, ReportCollector, VerifyReport};
pub use runner::{bench, play_replay, run_scenario, verify_scenario, MatchOutcome, RunOptions};
pub use scenario::{Scenario, ScenarioError, ScenarioOrder, ScenarioTarget, UnitPlacement};
