//! Scenario loading and setup.
//!
//! Scenarios define the initial battle for headless runs: unit templates,
//! where each team's units stand, standing patrols, and orders issued at
//! fixed ticks.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use skirmish_core::components::{EntityId, Team, TargetPriority, WeaponKind};
use skirmish_core::config::SimulationConfig;
use skirmish_core::data::{UnitCatalog, UnitData, WeaponData};
use skirmish_core::dispatcher::OrderTarget;
use skirmish_core::error::GameError;
use skirmish_core::formation::{compute_formation_positions, FormationShape};
use skirmish_core::math::{fixed_decimal, vec2_decimal, Fixed, Vec2Fixed};
use skirmish_core::navigation::DirectNavigator;
use skirmish_core::simulation::Simulation;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The simulation rejected the setup.
    #[error("Invalid scenario: {0}")]
    Setup(#[from] GameError),
}

/// A point written as an `(x, y)` decimal pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioPoint(#[serde(with = "vec2_decimal")] pub Vec2Fixed);

/// A group of identical units placed in formation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Template id from [`Scenario::units`].
    pub template: String,
    /// Owning team.
    pub team: u8,
    /// Formation anchor.
    pub at: ScenarioPoint,
    /// Number of units.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Layout of the group.
    #[serde(default)]
    pub formation: FormationShape,
    /// Distance between neighbours.
    #[serde(with = "fixed_decimal", default = "default_spacing")]
    pub spacing: Fixed,
    /// Standing patrol route for every unit in the group.
    #[serde(default)]
    pub patrol: Vec<ScenarioPoint>,
}

fn default_count() -> u32 {
    1
}

fn default_spacing() -> Fixed {
    Fixed::from_num(2)
}

impl UnitPlacement {
    /// Place `count` units of `template` at `(x, y)`.
    #[must_use]
    pub fn new(template: impl Into<String>, team: u8, x: i32, y: i32, count: u32) -> Self {
        Self {
            template: template.into(),
            team,
            at: ScenarioPoint(Vec2Fixed::from_ints(x, y)),
            count,
            formation: FormationShape::Line,
            spacing: default_spacing(),
            patrol: Vec::new(),
        }
    }
}

/// What a scripted order points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioTarget {
    /// Move to a point in formation.
    Point(ScenarioPoint),
    /// Attack a unit.
    Entity(EntityId),
    /// Halt.
    Stop,
}

impl From<ScenarioTarget> for OrderTarget {
    fn from(target: ScenarioTarget) -> Self {
        match target {
            ScenarioTarget::Point(point) => OrderTarget::Point(point.0),
            ScenarioTarget::Entity(id) => OrderTarget::Entity(id),
            ScenarioTarget::Stop => OrderTarget::Stop,
        }
    }
}

/// A group order issued before `tick` is simulated.
///
/// Unit ids are assigned from 1 in placement order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOrder {
    /// Tick before which the order is issued.
    pub tick: u64,
    /// Selected units.
    pub units: Vec<EntityId>,
    /// Order target.
    pub target: ScenarioTarget,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Tick limit; the match ends earlier once a team is wiped out.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Delegate all movement to a [`DirectNavigator`].
    #[serde(default)]
    pub navigation: bool,
    /// Simulation tuning.
    #[serde(default)]
    pub config: SimulationConfig,
    /// Unit templates.
    pub units: Vec<UnitData>,
    /// Starting units.
    pub placements: Vec<UnitPlacement>,
    /// Scripted group orders.
    #[serde(default)]
    pub orders: Vec<ScenarioOrder>,
}

fn default_max_ticks() -> u64 {
    2_400
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Built-in soldier and archer templates.
    #[must_use]
    pub fn standard_units() -> Vec<UnitData> {
        vec![
            UnitData {
                id: "soldier".to_string(),
                health: 100,
                armor: 2,
                threat: Fixed::from_num(1),
                speed: Fixed::from_num(0.25),
                turn_rate: Fixed::from_num(0.3),
                sight_range: Fixed::from_num(15),
                lose_interest_range: Fixed::from_num(25),
                priority: TargetPriority::Closest,
                weapon: Some(WeaponData {
                    kind: WeaponKind::Melee,
                    damage: 20,
                    range: Fixed::from_num(1.5),
                    cooldown_ticks: 20,
                    activation_delay_ticks: 4,
                }),
            },
            UnitData {
                id: "archer".to_string(),
                health: 60,
                armor: 0,
                threat: Fixed::from_num(2),
                speed: Fixed::from_num(0.2),
                turn_rate: Fixed::from_num(0.3),
                sight_range: Fixed::from_num(18),
                lose_interest_range: Fixed::from_num(25),
                priority: TargetPriority::Weakest,
                weapon: Some(WeaponData {
                    kind: WeaponKind::Ranged,
                    damage: 12,
                    range: Fixed::from_num(8),
                    cooldown_ticks: 30,
                    activation_delay_ticks: 6,
                }),
            },
        ]
    }

    /// A mirrored soldiers-and-archers battle with `per_side` units per team.
    #[must_use]
    pub fn mirror_battle(per_side: u32) -> Self {
        let archers = per_side / 3;
        let soldiers = per_side - archers;
        let mut placements = vec![
            UnitPlacement::new("soldier", 0, -6, 0, soldiers),
            UnitPlacement::new("soldier", 1, 6, 0, soldiers),
        ];
        if archers > 0 {
            placements.push(UnitPlacement::new("archer", 0, -11, 0, archers));
            placements.push(UnitPlacement::new("archer", 1, 11, 0, archers));
        }

        Self {
            name: "mirror_battle".to_string(),
            description: format!("{per_side} vs {per_side} soldiers and archers"),
            max_ticks: default_max_ticks(),
            navigation: false,
            config: SimulationConfig::default(),
            units: Self::standard_units(),
            placements,
            orders: Vec::new(),
        }
    }

    /// Template catalog for this scenario.
    #[must_use]
    pub fn catalog(&self) -> UnitCatalog {
        UnitCatalog::new(self.units.clone())
    }

    /// Build the starting simulation.
    ///
    /// Placements spawn in order, so unit ids are stable across builds.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        let catalog = self.catalog();
        let mut sim = Simulation::with_config(self.config);

        for placement in &self.placements {
            let template = catalog.get(&placement.template)?;
            let count = i32::try_from(placement.count).unwrap_or(i32::MAX);
            let route: Vec<Vec2Fixed> = placement.patrol.iter().map(|p| p.0).collect();

            let positions = compute_formation_positions(
                placement.at.0,
                count,
                placement.formation,
                placement.spacing,
            );
            for position in positions {
                let mut params = template.to_spawn_params(Team(placement.team), position);
                params.navigated = self.navigation;
                let id = sim.spawn_unit(params);
                if !route.is_empty() {
                    sim.assign_patrol(id, route.clone())?;
                }
            }
        }

        if self.navigation {
            sim.set_navigation(Box::new(DirectNavigator::new(self.config.ai.arrival_tolerance)));
        }

        tracing::debug!(
            scenario = %self.name,
            units = sim.units().len(),
            "Scenario built"
        );
        Ok(sim)
    }

    /// Orders scheduled before `tick`.
    pub fn orders_at(&self, tick: u64) -> impl Iterator<Item = &ScenarioOrder> {
        self.orders.iter().filter(move |order| order.tick == tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::components::AiState;

    const SCENARIO: &str = r#"
        Scenario(
            name: "Test",
            max_ticks: 600,
            units: [
                UnitData(
                    id: "pike",
                    health: 80,
                    speed: 0.25,
                    sight_range: 12.0,
                    weapon: Some(WeaponData(
                        kind: Melee,
                        damage: 15,
                        range: 2.0,
                        cooldown_ticks: 15,
                    )),
                ),
            ],
            placements: [
                UnitPlacement(
                    template: "pike",
                    team: 0,
                    at: (-5.0, 0.0),
                    count: 3,
                    formation: Line,
                ),
                UnitPlacement(
                    template: "pike",
                    team: 1,
                    at: (5.0, 20.0),
                    patrol: [(5.0, 20.0), (5.0, 30.0)],
                ),
            ],
            orders: [
                ScenarioOrder(tick: 10, units: [1, 2, 3], target: Point((0.0, -10.0))),
                ScenarioOrder(tick: 50, units: [1], target: Entity(4)),
            ],
        )
    "#;

    #[test]
    fn test_parse_from_ron() {
        let scenario = Scenario::from_ron_str(SCENARIO).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.max_ticks, 600);
        assert!(!scenario.navigation);
        assert_eq!(scenario.placements[0].spacing, Fixed::from_num(2));
        assert_eq!(scenario.placements[1].count, 1);
        assert_eq!(scenario.orders_at(10).count(), 1);
        assert_eq!(
            OrderTarget::from(scenario.orders[0].target),
            OrderTarget::Point(Vec2Fixed::from_ints(0, -10))
        );
    }

    #[test]
    fn test_build_places_units_in_formation() {
        let scenario = Scenario::from_ron_str(SCENARIO).unwrap();
        let sim = scenario.build().unwrap();

        assert_eq!(sim.units().len(), 4);
        assert_eq!(sim.get_unit(1).unwrap().position, Vec2Fixed::from_ints(-7, 0));
        assert_eq!(sim.get_unit(3).unwrap().position, Vec2Fixed::from_ints(-3, 0));

        let guard = sim.get_unit(4).unwrap();
        assert_eq!(guard.team, Team(1));
        assert_eq!(guard.controller.patrol().map(|r| r.waypoints.len()), Some(2));
        assert_eq!(guard.controller.state(), AiState::Idle);
    }

    #[test]
    fn test_unknown_template_is_rejected() {
        let mut scenario = Scenario::mirror_battle(3);
        scenario.placements.push(UnitPlacement::new("dragon", 1, 0, 0, 1));
        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::Setup(GameError::UnknownTemplate(_)))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/nonexistent/battle.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_navigated_scenario_installs_navigator() {
        let mut scenario = Scenario::mirror_battle(3);
        scenario.navigation = true;
        let sim = scenario.build().unwrap();
        assert!(sim.navigation().is_some());
        assert!(sim.units().iter().all(|(_, unit)| unit.navigated));
    }
}
