//! Core simulation loop.
//!
//! The simulation runs at a fixed tick rate and processes
//! all unit logic deterministically.
//!
//! # Determinism
//!
//! All operations in this module are fully deterministic:
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - No system randomness
//! - Consistent iteration order (sorted entity IDs)
//! - Every controller reads the same start-of-tick [`WorldSnapshot`], so no
//!   unit observes another unit's changes from the same tick
//!
//! # Example
//!
//! ```
//! use skirmish_core::components::{AiState, Team};
//! use skirmish_core::math::Vec2Fixed;
//! use skirmish_core::simulation::Simulation;
//! use skirmish_core::unit::UnitSpawnParams;
//!
//! let mut sim = Simulation::new();
//! let guard = sim.spawn_unit(UnitSpawnParams::default());
//! let raider = sim.spawn_unit(UnitSpawnParams {
//!     team: Team(1),
//!     position: Vec2Fixed::from_ints(10, 0),
//!     ..Default::default()
//! });
//!
//! sim.tick();
//! let guard = sim.get_unit(guard).unwrap();
//! assert_eq!(guard.controller.state(), AiState::Chase);
//! assert_eq!(guard.controller.target(), Some(raider));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::CombatResolver;
use crate::components::{EntityId, Order, PatrolRoute, Team, Tick};
use crate::config::SimulationConfig;
use crate::controller::{ControllerContext, Steering};
use crate::data::UnitCatalog;
use crate::error::{GameError, Result};
use crate::events::{StateChange, TickEvents};
use crate::math::{Fixed, Vec2Fixed};
use crate::navigation::{DirectMover, NavigationService};
use crate::perception::WorldSnapshot;
use crate::unit::{EntityStorage, Unit, UnitSpawnParams};

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 20;

/// Movement and facing requests collected from the controller phase.
#[derive(Debug, Clone, Copy)]
struct MovementPlan {
    unit: EntityId,
    steering: Steering,
    face_toward: Option<Vec2Fixed>,
}

/// The simulation state.
///
/// Each tick runs these phases in order:
///
/// 1. **Snapshot** - Copy every live unit into a [`WorldSnapshot`]
/// 2. **Controllers** - Perception, state transitions and attack starts, in id order
/// 3. **Movement** - Apply steering via navigation or [`DirectMover`]
/// 4. **Combat** - Resolve due attack effects, then fly projectiles
/// 5. **Cleanup** - Remove units that died this tick
#[derive(Debug, Serialize, Deserialize)]
pub struct Simulation {
    /// Current simulation tick.
    tick: Tick,
    /// All units in the simulation.
    units: EntityStorage,
    /// Pending attack effects and projectiles.
    combat: CombatResolver,
    /// Tuning shared by every unit.
    config: SimulationConfig,
    /// Optional movement provider for navigated units.
    #[serde(skip)]
    navigation: Option<Box<dyn NavigationService>>,
    /// Events from between ticks, reported with the next tick.
    pending_events: TickEvents,
}

impl Simulation {
    /// Create a new empty simulation with default tuning.
    ///
    /// The simulation starts at tick 0 with no units.
    ///
    /// # Example
    ///
    /// ```
    /// use skirmish_core::simulation::Simulation;
    ///
    /// let sim = Simulation::new();
    /// assert_eq!(sim.get_tick(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    /// Create a new empty simulation with the given tuning.
    #[must_use]
    pub fn with_config(config: SimulationConfig) -> Self {
        Self {
            tick: 0,
            units: EntityStorage::new(),
            combat: CombatResolver::new(),
            config,
            navigation: None,
            pending_events: TickEvents::default(),
        }
    }

    /// Get the current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> Tick {
        self.tick
    }

    /// Get a reference to the unit storage.
    #[must_use]
    pub fn units(&self) -> &EntityStorage {
        &self.units
    }

    /// Get a unit by ID.
    #[must_use]
    pub fn get_unit(&self, id: EntityId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Simulation tuning.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Pending attacks and projectiles in flight.
    #[must_use]
    pub fn combat(&self) -> &CombatResolver {
        &self.combat
    }

    /// Installed navigation service, if any.
    #[must_use]
    pub fn navigation(&self) -> Option<&dyn NavigationService> {
        self.navigation.as_deref()
    }

    /// Install a navigation service and register every navigated unit with it.
    ///
    /// Replaces any previously installed service.
    pub fn set_navigation(&mut self, mut navigation: Box<dyn NavigationService>) {
        for id in self.units.sorted_ids() {
            if let Some(unit) = self.units.get_mut(id).filter(|u| u.navigated && u.alive) {
                navigation.register(id, unit.position, unit.speed);
                unit.nav_destination = None;
            }
        }
        self.navigation = Some(navigation);
    }

    /// Number of live units on a team.
    #[must_use]
    pub fn team_size(&self, team: Team) -> usize {
        self.units
            .iter()
            .filter(|(_, unit)| unit.alive && unit.team == team)
            .count()
    }

    /// Spawn a unit.
    ///
    /// The spawn is reported in the next tick's events.
    pub fn spawn_unit(&mut self, params: UnitSpawnParams) -> EntityId {
        let unit = params.build();
        let (position, speed, navigated) = (unit.position, unit.speed, unit.navigated);
        let id = self.units.insert(unit);

        if navigated {
            if let Some(nav) = self.navigation.as_deref_mut() {
                nav.register(id, position, speed);
            }
        }

        self.pending_events.spawned.push(id);
        tracing::debug!(unit = id, "Unit spawned");
        id
    }

    /// Spawn a unit from a catalog template.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownTemplate`] if the catalog has no such template.
    pub fn spawn_from_template(
        &mut self,
        catalog: &UnitCatalog,
        template: &str,
        team: Team,
        position: Vec2Fixed,
    ) -> Result<EntityId> {
        let params = catalog.get(template)?.to_spawn_params(team, position);
        Ok(self.spawn_unit(params))
    }

    /// Remove a unit from the simulation.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the unit doesn't exist.
    pub fn despawn_unit(&mut self, id: EntityId) -> Result<()> {
        self.units
            .remove(id)
            .ok_or(GameError::EntityNotFound(id))?;
        if let Some(nav) = self.navigation.as_deref_mut() {
            nav.unregister(id);
        }
        Ok(())
    }

    /// Deliver a player order to a unit.
    ///
    /// Returns `Ok(false)` when the order is ignored: attack orders on a
    /// missing, dead or friendly target, attack orders to unarmed units, and
    /// any order to a dead unit.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the unit doesn't exist.
    pub fn issue_order(&mut self, id: EntityId, order: Order) -> Result<bool> {
        let unit = self.units.get(id).ok_or(GameError::EntityNotFound(id))?;
        if !unit.alive {
            return Ok(false);
        }

        if let Order::Attack { target, .. } = order {
            let valid = unit.is_combatant()
                && target != id
                && self
                    .units
                    .get(target)
                    .is_some_and(|t| t.alive && t.team.is_hostile_to(unit.team));
            if !valid {
                tracing::debug!(unit = id, target, "Attack order ignored, invalid target");
                return Ok(false);
            }
        }

        let Some(unit) = self.units.get_mut(id) else {
            return Err(GameError::EntityNotFound(id));
        };
        tracing::debug!(unit = id, ?order, "Order received");
        if let Some((from, to)) = unit.controller.receive(order) {
            self.pending_events
                .state_changes
                .push(StateChange { unit: id, from, to });
        }

        if order == Order::Stop && unit.nav_destination.take().is_some() {
            if let Some(nav) = self.navigation.as_deref_mut() {
                nav.stop(id);
            }
        }
        Ok(true)
    }

    /// Give a unit a standing patrol route. An empty route clears it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the unit doesn't exist.
    pub fn assign_patrol(&mut self, id: EntityId, waypoints: Vec<Vec2Fixed>) -> Result<()> {
        let unit = self.units.get_mut(id).ok_or(GameError::EntityNotFound(id))?;
        unit.controller.set_patrol(PatrolRoute::new(waypoints));
        Ok(())
    }

    /// Remove a unit's patrol route.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the unit doesn't exist.
    pub fn clear_patrol(&mut self, id: EntityId) -> Result<()> {
        let unit = self.units.get_mut(id).ok_or(GameError::EntityNotFound(id))?;
        if let Some((from, to)) = unit.controller.clear_patrol() {
            self.pending_events
                .state_changes
                .push(StateChange { unit: id, from, to });
        }
        Ok(())
    }

    /// Advance the simulation by one tick.
    ///
    /// Returns the events generated during this tick, plus anything that
    /// happened between the previous tick and this one.
    ///
    /// # Example
    ///
    /// ```
    /// use skirmish_core::simulation::Simulation;
    ///
    /// let mut sim = Simulation::new();
    /// let events = sim.tick();
    /// assert_eq!(events.tick, 0);
    /// assert_eq!(sim.get_tick(), 1);
    /// ```
    pub fn tick(&mut self) -> TickEvents {
        let now = self.tick;
        let mut events = std::mem::take(&mut self.pending_events);
        events.tick = now;

        let ids = self.units.sorted_ids();

        // 1. Snapshot
        let snapshot = WorldSnapshot::from_entries(
            ids.iter()
                .filter_map(|id| self.units.get(*id))
                .filter(|unit| unit.alive)
                .map(Unit::spatial_entry)
                .collect(),
        );

        // 2. Controllers
        let plans = self.run_controllers(&ids, &snapshot, now, &mut events);

        // 3. Movement
        self.run_movement(&plans);

        // 4. Combat
        self.combat
            .resolve(now, &mut self.units, &self.config, &mut events);

        // 5. Cleanup
        self.remove_dead();

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(
                tick = self.tick,
                state_hash = hash,
                pending_effects = self.combat.pending_effects(),
                "Simulation state hash"
            );
        }

        events
    }

    fn run_controllers(
        &mut self,
        ids: &[EntityId],
        snapshot: &WorldSnapshot,
        now: Tick,
        events: &mut TickEvents,
    ) -> Vec<MovementPlan> {
        let mut plans = Vec::with_capacity(ids.len());

        for &id in ids {
            let Some(unit) = self.units.get_mut(id).filter(|u| u.alive) else {
                continue;
            };

            let nav_arrived = if unit.navigated {
                self.navigation.as_deref().map(|nav| nav.has_arrived(id))
            } else {
                None
            };
            let me = unit.spatial_entry();
            let facing = unit.facing;

            let mut ctx = ControllerContext {
                me,
                facing,
                weapon: unit.weapon.as_mut(),
                perception: &mut unit.perception,
                world: snapshot,
                combat: &mut self.combat,
                tuning: &self.config.ai,
                now,
                nav_arrived,
            };
            let output = unit.controller.update(&mut ctx);

            for (from, to) in output.transitions {
                tracing::debug!(unit = id, ?from, ?to, "State transition");
                events.state_changes.push(StateChange { unit: id, from, to });
            }
            if let Some(attack) = output.attack_started {
                events.attacks_started.push(attack);
            }
            if output.abandoned_move {
                events.moves_abandoned.push(id);
            }

            plans.push(MovementPlan {
                unit: id,
                steering: output.steering,
                face_toward: output.face_toward,
            });
        }

        plans
    }

    fn run_movement(&mut self, plans: &[MovementPlan]) {
        if let Some(nav) = self.navigation.as_deref_mut() {
            for plan in plans {
                let Some(unit) = self.units.get_mut(plan.unit).filter(|u| u.navigated) else {
                    continue;
                };
                match plan.steering {
                    Steering::Toward(destination) => {
                        if unit.nav_destination != Some(destination) {
                            nav.set_destination(plan.unit, destination);
                            unit.nav_destination = Some(destination);
                        }
                    }
                    Steering::Hold => {
                        if unit.nav_destination.take().is_some() {
                            nav.stop(plan.unit);
                        }
                    }
                }
            }
            nav.advance();
        }

        for plan in plans {
            let Some(unit) = self.units.get_mut(plan.unit) else {
                continue;
            };
            let navigated_position = if unit.navigated {
                self.navigation
                    .as_deref()
                    .and_then(|nav| nav.current_position(plan.unit))
            } else {
                None
            };

            let before = unit.position;
            let (position, travel_facing) = match (navigated_position, plan.steering) {
                (Some(position), _) => (
                    position,
                    DirectMover::face(before, unit.facing, position, unit.turn_rate),
                ),
                (None, Steering::Toward(destination)) => DirectMover::step(
                    before,
                    unit.facing,
                    destination,
                    unit.speed,
                    unit.turn_rate,
                ),
                (None, Steering::Hold) => (before, unit.facing),
            };

            unit.position = position;
            unit.facing = match plan.face_toward {
                Some(point) => DirectMover::face(position, unit.facing, point, unit.turn_rate),
                None => travel_facing,
            };
        }
    }

    fn remove_dead(&mut self) {
        let dead: Vec<EntityId> = self
            .units
            .sorted_ids()
            .into_iter()
            .filter(|id| self.units.get(*id).is_some_and(|unit| !unit.alive))
            .collect();

        for id in dead {
            self.units.remove(id);
            if let Some(nav) = self.navigation.as_deref_mut() {
                nav.unregister(id);
            }
            tracing::debug!(unit = id, "Dead unit removed");
        }
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);

        let ids = self.units.sorted_ids();
        ids.len().hash(&mut hasher);

        for id in ids {
            if let Some(unit) = self.units.get(id) {
                id.hash(&mut hasher);
                unit.team.hash(&mut hasher);
                hash_vec(unit.position, &mut hasher);
                unit.facing.to_bits().hash(&mut hasher);
                unit.health.current.hash(&mut hasher);
                unit.alive.hash(&mut hasher);
                unit.controller.hash(&mut hasher);
                unit.perception.hash(&mut hasher);
                unit.weapon.hash(&mut hasher);
            }
        }

        self.combat.hash_pending(&mut hasher);
        for projectile in self.combat.projectiles() {
            projectile.id.hash(&mut hasher);
            projectile.target.hash(&mut hasher);
            hash_vec(projectile.position, &mut hasher);
            projectile.heading.to_bits().hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the simulation state for replay or snapshots.
    ///
    /// The navigation service is not part of the snapshot; install it again
    /// with [`set_navigation`](Self::set_navigation) after restoring.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize simulation: {}", e)))
    }

    /// Deserialize simulation state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            GameError::InvalidState(format!("Failed to deserialize simulation: {}", e))
        })
    }
}

fn hash_vec<H: Hasher>(value: Vec2Fixed, hasher: &mut H) {
    value.x.to_bits().hash(hasher);
    value.y.to_bits().hash(hasher);
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AiState, Weapon, WeaponKind};
    use crate::navigation::DirectNavigator;

    fn soldier(team: u8, x: i32, y: i32) -> UnitSpawnParams {
        UnitSpawnParams {
            team: Team(team),
            position: Vec2Fixed::from_ints(x, y),
            ..Default::default()
        }
    }

    fn dummy(team: u8, x: i32, health: u32) -> UnitSpawnParams {
        UnitSpawnParams {
            team: Team(team),
            position: Vec2Fixed::from_ints(x, 0),
            health,
            weapon: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_new() {
        let sim = Simulation::new();
        assert_eq!(sim.get_tick(), 0);
        assert!(sim.units().is_empty());
    }

    #[test]
    fn test_spawn_reported_next_tick() {
        let mut sim = Simulation::new();
        let id = sim.spawn_unit(soldier(0, 0, 0));
        let events = sim.tick();
        assert_eq!(events.spawned, vec![id]);
        assert!(sim.tick().spawned.is_empty());
    }

    #[test]
    fn test_despawn_unit() {
        let mut sim = Simulation::new();
        let id = sim.spawn_unit(soldier(0, 0, 0));
        sim.despawn_unit(id).unwrap();
        assert!(sim.get_unit(id).is_none());
        assert!(matches!(sim.despawn_unit(id), Err(GameError::EntityNotFound(_))));
    }

    #[test]
    fn test_hostile_in_sight_is_chased() {
        let mut sim = Simulation::new();
        let a = sim.spawn_unit(soldier(0, 0, 0));
        let b = sim.spawn_unit(soldier(1, 10, 0));

        let events = sim.tick();
        let unit = sim.get_unit(a).unwrap();
        assert_eq!(unit.controller.state(), AiState::Chase);
        assert_eq!(unit.controller.target(), Some(b));
        assert!(unit.position.x > Fixed::ZERO);
        assert!(events
            .state_changes
            .contains(&StateChange { unit: a, from: AiState::Idle, to: AiState::Chase }));
    }

    #[test]
    fn test_melee_kill_removes_target() {
        let mut sim = Simulation::new();
        let a = sim.spawn_unit(UnitSpawnParams {
            weapon: Some(
                Weapon::new(WeaponKind::Melee, 20, Fixed::from_num(1.5), 20)
                    .with_activation_delay(3),
            ),
            ..soldier(0, 0, 0)
        });
        let b = sim.spawn_unit(dummy(1, 1, 15));
        sim.issue_order(a, Order::attack(b)).unwrap();

        let first = sim.tick();
        assert_eq!(first.attacks_started.len(), 1);
        assert_eq!(first.attacks_started[0].resolves_at, 3);

        sim.tick();
        sim.tick();
        let events = sim.tick();
        assert!(events.died(b));
        assert_eq!(events.damage[0].dealt, 15);
        assert!(sim.get_unit(b).is_none());

        sim.tick();
        let attacker = sim.get_unit(a).unwrap();
        assert_eq!(attacker.controller.state(), AiState::Idle);
        assert_eq!(attacker.controller.target(), None);
    }

    #[test]
    fn test_stop_order_applies_immediately() {
        let mut sim = Simulation::new();
        let a = sim.spawn_unit(soldier(0, 0, 0));
        sim.spawn_unit(soldier(1, 5, 0));
        sim.tick();
        assert_eq!(sim.get_unit(a).unwrap().controller.state(), AiState::Chase);

        assert!(sim.issue_order(a, Order::Stop).unwrap());
        let unit = sim.get_unit(a).unwrap();
        assert_eq!(unit.controller.state(), AiState::Idle);
        assert_eq!(unit.controller.target(), None);
    }

    #[test]
    fn test_invalid_attack_orders_are_ignored() {
        let mut sim = Simulation::new();
        let a = sim.spawn_unit(soldier(0, 0, 0));
        let ally = sim.spawn_unit(soldier(0, 2, 0));
        let unarmed = sim.spawn_unit(dummy(0, 4, 10));
        let enemy = sim.spawn_unit(dummy(1, 30, 10));

        assert!(!sim.issue_order(a, Order::attack(ally)).unwrap());
        assert!(!sim.issue_order(a, Order::attack(a)).unwrap());
        assert!(!sim.issue_order(a, Order::attack(999)).unwrap());
        assert!(!sim.issue_order(unarmed, Order::attack(enemy)).unwrap());
        assert!(sim.issue_order(a, Order::attack(enemy)).unwrap());
        assert!(matches!(
            sim.issue_order(999, Order::Stop),
            Err(GameError::EntityNotFound(999))
        ));
    }

    #[test]
    fn test_patrol_assignment() {
        let mut sim = Simulation::new();
        let a = sim.spawn_unit(soldier(0, 0, 0));
        sim.assign_patrol(a, vec![Vec2Fixed::from_ints(0, 0), Vec2Fixed::from_ints(0, 10)])
            .unwrap();
        sim.tick();
        let unit = sim.get_unit(a).unwrap();
        assert_eq!(unit.controller.state(), AiState::Patrol);
        assert!(unit.position.y > Fixed::ZERO);

        sim.clear_patrol(a).unwrap();
        assert_eq!(sim.get_unit(a).unwrap().controller.state(), AiState::Idle);
    }

    #[test]
    fn test_navigated_unit_moves_through_service() {
        let mut sim = Simulation::new();
        sim.set_navigation(Box::new(DirectNavigator::new(Fixed::from_num(0.5))));
        let a = sim.spawn_unit(UnitSpawnParams {
            speed: Fixed::ONE,
            navigated: true,
            ..soldier(0, 0, 0)
        });
        sim.issue_order(a, Order::Move(Vec2Fixed::from_ints(5, 0))).unwrap();

        for _ in 0..8 {
            sim.tick();
        }
        let unit = sim.get_unit(a).unwrap();
        assert_eq!(unit.position, Vec2Fixed::from_ints(5, 0));
        assert_eq!(unit.controller.state(), AiState::Idle);
        assert_eq!(
            sim.navigation().and_then(|nav| nav.current_position(a)),
            Some(Vec2Fixed::from_ints(5, 0))
        );
    }

    #[test]
    fn test_unreachable_destination_is_abandoned() {
        let mut config = SimulationConfig::default();
        config.ai.stuck_ticks = 10;
        let mut sim = Simulation::with_config(config);
        sim.set_navigation(Box::new(
            DirectNavigator::new(Fixed::from_num(0.5))
                .with_blocked_zone(Vec2Fixed::from_ints(10, 0), Fixed::from_num(3)),
        ));
        let a = sim.spawn_unit(UnitSpawnParams {
            speed: Fixed::ONE,
            navigated: true,
            ..soldier(0, 0, 0)
        });
        sim.issue_order(a, Order::Move(Vec2Fixed::from_ints(10, 0))).unwrap();

        let mut abandoned = false;
        for _ in 0..40 {
            abandoned |= sim.tick().moves_abandoned.contains(&a);
        }
        assert!(abandoned);
        assert_eq!(sim.get_unit(a).unwrap().controller.state(), AiState::Idle);
    }

    #[test]
    fn test_deterministic_hash() {
        let build = || {
            let mut sim = Simulation::new();
            sim.spawn_unit(soldier(0, 0, 0));
            sim.spawn_unit(soldier(1, 6, 3));
            for _ in 0..30 {
                sim.tick();
            }
            sim
        };
        assert_eq!(build().state_hash(), build().state_hash());
    }

    #[test]
    fn test_hash_covers_orders_and_patrols() {
        let with_move = |destination| {
            let mut sim = Simulation::new();
            let id = sim.spawn_unit(soldier(0, 0, 0));
            sim.issue_order(id, Order::Move(destination)).unwrap();
            sim
        };
        let east = with_move(Vec2Fixed::from_ints(10, 0));
        let north = with_move(Vec2Fixed::from_ints(0, 10));
        assert_eq!(
            east.get_unit(1).unwrap().controller.state(),
            north.get_unit(1).unwrap().controller.state()
        );
        assert_ne!(east.state_hash(), north.state_hash());

        let with_patrol = |y| {
            let mut sim = Simulation::new();
            let id = sim.spawn_unit(soldier(0, 0, 0));
            sim.assign_patrol(id, vec![Vec2Fixed::from_ints(5, y), Vec2Fixed::ZERO])
                .unwrap();
            sim
        };
        assert_ne!(with_patrol(0).state_hash(), with_patrol(5).state_hash());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut sim = Simulation::new();
        sim.spawn_unit(soldier(0, 0, 0));
        sim.spawn_unit(soldier(1, 4, 0));
        for _ in 0..5 {
            sim.tick();
        }

        let bytes = sim.serialize().unwrap();
        let mut restored = Simulation::deserialize(&bytes).unwrap();
        assert_eq!(sim.get_tick(), restored.get_tick());
        assert_eq!(sim.state_hash(), restored.state_hash());

        for _ in 0..20 {
            sim.tick();
            restored.tick();
        }
        assert_eq!(sim.state_hash(), restored.state_hash());
    }
}
