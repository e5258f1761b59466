//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Lockstep play and replays need the simulation to be 100% deterministic.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`skirmish_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in sorted entity ID order.
//!
//! - **Update order**: Controllers read a start-of-tick snapshot, so the
//!   order in which units think never leaks into what they see.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual module determinism (perception, combat, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::thread;

use skirmish_core::components::{EntityId, Order, Tick};
use skirmish_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// An order to deliver before a given tick is simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedOrder {
    /// Tick before which the order is issued.
    pub tick: Tick,
    /// Receiving unit.
    pub unit: EntityId,
    /// The order.
    pub order: Order,
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use skirmish_test_utils::determinism::verify_determinism;
/// use skirmish_test_utils::fixtures::mixed_battle;
///
/// let result = verify_determinism(
///     3,   // Run 3 times
///     100, // 100 ticks each
///     || mixed_battle(4),
///     |sim| { sim.tick(); },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Simplified determinism verification for the `Simulation` type.
///
/// Runs the simulation twice with identical setup and verifies the final
/// state hashes match exactly.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        |sim| sim.state_hash(),
    );
    result.is_deterministic
}

/// Run a simulation while delivering scripted orders, returning the final hash.
///
/// Orders the simulation refuses or that name missing units are ignored,
/// the same way a replay treats them.
pub fn run_scripted<F>(setup_fn: F, script: &[ScriptedOrder], num_ticks: u64) -> u64
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    let mut script: Vec<ScriptedOrder> = script.to_vec();
    script.sort_by_key(|o| o.tick);
    let mut next = 0;

    for _ in 0..num_ticks {
        let now = sim.get_tick();
        while let Some(scripted) = script.get(next).filter(|o| o.tick <= now) {
            if let Err(e) = sim.issue_order(scripted.unit, scripted.order) {
                tracing::trace!(unit = scripted.unit, error = %e, "Scripted order skipped");
            }
            next += 1;
        }
        sim.tick();
    }

    sim.state_hash()
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// This is useful for catching non-determinism that only manifests
/// under thread scheduling variations, memory layout differences, etc.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// Useful for debugging non-determinism by finding exactly when
/// simulations start to differ.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a serialization round-trip mid-battle preserves the future.
///
/// Runs `split` ticks, snapshots, then runs both the original and the
/// restored copy for `rest` more ticks and compares hashes.
pub fn verify_snapshot_continuation<F>(setup_fn: F, split: u64, rest: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    for _ in 0..split {
        sim.tick();
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    for _ in 0..rest {
        sim.tick();
        restored.tick();
    }

    sim.state_hash() == restored.state_hash()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use proptest::prelude::*;
    use skirmish_core::components::{EntityId, Order, TargetPriority, Team, Weapon, WeaponKind};
    use skirmish_core::math::{Fixed, Vec2Fixed};
    use skirmish_core::unit::UnitSpawnParams;

    use super::ScriptedOrder;

    /// Generate a fixed-point coordinate on a small battlefield.
    ///
    /// Range: -40 to 40, in quarter steps
    pub fn arb_coordinate() -> impl Strategy<Value = Fixed> {
        (-160i32..160i32).prop_map(|quarters| Fixed::from_num(quarters) / 4)
    }

    /// Generate a fixed-point 2D vector for positions.
    pub fn arb_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_coordinate(), arb_coordinate()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a weapon of either kind.
    pub fn arb_weapon() -> impl Strategy<Value = Weapon> {
        (any::<bool>(), 1u32..40, 1i32..10, 1u32..40, 0u32..8).prop_map(
            |(ranged, damage, range, cooldown, delay)| {
                let kind = if ranged {
                    WeaponKind::Ranged
                } else {
                    WeaponKind::Melee
                };
                Weapon::new(kind, damage, Fixed::from_num(range), cooldown)
                    .with_activation_delay(delay)
            },
        )
    }

    /// Generate a targeting policy.
    pub fn arb_priority() -> impl Strategy<Value = TargetPriority> {
        prop_oneof![
            Just(TargetPriority::Closest),
            Just(TargetPriority::Weakest),
            Just(TargetPriority::HighestThreat),
        ]
    }

    /// Generate spawn parameters for a unit on one of two teams.
    pub fn arb_unit() -> impl Strategy<Value = UnitSpawnParams> {
        (
            0u8..2,
            arb_position(),
            1u32..200,
            proptest::option::weighted(0.9, arb_weapon()),
            arb_priority(),
            5i32..25,
        )
            .prop_map(|(team, position, health, weapon, priority, sight)| UnitSpawnParams {
                team: Team(team),
                position,
                health,
                weapon,
                priority,
                sight_range: Fixed::from_num(sight),
                ..Default::default()
            })
    }

    /// Generate a list of unit spawn parameters.
    pub fn arb_army(max_units: usize) -> impl Strategy<Value = Vec<UnitSpawnParams>> {
        proptest::collection::vec(arb_unit(), 1..max_units)
    }

    /// Generate an order addressed at units `1..=max_id`.
    pub fn arb_order(max_id: EntityId) -> impl Strategy<Value = Order> {
        prop_oneof![
            arb_position().prop_map(Order::Move),
            (1..=max_id).prop_map(Order::attack),
            Just(Order::Stop),
        ]
    }

    /// Generate a script of orders over the first `max_tick` ticks.
    pub fn arb_script(
        max_id: EntityId,
        max_tick: u64,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<ScriptedOrder>> {
        proptest::collection::vec(
            (0..max_tick, 1..=max_id, arb_order(max_id))
                .prop_map(|(tick, unit, order)| ScriptedOrder { tick, unit, order }),
            0..max_len,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{archer, mixed_battle, pos, soldier};
    use proptest::prelude::*;

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_simulation_determinism() {
        assert!(verify_simulation_determinism(Simulation::new, 100));
    }

    #[test]
    fn test_battle_determinism() {
        assert!(verify_simulation_determinism(|| mixed_battle(6), 400));
    }

    #[test]
    fn test_find_divergence_on_deterministic_sim() {
        assert!(find_first_divergence(|| mixed_battle(4), 200).is_none());
    }

    #[test]
    fn test_parallel_battles_match() {
        run_parallel_simulations_scoped(|| mixed_battle(6), 4, 300).assert_deterministic();
    }

    // =========================================================================
    // Serialization round-trip tests
    // =========================================================================

    #[test]
    fn test_snapshot_mid_battle_continues_identically() {
        // Split while attacks and projectiles are in flight.
        assert!(verify_snapshot_continuation(|| mixed_battle(6), 90, 200));
    }

    #[test]
    fn test_scripted_orders_are_deterministic() {
        let setup = || {
            let mut sim = Simulation::new();
            sim.spawn_unit(soldier(0, 0, 0));
            sim.spawn_unit(archer(0, -3, 0));
            sim.spawn_unit(soldier(1, 20, 0));
            sim
        };
        let script = [
            ScriptedOrder {
                tick: 3,
                unit: 1,
                order: Order::Move(pos(10, 5)),
            },
            ScriptedOrder {
                tick: 10,
                unit: 2,
                order: Order::attack(3),
            },
            ScriptedOrder {
                tick: 40,
                unit: 1,
                order: Order::Stop,
            },
        ];
        assert_eq!(
            run_scripted(setup, &script, 200),
            run_scripted(setup, &script, 200)
        );
        assert_ne!(run_scripted(setup, &script, 200), run_scripted(setup, &[], 200));
    }

    // =========================================================================
    // Property-based determinism tests
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_random_armies_are_deterministic(army in strategies::arb_army(12)) {
            let setup = || {
                let mut sim = Simulation::new();
                for params in &army {
                    sim.spawn_unit(params.clone());
                }
                sim
            };
            prop_assert!(find_first_divergence(setup, 150).is_none());
        }

        #[test]
        fn prop_random_scripts_are_deterministic(
            army in strategies::arb_army(8),
            script in strategies::arb_script(8, 100, 20),
        ) {
            let setup = || {
                let mut sim = Simulation::new();
                for params in &army {
                    sim.spawn_unit(params.clone());
                }
                sim
            };
            prop_assert_eq!(run_scripted(setup, &script, 150), run_scripted(setup, &script, 150));
        }

        #[test]
        fn prop_units_never_exceed_max_health(army in strategies::arb_army(10)) {
            let mut sim = Simulation::new();
            for params in &army {
                sim.spawn_unit(params.clone());
            }
            for _ in 0..100 {
                let events = sim.tick();
                for death in &events.deaths {
                    prop_assert!(sim.get_unit(death.unit).is_none());
                }
                for (_, unit) in sim.units().iter() {
                    prop_assert!(unit.alive);
                    prop_assert!(unit.health.current <= unit.health.max);
                }
            }
        }
    }
}
