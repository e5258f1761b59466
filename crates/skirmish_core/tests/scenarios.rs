//! End-to-end skirmish scenarios driven through the public simulation API.

use skirmish_core::components::{AiState, Order, TargetPriority, Team};
use skirmish_core::dispatcher::{OrderDispatcher, OrderTarget};
use skirmish_core::events::TickEvents;
use skirmish_core::math::Fixed;
use skirmish_core::navigation::DirectNavigator;
use skirmish_core::perception::{Perception, SpatialEntry, WorldSnapshot};
use skirmish_core::replay::Replay;
use skirmish_core::simulation::Simulation;
use skirmish_core::unit::UnitSpawnParams;
use skirmish_test_utils::fixtures::{archer, civilian, fixed, fixed_f, mixed_battle, pos, soldier};

fn run(sim: &mut Simulation, ticks: u64) -> Vec<TickEvents> {
    (0..ticks).map(|_| sim.tick()).collect()
}

#[test]
fn hostile_in_sight_is_chased_next_tick() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(soldier(0, 0, 0));
    let b = sim.spawn_unit(soldier(1, 10, 0));

    let events = sim.tick();

    let unit = sim.get_unit(a).unwrap();
    assert_eq!(unit.controller.state(), AiState::Chase);
    assert_eq!(unit.controller.target(), Some(b));
    assert!(events.spawned.contains(&a));
    assert!(events
        .state_changes
        .iter()
        .any(|c| c.unit == a && c.from == AiState::Idle && c.to == AiState::Chase));
}

#[test]
fn melee_hit_kills_fragile_target_once() {
    let mut sim = Simulation::new();
    let attacker = sim.spawn_unit(soldier(0, 0, 0));
    let victim = sim.spawn_unit(UnitSpawnParams {
        health: 15,
        ..civilian(1, 1, 0)
    });
    assert!(sim.issue_order(attacker, Order::attack(victim)).unwrap());

    let events = run(&mut sim, 6);

    // The swing starts on tick 0 and lands after the 4-tick activation delay.
    assert_eq!(events[0].attacks_started.len(), 1);
    assert_eq!(events[0].attacks_started[0].resolves_at, 4);
    assert!(events[..4].iter().all(|e| e.damage.is_empty()));

    let hit = events[4].damage[0];
    assert_eq!(hit.source, Some(attacker));
    assert_eq!(hit.dealt, 15);
    assert!(hit.killed);
    let deaths: usize = events.iter().map(|e| e.deaths.len()).sum();
    assert_eq!(deaths, 1);
    assert!(sim.get_unit(victim).is_none());

    // With its target gone the attacker settles back to Idle.
    assert_eq!(sim.get_unit(attacker).unwrap().controller.state(), AiState::Idle);
}

#[test]
fn projectile_lands_after_firer_stops() {
    let mut sim = Simulation::new();
    let shooter = sim.spawn_unit(archer(0, 0, 0));
    let runner = sim.spawn_unit(civilian(1, 6, 0));
    sim.issue_order(shooter, Order::attack(runner)).unwrap();

    // Runner flees as soon as the bow is drawn.
    let events = run(&mut sim, 1);
    assert_eq!(events[0].attacks_started.len(), 1);
    sim.issue_order(runner, Order::Move(pos(6, 30))).unwrap();

    let mut launched = false;
    while sim.get_tick() < 7 {
        launched |= !sim.tick().projectiles_spawned.is_empty();
    }
    assert!(launched);

    // The firer stands down; the projectile keeps homing regardless.
    sim.issue_order(shooter, Order::Stop).unwrap();
    assert_eq!(sim.get_unit(shooter).unwrap().controller.state(), AiState::Idle);

    let events = run(&mut sim, 40);
    let hits: Vec<_> = events.iter().flat_map(|e| e.damage.iter()).collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source, Some(shooter));
    assert_eq!(hits[0].target, runner);
    assert_eq!(sim.get_unit(runner).unwrap().health.current, 28);
    assert!(sim.combat().projectiles().is_empty());
}

#[test]
fn weakest_policy_prefers_low_health() {
    let entry = |id, x, health| SpatialEntry {
        id,
        team: Team(1),
        position: pos(x, 0),
        health,
        alive: true,
        combatant: true,
        threat: Fixed::ONE,
    };
    let world = WorldSnapshot::from_entries(vec![entry(2, 5, 30), entry(3, -5, 10)]);
    let mut perception = Perception::new(fixed(15), TargetPriority::Weakest);

    let best = perception.scan(&world, 1, pos(0, 0), Team(0), 0, 200).unwrap();
    assert_eq!(best.id, 3);
    assert_eq!(perception.remembered(), 2);
}

#[test]
fn fleeing_target_sends_attacker_back_to_chase() {
    let mut sim = Simulation::new();
    let attacker = sim.spawn_unit(soldier(0, 0, 0));
    let runner = sim.spawn_unit(UnitSpawnParams {
        health: 500,
        ..civilian(1, 1, 0)
    });
    sim.issue_order(attacker, Order::attack(runner)).unwrap();
    sim.tick();
    assert_eq!(sim.get_unit(attacker).unwrap().controller.state(), AiState::Attack);

    sim.issue_order(runner, Order::Move(pos(1, 40))).unwrap();
    let events = run(&mut sim, 30);
    let changes: Vec<_> = events
        .iter()
        .flat_map(|e| e.state_changes.iter())
        .filter(|c| c.unit == attacker)
        .collect();

    assert!(!changes.is_empty());
    assert_eq!(changes[0].from, AiState::Attack);
    assert_eq!(changes[0].to, AiState::Chase);
    assert!(changes.iter().all(|c| c.to != AiState::Idle));
}

#[test]
fn stop_interrupts_any_state_immediately() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(soldier(0, 0, 0));
    sim.spawn_unit(soldier(1, 10, 0));
    sim.tick();
    assert_eq!(sim.get_unit(a).unwrap().controller.state(), AiState::Chase);

    sim.issue_order(a, Order::Stop).unwrap();
    let unit = sim.get_unit(a).unwrap();
    assert_eq!(unit.controller.state(), AiState::Idle);
    assert_eq!(unit.controller.target(), None);
    assert_eq!(unit.controller.active_order(), None);
}

#[test]
fn closer_hostile_takes_over_an_autonomous_chase() {
    let mut sim = Simulation::new();
    let hunter = sim.spawn_unit(soldier(0, 0, 0));
    let far = sim.spawn_unit(soldier(1, 12, 0));
    sim.tick();
    assert_eq!(sim.get_unit(hunter).unwrap().controller.target(), Some(far));

    let near = sim.spawn_unit(soldier(1, 3, 0));
    sim.tick();

    let unit = sim.get_unit(hunter).unwrap();
    assert_eq!(unit.controller.target(), Some(near));
    assert!(matches!(unit.controller.state(), AiState::Chase | AiState::Attack));
}

#[test]
fn scheduled_swing_still_lands_after_stop() {
    let mut sim = Simulation::new();
    let attacker = sim.spawn_unit(soldier(0, 0, 0));
    let victim = sim.spawn_unit(civilian(1, 1, 0));
    sim.issue_order(attacker, Order::attack(victim)).unwrap();
    assert_eq!(sim.tick().attacks_started.len(), 1);

    sim.issue_order(attacker, Order::Stop).unwrap();
    let events = run(&mut sim, 8);

    let hits: Vec<_> = events.iter().flat_map(|e| e.damage.iter()).collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source, Some(attacker));
    assert_eq!(hits[0].target, victim);
    assert!(events.iter().all(|e| e.attacks_started.is_empty()));
    assert_eq!(sim.get_unit(attacker).unwrap().controller.state(), AiState::Idle);
}

#[test]
fn distant_armies_tick_without_overflow() {
    let mut sim = Simulation::new();
    let west = sim.spawn_unit(soldier(0, 0, 0));
    let east = sim.spawn_unit(soldier(1, 50_000, 0));
    sim.issue_order(west, Order::Move(pos(50_000, 0))).unwrap();

    let events = run(&mut sim, 4);

    assert!(events.iter().all(|e| e.damage.is_empty()));
    assert_eq!(sim.get_unit(east).unwrap().controller.state(), AiState::Idle);
    let west = sim.get_unit(west).unwrap();
    assert_eq!(west.controller.state(), AiState::MoveOrder);
    assert!((west.position.x - fixed(1)).abs() < fixed_f(0.01));
}

#[test]
fn group_attack_surrounds_target() {
    let mut sim = Simulation::new();
    let squad: Vec<_> = (0..4).map(|i| sim.spawn_unit(soldier(0, -20, i * 3))).collect();
    let target = sim.spawn_unit(civilian(1, 0, 0));

    let accepted = OrderDispatcher::default()
        .issue(&mut sim, &squad, OrderTarget::Entity(target))
        .unwrap();
    assert_eq!(accepted.len(), 4);
    for id in &squad {
        let unit = sim.get_unit(*id).unwrap();
        assert_eq!(unit.controller.state(), AiState::Chase);
        assert!(unit.controller.is_target_forced());
    }

    let events = run(&mut sim, 200);
    assert!(events.iter().any(|e| e.died(target)));
}

#[test]
fn group_move_holds_formation_spacing() {
    let mut sim = Simulation::new();
    let squad: Vec<_> = (0..5).map(|i| sim.spawn_unit(civilian(0, i, 0))).collect();

    OrderDispatcher::default()
        .issue(&mut sim, &squad, OrderTarget::Point(pos(2, 15)))
        .unwrap();
    run(&mut sim, 120);

    let positions: Vec<_> = squad
        .iter()
        .map(|id| sim.get_unit(*id).unwrap().position)
        .collect();
    for (i, a) in positions.iter().enumerate() {
        assert!(a.distance(pos(2, 15)) < fixed(4));
        for b in &positions[i + 1..] {
            assert!(a.distance(*b) > fixed(1));
        }
    }
    assert!(squad
        .iter()
        .all(|id| sim.get_unit(*id).unwrap().controller.state() == AiState::Idle));
}

#[test]
fn navigated_battle_matches_its_replay() {
    let mut sim = Simulation::new();
    for i in 0..3 {
        for (team, x) in [(0, -12), (1, 12)] {
            let id = sim.spawn_unit(UnitSpawnParams {
                navigated: true,
                ..soldier(team, x, i * 2)
            });
            sim.assign_patrol(id, vec![pos(0, 0), pos(0, 6)]).unwrap();
        }
    }
    sim.set_navigation(Box::new(DirectNavigator::new(fixed_f(0.5))));
    let mut replay = Replay::new("navigated", &sim).unwrap();
    for _ in 0..150 {
        if sim.get_tick() == 20 {
            sim.issue_order(1, Order::Move(pos(-20, -20))).unwrap();
            replay.record_order(20, 1, Order::Move(pos(-20, -20)));
        }
        sim.tick();
    }
    replay.finalize(sim.get_tick(), sim.state_hash());

    let played = replay
        .play_with_navigation(Box::new(DirectNavigator::new(fixed_f(0.5))))
        .unwrap();
    assert_eq!(played.state_hash(), sim.state_hash());
}

#[test]
fn battle_ends_with_one_side_standing() {
    let mut sim = mixed_battle(4);
    for _ in 0..3_000 {
        sim.tick();
        if sim.team_size(Team(0)) == 0 || sim.team_size(Team(1)) == 0 {
            break;
        }
    }
    assert!(sim.team_size(Team(0)) == 0 || sim.team_size(Team(1)) == 0);
}
