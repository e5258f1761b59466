//! Test fixtures and helpers.
//!
//! Pre-built units and battles for consistent testing.

use fixed::types::I32F32;
use skirmish_core::components::{TargetPriority, Team, Weapon, WeaponKind};
use skirmish_core::math::Vec2Fixed;
use skirmish_core::simulation::Simulation;
use skirmish_core::unit::UnitSpawnParams;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Position from integer coordinates.
#[must_use]
pub fn pos(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Melee soldier: 100 hp, 20 damage at 1.5 range, 4-tick swing.
#[must_use]
pub fn soldier(team: u8, x: i32, y: i32) -> UnitSpawnParams {
    UnitSpawnParams {
        team: Team(team),
        position: pos(x, y),
        health: 100,
        speed: fixed_f(0.25),
        weapon: Some(Weapon::new(WeaponKind::Melee, 20, fixed_f(1.5), 20).with_activation_delay(4)),
        sight_range: fixed(15),
        ..Default::default()
    }
}

/// Archer: 60 hp, 12 damage at 8 range, projectile after a 6-tick draw.
#[must_use]
pub fn archer(team: u8, x: i32, y: i32) -> UnitSpawnParams {
    UnitSpawnParams {
        team: Team(team),
        position: pos(x, y),
        health: 60,
        speed: fixed_f(0.2),
        weapon: Some(Weapon::new(WeaponKind::Ranged, 12, fixed(8), 30).with_activation_delay(6)),
        sight_range: fixed(18),
        priority: TargetPriority::Weakest,
        ..Default::default()
    }
}

/// Unarmed unit that perception ignores.
#[must_use]
pub fn civilian(team: u8, x: i32, y: i32) -> UnitSpawnParams {
    UnitSpawnParams {
        team: Team(team),
        position: pos(x, y),
        health: 40,
        weapon: None,
        ..Default::default()
    }
}

/// Two mixed squads facing each other across the x axis.
///
/// Each side gets `per_side` units, alternating soldiers and archers, with
/// archers in the back row. Team 0 soldiers start at x = -5, team 1
/// soldiers at x = 5, so the front lines see each other from the first tick.
#[must_use]
pub fn mixed_battle(per_side: i32) -> Simulation {
    let mut sim = Simulation::new();
    for i in 0..per_side {
        let y = (i / 2) * 3 - per_side;
        if i % 2 == 0 {
            sim.spawn_unit(soldier(0, -5, y));
            sim.spawn_unit(soldier(1, 5, y));
        } else {
            sim.spawn_unit(archer(0, -9, y));
            sim.spawn_unit(archer(1, 9, y));
        }
    }
    sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_battle_is_balanced() {
        let sim = mixed_battle(6);
        assert_eq!(sim.team_size(Team(0)), 6);
        assert_eq!(sim.team_size(Team(1)), 6);
    }

    #[test]
    fn test_civilian_is_not_a_combatant() {
        assert!(civilian(0, 0, 0).build().weapon.is_none());
        assert!(soldier(0, 0, 0).build().is_combatant());
    }
}
