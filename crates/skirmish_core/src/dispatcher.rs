//! Group orders.
//!
//! Turns one player command for a selection of units into one [`Order`] per
//! unit: move orders spread the selection over a formation, attack orders
//! give each unit its own approach point around the target.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Order};
use crate::error::{GameError, Result};
use crate::formation::{compute_oriented_formation, FormationShape};
use crate::math::{fixed_decimal, Fixed, Vec2Fixed};
use crate::simulation::Simulation;

/// What the player clicked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderTarget {
    /// Ground: move there in formation.
    Point(Vec2Fixed),
    /// A unit: attack it.
    Entity(EntityId),
    /// Halt the selection.
    Stop,
}

/// Formation and approach settings for group orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDispatcher {
    /// Formation used for move orders.
    pub shape: FormationShape,
    /// Distance between neighbouring formation slots.
    #[serde(with = "fixed_decimal")]
    pub spacing: Fixed,
    /// Fraction of weapon range at which attackers stand off the target.
    #[serde(with = "fixed_decimal")]
    pub approach_ratio: Fixed,
}

impl Default for OrderDispatcher {
    fn default() -> Self {
        Self {
            shape: FormationShape::Circle,
            spacing: Fixed::from_num(2),
            approach_ratio: Fixed::from_num(0.8),
        }
    }
}

impl OrderDispatcher {
    /// Compute per-unit orders without delivering them.
    ///
    /// Selected ids are sorted and deduplicated; ids that no longer exist are
    /// skipped. Output is in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if an attack target doesn't exist.
    pub fn plan(
        &self,
        sim: &Simulation,
        selected: &[EntityId],
        target: OrderTarget,
    ) -> Result<Vec<(EntityId, Order)>> {
        let mut ids: Vec<EntityId> = selected
            .iter()
            .copied()
            .filter(|id| sim.get_unit(*id).is_some_and(|unit| unit.alive))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        match target {
            OrderTarget::Stop => Ok(ids.into_iter().map(|id| (id, Order::Stop)).collect()),
            OrderTarget::Point(point) => Ok(self.plan_move(sim, &ids, point)),
            OrderTarget::Entity(entity) => self.plan_attack(sim, &ids, entity),
        }
    }

    /// Compute per-unit orders and deliver them.
    ///
    /// Returns the orders the units accepted.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if an attack target doesn't exist.
    pub fn issue(
        &self,
        sim: &mut Simulation,
        selected: &[EntityId],
        target: OrderTarget,
    ) -> Result<Vec<(EntityId, Order)>> {
        let planned = self.plan(sim, selected, target)?;
        let mut accepted = Vec::with_capacity(planned.len());
        for (id, order) in planned {
            if sim.issue_order(id, order)? {
                accepted.push((id, order));
            }
        }
        tracing::debug!(
            selected = selected.len(),
            accepted = accepted.len(),
            ?target,
            "Group order issued"
        );
        Ok(accepted)
    }

    fn plan_move(
        &self,
        sim: &Simulation,
        ids: &[EntityId],
        point: Vec2Fixed,
    ) -> Vec<(EntityId, Order)> {
        let positions: Vec<Vec2Fixed> = ids
            .iter()
            .filter_map(|id| sim.get_unit(*id).map(|unit| unit.position))
            .collect();
        if positions.is_empty() {
            return Vec::new();
        }

        let count = Fixed::from_num(positions.len());
        let sum = positions
            .iter()
            .fold(Vec2Fixed::ZERO, |acc, position| acc + *position);
        let centroid = Vec2Fixed::new(sum.x / count, sum.y / count);

        let slots = compute_oriented_formation(
            point,
            i32::try_from(ids.len()).unwrap_or(i32::MAX),
            self.shape,
            self.spacing,
            point - centroid,
        );
        ids.iter()
            .zip(slots)
            .map(|(id, slot)| (*id, Order::Move(slot)))
            .collect()
    }

    fn plan_attack(
        &self,
        sim: &Simulation,
        ids: &[EntityId],
        target: EntityId,
    ) -> Result<Vec<(EntityId, Order)>> {
        let target_position = sim
            .get_unit(target)
            .map(|unit| unit.position)
            .ok_or(GameError::EntityNotFound(target))?;

        Ok(ids
            .iter()
            .filter_map(|id| sim.get_unit(*id))
            .map(|unit| {
                let range = unit.weapon.map_or(Fixed::ZERO, |weapon| weapon.range);
                let away = (unit.position - target_position).normalize();
                let approach_offset = (away != Vec2Fixed::ZERO)
                    .then(|| away.scale(range * self.approach_ratio));
                (
                    unit.id,
                    Order::Attack {
                        target,
                        approach_offset,
                    },
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AiState, Team};
    use crate::unit::UnitSpawnParams;

    fn spawn(sim: &mut Simulation, team: u8, x: i32, y: i32) -> EntityId {
        sim.spawn_unit(UnitSpawnParams {
            team: Team(team),
            position: Vec2Fixed::from_ints(x, y),
            ..Default::default()
        })
    }

    #[test]
    fn test_move_orders_follow_formation() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, 0, 0);
        let b = spawn(&mut sim, 0, 2, 0);
        let c = spawn(&mut sim, 0, 4, 0);
        let dispatcher = OrderDispatcher {
            shape: FormationShape::Line,
            ..Default::default()
        };

        // Selection centroid (2, 0) looking up +Y toward (2, 10).
        let orders = dispatcher
            .plan(&sim, &[c, a, b, a], OrderTarget::Point(Vec2Fixed::from_ints(2, 10)))
            .unwrap();
        assert_eq!(
            orders,
            vec![
                (a, Order::Move(Vec2Fixed::from_ints(0, 10))),
                (b, Order::Move(Vec2Fixed::from_ints(2, 10))),
                (c, Order::Move(Vec2Fixed::from_ints(4, 10))),
            ]
        );
    }

    #[test]
    fn test_plan_is_order_stable() {
        let mut sim = Simulation::new();
        let ids: Vec<_> = (0..5).map(|i| spawn(&mut sim, 0, i, 0)).collect();
        let reversed: Vec<_> = ids.iter().rev().copied().collect();
        let dispatcher = OrderDispatcher::default();
        let target = OrderTarget::Point(Vec2Fixed::from_ints(20, 20));
        assert_eq!(
            dispatcher.plan(&sim, &ids, target).unwrap(),
            dispatcher.plan(&sim, &reversed, target).unwrap()
        );
    }

    #[test]
    fn test_attack_orders_spread_around_target() {
        let mut sim = Simulation::new();
        let west = spawn(&mut sim, 0, -10, 0);
        let north = spawn(&mut sim, 0, 0, 10);
        let enemy = spawn(&mut sim, 1, 0, 0);
        let dispatcher = OrderDispatcher {
            approach_ratio: Fixed::ONE,
            ..Default::default()
        };

        let orders = dispatcher
            .plan(&sim, &[west, north], OrderTarget::Entity(enemy))
            .unwrap();
        let range = Fixed::from_num(1.5);
        assert_eq!(
            orders,
            vec![
                (
                    west,
                    Order::Attack {
                        target: enemy,
                        approach_offset: Some(Vec2Fixed::new(-range, Fixed::ZERO)),
                    }
                ),
                (
                    north,
                    Order::Attack {
                        target: enemy,
                        approach_offset: Some(Vec2Fixed::new(Fixed::ZERO, range)),
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_attack_on_missing_target() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, 0, 0);
        assert!(matches!(
            OrderDispatcher::default().plan(&sim, &[a], OrderTarget::Entity(42)),
            Err(GameError::EntityNotFound(42))
        ));
    }

    #[test]
    fn test_issue_delivers_accepted_orders() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, 0, 0);
        let b = spawn(&mut sim, 0, 3, 0);
        let friend = spawn(&mut sim, 0, 6, 0);
        let dispatcher = OrderDispatcher::default();

        // Attacking a friendly unit is silently refused.
        let accepted = dispatcher
            .issue(&mut sim, &[a, b], OrderTarget::Entity(friend))
            .unwrap();
        assert!(accepted.is_empty());

        let accepted = dispatcher
            .issue(&mut sim, &[a, b, 99], OrderTarget::Point(Vec2Fixed::from_ints(0, 30)))
            .unwrap();
        assert_eq!(accepted.len(), 2);
        assert_eq!(sim.get_unit(a).unwrap().controller.state(), AiState::MoveOrder);

        dispatcher.issue(&mut sim, &[a, b], OrderTarget::Stop).unwrap();
        assert_eq!(sim.get_unit(b).unwrap().controller.state(), AiState::Idle);
    }
}
