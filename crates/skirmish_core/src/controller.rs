//! Per-unit AI state machine.
//!
//! Each tick a controller validates its target, runs perception (unless a
//! move order or a player-forced target suppresses it), then executes its
//! current state. A transition taken during the tick runs the new state's
//! action in the same tick, so `Idle -> Chase -> Attack` can complete in one
//! update when a hostile is already in reach.
//!
//! The controller never moves the unit itself; it returns a [`Steering`]
//! request that the simulation's movement phase applies.

use serde::{Deserialize, Serialize};

use crate::combat::CombatResolver;
use crate::components::{AiState, EngagementProfile, EntityId, Order, PatrolRoute, Tick, Weapon};
use crate::config::AiTuning;
use crate::events::AttackEvent;
use crate::math::{angle_difference, fixed_serde, Fixed, Vec2Fixed};
use crate::perception::{Perception, SpatialEntry, SpatialQuery};

/// Upper bound on state evaluations per update.
const MAX_STEPS: usize = 4;

/// Movement requested by a controller for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Steering {
    /// Stay put.
    #[default]
    Hold,
    /// Head toward a point.
    Toward(Vec2Fixed),
}

/// Everything a controller update produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerOutput {
    /// Movement request.
    pub steering: Steering,
    /// Point the unit should turn to face, overriding travel direction.
    pub face_toward: Option<Vec2Fixed>,
    /// Attack started this tick.
    pub attack_started: Option<AttackEvent>,
    /// State transitions in the order they happened.
    pub transitions: Vec<(AiState, AiState)>,
    /// A move order was given up as unreachable.
    pub abandoned_move: bool,
}

/// Borrowed view of the world a controller needs for one update.
pub struct ControllerContext<'a> {
    /// The controlled unit as of the start of the tick.
    pub me: SpatialEntry,
    /// Current orientation of the controlled unit.
    pub facing: Fixed,
    /// The unit's weapon; `None` for non-combatants.
    pub weapon: Option<&'a mut Weapon>,
    /// The unit's senses.
    pub perception: &'a mut Perception,
    /// Start-of-tick world view.
    pub world: &'a dyn SpatialQuery,
    /// Shared attack scheduler.
    pub combat: &'a mut CombatResolver,
    /// Shared thresholds.
    pub tuning: &'a AiTuning,
    /// Current tick.
    pub now: Tick,
    /// Arrival report from the navigation service, if the unit is navigated.
    pub nav_arrived: Option<bool>,
}

/// Progress tracking for the active move order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct MoveProgress {
    #[serde(with = "fixed_serde")]
    best_distance: Fixed,
    stalled_ticks: u32,
    elapsed: u32,
}

impl Default for MoveProgress {
    fn default() -> Self {
        Self {
            best_distance: Fixed::MAX,
            stalled_ticks: 0,
            elapsed: 0,
        }
    }
}

/// Finite-state controller owned by one unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitController {
    state: AiState,
    target: Option<EntityId>,
    /// Target was chosen by a player attack order.
    forced: bool,
    order: Option<Order>,
    patrol: Option<PatrolRoute>,
    profile: EngagementProfile,
    progress: MoveProgress,
}

impl UnitController {
    /// Create an idle controller.
    #[must_use]
    pub fn new(profile: EngagementProfile) -> Self {
        Self {
            state: AiState::Idle,
            target: None,
            forced: false,
            order: None,
            patrol: None,
            profile,
            progress: MoveProgress::default(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AiState {
        self.state
    }

    /// Current target.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Check whether the current target came from a player attack order.
    #[must_use]
    pub fn is_target_forced(&self) -> bool {
        self.forced
    }

    /// The order being executed.
    #[must_use]
    pub fn active_order(&self) -> Option<Order> {
        self.order
    }

    /// Standing patrol route.
    #[must_use]
    pub fn patrol(&self) -> Option<&PatrolRoute> {
        self.patrol.as_ref()
    }

    /// Engagement limits.
    #[must_use]
    pub fn profile(&self) -> EngagementProfile {
        self.profile
    }

    /// Assign a patrol route. An empty route clears the assignment.
    pub fn set_patrol(&mut self, route: PatrolRoute) {
        self.patrol = (!route.is_empty()).then_some(route);
    }

    /// Remove the patrol route; a patrolling unit goes idle.
    pub fn clear_patrol(&mut self) -> Option<(AiState, AiState)> {
        self.patrol = None;
        if self.state == AiState::Patrol {
            self.state = AiState::Idle;
            return Some((AiState::Patrol, AiState::Idle));
        }
        None
    }

    /// Accept a player order. Takes effect immediately and replaces any
    /// previous order.
    pub fn receive(&mut self, order: Order) -> Option<(AiState, AiState)> {
        let from = self.state;
        match order {
            Order::Stop => {
                self.target = None;
                self.forced = false;
                self.order = None;
                self.state = AiState::Idle;
            }
            Order::Move(_) => {
                self.target = None;
                self.forced = false;
                self.order = Some(order);
                self.progress = MoveProgress::default();
                self.state = AiState::MoveOrder;
            }
            Order::Attack { target, .. } => {
                self.target = Some(target);
                self.forced = true;
                self.order = Some(order);
                self.state = AiState::Chase;
            }
        }

        (from != self.state).then_some((from, self.state))
    }

    /// Run one tick of the state machine.
    pub fn update(&mut self, ctx: &mut ControllerContext<'_>) -> ControllerOutput {
        let mut out = ControllerOutput::default();

        let mut target = self.validate_target(ctx, &mut out);
        if ctx.weapon.is_some() && !self.forced && self.state != AiState::MoveOrder {
            target = self.acquire(ctx, target, &mut out);
        }

        for _ in 0..MAX_STEPS {
            let settled = match self.state {
                AiState::Idle => self.idle(&mut out),
                AiState::Patrol => self.patrol_step(ctx, &mut out),
                AiState::MoveOrder => self.move_step(ctx, &mut out),
                AiState::Chase => self.chase_step(ctx, &mut target, &mut out),
                AiState::Attack => self.attack_step(ctx, target, &mut out),
            };
            if settled {
                break;
            }
        }

        out
    }

    fn transition(&mut self, to: AiState, out: &mut ControllerOutput) {
        if self.state != to {
            out.transitions.push((self.state, to));
            self.state = to;
        }
    }

    fn fallback_state(&self) -> AiState {
        if self.patrol.is_some() {
            AiState::Patrol
        } else {
            AiState::Idle
        }
    }

    /// Forget the target and leave any engaged state.
    fn abandon_target(&mut self, out: &mut ControllerOutput) {
        self.target = None;
        self.forced = false;
        if matches!(self.order, Some(Order::Attack { .. })) {
            self.order = None;
        }
        if self.state.is_engaged() {
            self.transition(self.fallback_state(), out);
        }
    }

    fn validate_target(
        &mut self,
        ctx: &ControllerContext<'_>,
        out: &mut ControllerOutput,
    ) -> Option<SpatialEntry> {
        let id = self.target?;
        let entry = ctx.world.lookup(id).filter(|entry| entry.alive);
        if entry.is_none() {
            tracing::debug!(unit = ctx.me.id, target = id, "Target no longer valid");
            self.abandon_target(out);
        }
        entry
    }

    fn acquire(
        &mut self,
        ctx: &mut ControllerContext<'_>,
        current: Option<SpatialEntry>,
        out: &mut ControllerOutput,
    ) -> Option<SpatialEntry> {
        let me = ctx.me;
        let best = ctx.perception.scan(
            ctx.world,
            me.id,
            me.position,
            me.team,
            ctx.now,
            ctx.tuning.memory_ticks,
        );

        match best {
            Some(candidate) if current.map(|c| c.id) != Some(candidate.id) => {
                tracing::debug!(unit = me.id, target = candidate.id, "Target acquired");
                self.target = Some(candidate.id);
                self.transition(AiState::Chase, out);
                Some(candidate)
            }
            _ => current,
        }
    }

    fn idle(&mut self, out: &mut ControllerOutput) -> bool {
        if self.patrol.is_some() {
            self.transition(AiState::Patrol, out);
            return false;
        }
        true
    }

    fn patrol_step(&mut self, ctx: &ControllerContext<'_>, out: &mut ControllerOutput) -> bool {
        let Some(route) = self.patrol.as_mut() else {
            self.transition(AiState::Idle, out);
            return true;
        };

        let tolerance = ctx.tuning.waypoint_tolerance;
        if let Some(waypoint) = route.current() {
            if ctx.me.position.distance_squared(waypoint) <= tolerance * tolerance {
                route.advance();
            }
        }
        if let Some(waypoint) = route.current() {
            out.steering = Steering::Toward(waypoint);
        }
        true
    }

    fn move_step(&mut self, ctx: &ControllerContext<'_>, out: &mut ControllerOutput) -> bool {
        let Some(Order::Move(destination)) = self.order else {
            self.transition(AiState::Idle, out);
            return true;
        };

        let distance = ctx.me.position.distance(destination);
        let nav_arrived = self.progress.elapsed > 0 && ctx.nav_arrived == Some(true);
        if nav_arrived || distance <= ctx.tuning.arrival_tolerance {
            tracing::debug!(unit = ctx.me.id, "Move order complete");
            self.order = None;
            self.transition(AiState::Idle, out);
            return true;
        }

        let progress = &mut self.progress;
        progress.elapsed += 1;
        if distance <= progress.best_distance.saturating_sub(ctx.tuning.stuck_epsilon) {
            progress.best_distance = distance;
            progress.stalled_ticks = 0;
        } else {
            progress.stalled_ticks += 1;
        }

        if progress.stalled_ticks >= ctx.tuning.stuck_ticks {
            tracing::debug!(
                unit = ctx.me.id,
                stalled = progress.stalled_ticks,
                "Move order abandoned, destination unreachable"
            );
            self.order = None;
            out.abandoned_move = true;
            self.transition(AiState::Idle, out);
            return true;
        }

        out.steering = Steering::Toward(destination);
        true
    }

    fn chase_step(
        &mut self,
        ctx: &ControllerContext<'_>,
        target: &mut Option<SpatialEntry>,
        out: &mut ControllerOutput,
    ) -> bool {
        let reach = ctx.weapon.as_ref().map(|weapon| weapon.range);
        let (Some(entry), Some(range)) = (*target, reach) else {
            self.abandon_target(out);
            *target = None;
            return false;
        };

        let me = ctx.me;
        let distance = me.position.distance(entry.position);

        if !self.forced {
            if distance > self.profile.lose_interest_range {
                tracing::debug!(unit = me.id, target = entry.id, "Lost interest in target");
                self.abandon_target(out);
                *target = None;
                return false;
            }

            if distance > ctx.perception.sight_range {
                match ctx.perception.last_seen(entry.id) {
                    Some(record)
                        if ctx.now.saturating_sub(record.last_seen)
                            <= Tick::from(ctx.tuning.aggro_cooldown_ticks) =>
                    {
                        out.steering = Steering::Toward(record.last_position);
                        return true;
                    }
                    _ => {
                        tracing::debug!(unit = me.id, target = entry.id, "Aggro expired");
                        self.abandon_target(out);
                        *target = None;
                        return false;
                    }
                }
            }
        }

        if distance <= range + ctx.tuning.chase_buffer {
            self.transition(AiState::Attack, out);
            return false;
        }

        let goal = match self.order {
            Some(Order::Attack {
                approach_offset: Some(offset),
                ..
            }) => entry.position + offset,
            _ => entry.position,
        };
        out.steering = Steering::Toward(goal);
        true
    }

    fn attack_step(
        &mut self,
        ctx: &mut ControllerContext<'_>,
        target: Option<SpatialEntry>,
        out: &mut ControllerOutput,
    ) -> bool {
        let me = ctx.me;
        let (Some(entry), Some(weapon)) = (target, ctx.weapon.as_deref_mut()) else {
            self.abandon_target(out);
            return false;
        };

        out.face_toward = Some(entry.position);

        // Out of reach: back to Chase, no further evaluation this tick.
        if me.position.distance(entry.position) > weapon.range + ctx.tuning.chase_buffer {
            self.transition(AiState::Chase, out);
            out.steering = Steering::Toward(entry.position);
            return true;
        }

        let aligned = !ctx.tuning.require_facing
            || angle_difference(ctx.facing, (entry.position - me.position).angle()).abs()
                <= ctx.tuning.facing_tolerance;
        if aligned && CombatResolver::can_attack(weapon, ctx.now) {
            match ctx
                .combat
                .try_attack(&me, weapon, Some(&entry), ctx.now, ctx.tuning.chase_buffer)
            {
                Ok(event) => out.attack_started = Some(event),
                Err(reason) => tracing::debug!(unit = me.id, %reason, "Attack rejected"),
            }
        }
        true
    }
}
