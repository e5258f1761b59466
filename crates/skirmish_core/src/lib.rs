//! # Skirmish Core
//!
//! Deterministic per-unit AI and combat simulation for a real-time strategy
//! game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond explicit replay files
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Lockstep multiplayer (identical simulation across clients)
//! - Headless batch runs
//! - Replay systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`components`] - Plain data shared by units: health, weapons, orders
//! - [`perception`] - Sight checks and target selection
//! - [`controller`] - The per-unit AI state machine
//! - [`combat`] - Attack gating, delayed effects and projectiles
//! - [`navigation`] - Pluggable movement services
//! - [`formation`] / [`dispatcher`] - Group orders
//! - [`simulation`] - Core tick loop
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod components;
pub mod config;
pub mod controller;
pub mod data;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod formation;
pub mod math;
pub mod navigation;
pub mod perception;
pub mod projectile;
pub mod replay;
pub mod simulation;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{AttackFailure, CombatResolver, Damageable, DamageReport};
    pub use crate::components::*;
    pub use crate::config::{AiTuning, ProjectileTuning, SimulationConfig};
    pub use crate::controller::{Steering, UnitController};
    pub use crate::data::{UnitCatalog, UnitData, WeaponData};
    pub use crate::dispatcher::{OrderDispatcher, OrderTarget};
    pub use crate::error::{GameError, Result};
    pub use crate::events::TickEvents;
    pub use crate::formation::FormationShape;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::navigation::{DirectNavigator, NavigationService};
    pub use crate::perception::{Perception, SpatialQuery, WorldSnapshot};
    pub use crate::replay::Replay;
    pub use crate::simulation::Simulation;
    pub use crate::unit::{Unit, UnitSpawnParams};
}
