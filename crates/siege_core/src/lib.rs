//! # Siege Core
//!
//! Combat simulation core for Crystal Siege.
//!
//! This crate contains **only** the arena simulation:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! Many autonomous units (towers, melee/ranged fighters, production
//! buildings) share a 2D arena. Each unit finds a target, closes in
//! while steering around other bodies, attacks on a cooldown gated by
//! its windup animation, dies, and is recycled through an object pool.
//!
//! ## Crate Structure
//!
//! - [`battle`] - Unit storage, frame loop, composition root
//! - [`unit`] - The per-unit combat state machine
//! - [`steering`] - Local collision avoidance and movement recovery
//! - [`targeting`] - Throttled target acquisition
//! - [`producer`] - Production buildings and spawn placement
//! - [`pool`] - Checkout/check-in lifecycle for recyclable instances
//! - [`index`] - Categorized spatial queries over live units
//! - [`services`] - Collaborator traits and the service registry
//! - [`data`] - RON-loadable unit archetypes
//! - [`config`] - Tuning parameters
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod animation;
pub mod battle;
pub mod config;
pub mod data;
pub mod error;
pub mod handle;
pub mod index;
pub mod math;
pub mod pool;
pub mod producer;
pub mod projectile;
pub mod services;
pub mod stats;
pub mod steering;
pub mod targeting;
pub mod unit;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::battle::{Battle, DamageEvent, KillEvent, TickEvents, TICK_RATE};
    pub use crate::config::{ArenaBounds, AvoidanceTuning, BattleConfig, CombatTuning};
    pub use crate::data::{ArchetypeRegistry, UnitArchetype};
    pub use crate::error::{CoreError, Result};
    pub use crate::handle::UnitHandle;
    pub use crate::math::{Fx, Vec2Fx};
    pub use crate::pool::UnitPool;
    pub use crate::producer::{BuildingProducer, ProducerConfig};
    pub use crate::services::{
        DamageLog, DamageSink, EnhancementTable, GameDirector, GamePhase, ResourceLedger,
        ServiceRegistry, SharedPhase, StatModifierPipeline,
    };
    pub use crate::stats::{Faction, Health, UnitKind, UnitStats};
    pub use crate::unit::{ActionState, CombatUnit, UnitSnapshot};
}
