//! Battle tuning parameters.
//!
//! The avoidance and combat constants here were tuned empirically in play
//! testing. They are carried as configuration, loadable from RON next to
//! the unit archetypes, rather than baked into the algorithms: scenario
//! files may override any of them, and the defaults reproduce the shipped
//! balance.
//!
//! Durations are stored in simulation ticks at the fixed 20 Hz rate
//! ([`TICK_RATE`](crate::battle::TICK_RATE)); e.g. 4 ticks ≈ 0.2 s.

use serde::{Deserialize, Serialize};

use crate::math::{fx_serde, Fx, Vec2Fx};

/// Rectangular playable area. Candidate positions are clamped here before
/// any collision test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaBounds {
    /// Lower-left corner.
    pub min: Vec2Fx,
    /// Upper-right corner.
    pub max: Vec2Fx,
}

impl ArenaBounds {
    /// Create bounds from corner coordinates.
    #[must_use]
    pub const fn new(min: Vec2Fx, max: Vec2Fx) -> Self {
        Self { min, max }
    }

    /// Clamp a point so a body of the given radius stays fully inside.
    #[must_use]
    pub fn clamp_with_radius(&self, point: Vec2Fx, radius: Fx) -> Vec2Fx {
        Vec2Fx::new(
            point.x.clamp(self.min.x + radius, self.max.x - radius),
            point.y.clamp(self.min.y + radius, self.max.y - radius),
        )
    }

    /// Check whether a point lies inside the bounds.
    #[must_use]
    pub fn contains(&self, point: Vec2Fx) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

impl Default for ArenaBounds {
    fn default() -> Self {
        Self {
            min: Vec2Fx::ZERO,
            max: Vec2Fx::new(Fx::from_num(2000), Fx::from_num(2000)),
        }
    }
}

/// Tuning for local collision avoidance and movement recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvoidanceTuning {
    /// Obstacle search radius as a multiple of the unit's collision radius.
    #[serde(with = "fx_serde")]
    pub obstacle_radius_factor: Fx,
    /// Minimum separation between two bodies as a multiple of the sum of
    /// their collision radii.
    #[serde(with = "fx_serde")]
    pub separation_factor: Fx,
    /// Ticks the blended steering direction is reused before recomputing.
    pub cache_window_ticks: u32,
    /// Repulsion magnitude above which the strong blend weight applies.
    #[serde(with = "fx_serde")]
    pub strong_repulsion: Fx,
    /// Repulsion magnitude above which the mild blend weight applies.
    #[serde(with = "fx_serde")]
    pub mild_repulsion: Fx,
    /// Blend weight toward avoidance when repulsion is strong.
    #[serde(with = "fx_serde")]
    pub weight_strong: Fx,
    /// Blend weight toward avoidance when repulsion is mild.
    #[serde(with = "fx_serde")]
    pub weight_mild: Fx,
    /// Blend weight toward avoidance otherwise.
    #[serde(with = "fx_serde")]
    pub weight_weak: Fx,
    /// Multiplier on an obstacle's repulsion contribution once the pair is
    /// inside its minimum separation.
    #[serde(with = "fx_serde")]
    pub overlap_boost: Fx,
    /// Speed multiplier while correcting a hard overlap.
    #[serde(with = "fx_serde")]
    pub push_apart_boost: Fx,
    /// Fraction of a normal step used for the last-resort nudge when all
    /// rotated headings are blocked.
    #[serde(with = "fx_serde")]
    pub nudge_scale: Fx,
    /// Rotated headings (degrees) tried when a candidate position collides.
    /// Large angles first; only `max_heading_retries` of them are tested.
    pub retry_headings_deg: Vec<i32>,
    /// Bound on rotated-heading attempts per tick.
    pub max_heading_retries: usize,
    /// Ticks between hard-overlap scans.
    pub collision_check_ticks: u32,
    /// Displacement per tick below which a unit is considered not moving.
    #[serde(with = "fx_serde")]
    pub stuck_epsilon: Fx,
    /// Consecutive low-displacement ticks before a unit counts as stuck.
    pub stuck_after_ticks: u32,
    /// Ticks a stuck unit holds position before a forced replan.
    pub stuck_hold_ticks: u32,
}

impl Default for AvoidanceTuning {
    fn default() -> Self {
        Self {
            obstacle_radius_factor: Fx::from_num(4),
            separation_factor: Fx::from_num(1.2),
            cache_window_ticks: 10,
            strong_repulsion: Fx::from_num(2),
            mild_repulsion: Fx::from_num(1),
            weight_strong: Fx::from_num(0.9),
            weight_mild: Fx::from_num(0.7),
            weight_weak: Fx::from_num(0.5),
            overlap_boost: Fx::from_num(2),
            push_apart_boost: Fx::from_num(1.5),
            nudge_scale: Fx::from_num(0.5),
            retry_headings_deg: vec![60, -60, 90, -90],
            max_heading_retries: 2,
            collision_check_ticks: 2,
            stuck_epsilon: Fx::from_num(0.5),
            stuck_after_ticks: 6,
            stuck_hold_ticks: 4,
        }
    }
}

/// Tuning for attack timing and target acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatTuning {
    /// Ticks between attack start and damage/projectile creation.
    pub windup_ticks: u32,
    /// Duration of the hit-reaction animation overlay.
    pub hit_overlay_ticks: u32,
    /// Duration of the death animation before pool check-in.
    pub death_ticks: u32,
    /// Ticks between target rescans while a valid target is held.
    pub rescan_ticks: u32,
    /// Detection range as a multiple of attack range, used when an
    /// archetype does not specify its own detection range.
    #[serde(with = "fx_serde")]
    pub detection_range_factor: Fx,
    /// Distance at which a manual move order counts as arrived.
    #[serde(with = "fx_serde")]
    pub arrival_threshold: Fx,
    /// Hit radius for projectile impact checks.
    #[serde(with = "fx_serde")]
    pub projectile_hit_radius: Fx,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            windup_ticks: 6,
            hit_overlay_ticks: 4,
            death_ticks: 10,
            rescan_ticks: 4,
            detection_range_factor: Fx::from_num(2),
            arrival_threshold: Fx::from_num(10),
            projectile_hit_radius: Fx::from_num(30),
        }
    }
}

/// Complete battle configuration: arena plus all tuning groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Playable area.
    #[serde(default)]
    pub arena: ArenaBounds,
    /// Avoidance and movement-recovery tuning.
    #[serde(default)]
    pub avoidance: AvoidanceTuning,
    /// Attack timing and targeting tuning.
    #[serde(default)]
    pub combat: CombatTuning,
    /// Capacity of each pool free-list.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
}

fn default_pool_capacity() -> usize {
    32
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            arena: ArenaBounds::default(),
            avoidance: AvoidanceTuning::default(),
            combat: CombatTuning::default(),
            pool_capacity: default_pool_capacity(),
        }
    }
}
