//! Unit classification and stat definitions.
//!
//! Identity is resolved once at creation: a unit's [`UnitKind`] fixes its
//! faction, whether it moves, whether it fights, and how the spatial index
//! categorizes it. Nothing in the simulation classifies units by name at
//! runtime.

use serde::{Deserialize, Serialize};

use crate::math::{fx_serde, option_fx_serde, Fx};

/// Side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Crystal defenders: towers, hunters, militia, walls, the crystal.
    Defenders,
    /// Attacking raiders.
    Raiders,
}

impl Faction {
    /// The faction this one fights against.
    #[must_use]
    pub const fn opposing(self) -> Self {
        match self {
            Self::Defenders => Self::Raiders,
            Self::Raiders => Self::Defenders,
        }
    }
}

/// Every concrete unit type in the arena.
///
/// The kind doubles as the pool key: recycled instances are only ever
/// reissued as the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Stationary ranged defender structure.
    Tower,
    /// Mobile ranged defender.
    Hunter,
    /// Mobile melee defender.
    Militia,
    /// Inert defender structure that blocks raider movement.
    StoneWall,
    /// The objective. Defenders lose when it falls.
    Crystal,
    /// Defender structure that periodically produces militia.
    Barracks,
    /// Mobile melee raider.
    Raider,
    /// Slow, heavily armored melee raider.
    RaiderBrute,
}

impl UnitKind {
    /// All kinds, in index-category order.
    pub const ALL: [Self; 8] = [
        Self::Tower,
        Self::Hunter,
        Self::Militia,
        Self::StoneWall,
        Self::Crystal,
        Self::Barracks,
        Self::Raider,
        Self::RaiderBrute,
    ];

    /// The faction this kind belongs to.
    #[must_use]
    pub const fn faction(self) -> Faction {
        match self {
            Self::Tower
            | Self::Hunter
            | Self::Militia
            | Self::StoneWall
            | Self::Crystal
            | Self::Barracks => Faction::Defenders,
            Self::Raider | Self::RaiderBrute => Faction::Raiders,
        }
    }

    /// Check if this kind is a stationary structure.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(
            self,
            Self::Tower | Self::StoneWall | Self::Crystal | Self::Barracks
        )
    }

    /// Check if this kind moves under its own power.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        !self.is_structure()
    }

    /// Check if this kind can attack.
    #[must_use]
    pub const fn can_attack(self) -> bool {
        matches!(
            self,
            Self::Tower | Self::Hunter | Self::Militia | Self::Raider | Self::RaiderBrute
        )
    }

    /// Check if this kind attacks with projectiles rather than in melee.
    #[must_use]
    pub const fn is_ranged(self) -> bool {
        matches!(self, Self::Tower | Self::Hunter)
    }

    /// Check if other units must steer around this kind.
    ///
    /// Every live body in the arena is an obstacle; the distinction exists
    /// so future incorporeal kinds have one switch to flip.
    #[must_use]
    pub const fn is_collidable(self) -> bool {
        true
    }

    /// Check if opposing units may select this kind as an attack target.
    #[must_use]
    pub const fn is_targetable(self) -> bool {
        true
    }
}

/// Health points of a damageable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health at full.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if the unit is destroyed (health == 0).
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.current == 0
    }

    /// Check if at full health.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction to prevent underflow.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current = self.current.saturating_sub(actual);
        actual
    }

    /// Heal, returning the actual amount restored (no overheal).
    pub fn heal(&mut self, amount: u32) -> u32 {
        let headroom = self.max.saturating_sub(self.current);
        let actual = amount.min(headroom);
        self.current = self.current.saturating_add(actual);
        actual
    }
}

/// Complete stat sheet for one unit.
///
/// A unit keeps two copies: an immutable pristine snapshot taken when the
/// instance is first built, and the live copy the modifier pipeline and
/// combat mutate. Check-in restores live from pristine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum health points.
    pub max_health: u32,
    /// Damage per attack.
    pub attack_damage: u32,
    /// Ticks required between attacks.
    pub attack_interval_ticks: u32,
    /// Attack range in world units.
    #[serde(with = "fx_serde")]
    pub attack_range: Fx,
    /// Target-search radius. `None` falls back to the configured multiple
    /// of attack range (default 2×).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_fx_serde"
    )]
    pub detection_range: Option<Fx>,
    /// Movement speed in world units per tick. Zero for structures.
    #[serde(with = "fx_serde")]
    pub move_speed: Fx,
    /// Body radius for collision and separation checks.
    #[serde(with = "fx_serde")]
    pub collision_radius: Fx,
    /// Projectile travel speed per tick, for ranged kinds.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_fx_serde"
    )]
    pub projectile_speed: Option<Fx>,
    /// Health restored per second while wounded (talent-granted).
    #[serde(default)]
    pub health_regen: u32,
    /// Display/progression level.
    #[serde(default = "default_level")]
    pub level: u32,
}

fn default_level() -> u32 {
    1
}

impl UnitStats {
    /// Create a stat sheet for a non-combat structure.
    #[must_use]
    pub fn structure(max_health: u32, collision_radius: Fx) -> Self {
        Self {
            max_health,
            attack_damage: 0,
            attack_interval_ticks: 0,
            attack_range: Fx::ZERO,
            detection_range: None,
            move_speed: Fx::ZERO,
            collision_radius,
            projectile_speed: None,
            health_regen: 0,
            level: 1,
        }
    }

    /// Create a stat sheet for a fighting unit.
    #[must_use]
    pub fn fighter(
        max_health: u32,
        attack_damage: u32,
        attack_interval_ticks: u32,
        attack_range: Fx,
        move_speed: Fx,
        collision_radius: Fx,
    ) -> Self {
        Self {
            max_health,
            attack_damage,
            attack_interval_ticks,
            attack_range,
            detection_range: None,
            move_speed,
            collision_radius,
            projectile_speed: None,
            health_regen: 0,
            level: 1,
        }
    }

    /// Builder method to set an explicit detection range.
    #[must_use]
    pub fn with_detection_range(mut self, range: Fx) -> Self {
        self.detection_range = Some(range);
        self
    }

    /// Builder method to set projectile speed (makes attacks ranged).
    #[must_use]
    pub fn with_projectile_speed(mut self, speed: Fx) -> Self {
        self.projectile_speed = Some(speed);
        self
    }

    /// Builder method to set health regeneration.
    #[must_use]
    pub fn with_health_regen(mut self, per_second: u32) -> Self {
        self.health_regen = per_second;
        self
    }

    /// Builder method to set the unit level.
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Effective target-search radius, applying the configured fallback
    /// multiple of attack range when no explicit detection range is set.
    #[must_use]
    pub fn effective_detection_range(&self, factor: Fx) -> Fx {
        self.detection_range
            .unwrap_or(self.attack_range * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_opposing() {
        assert_eq!(Faction::Defenders.opposing(), Faction::Raiders);
        assert_eq!(Faction::Raiders.opposing(), Faction::Defenders);
    }

    #[test]
    fn test_kind_classification() {
        assert!(UnitKind::Tower.is_structure());
        assert!(UnitKind::Tower.can_attack());
        assert!(UnitKind::Tower.is_ranged());
        assert!(!UnitKind::Tower.is_mobile());

        assert!(UnitKind::Raider.is_mobile());
        assert!(!UnitKind::Raider.is_ranged());

        assert!(!UnitKind::StoneWall.can_attack());
        assert!(!UnitKind::Crystal.can_attack());
        assert_eq!(UnitKind::Crystal.faction(), Faction::Defenders);
    }

    #[test]
    fn test_health_damage_saturates() {
        let mut health = Health::new(50);
        assert_eq!(health.apply_damage(30), 30);
        assert_eq!(health.current, 20);
        // Overkill deals only what was left
        assert_eq!(health.apply_damage(100), 20);
        assert_eq!(health.current, 0);
        assert!(health.is_destroyed());
    }

    #[test]
    fn test_health_heal_no_overheal() {
        let mut health = Health::new(100);
        health.apply_damage(40);
        assert_eq!(health.heal(1000), 40);
        assert!(health.is_full());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Health stays in `0..=max` through any damage/heal sequence,
            /// and zero health always reads as destroyed.
            #[test]
            fn health_bounds_hold(
                max in 1u32..10_000,
                ops in proptest::collection::vec((any::<bool>(), 0u32..20_000), 0..64),
            ) {
                let mut health = Health::new(max);
                for (is_damage, amount) in ops {
                    if is_damage {
                        health.apply_damage(amount);
                    } else {
                        health.heal(amount);
                    }
                    prop_assert!(health.current <= health.max);
                    prop_assert_eq!(health.is_destroyed(), health.current == 0);
                }
            }

            /// Damage reports exactly the health removed.
            #[test]
            fn damage_reports_actual(max in 1u32..10_000, amount in 0u32..20_000) {
                let mut health = Health::new(max);
                let before = health.current;
                let dealt = health.apply_damage(amount);
                prop_assert_eq!(dealt, before - health.current);
            }
        }
    }

    #[test]
    fn test_detection_range_fallback() {
        let stats = UnitStats::fighter(
            100,
            10,
            20,
            Fx::from_num(200),
            Fx::from_num(3),
            Fx::from_num(20),
        );
        assert_eq!(
            stats.effective_detection_range(Fx::from_num(2)),
            Fx::from_num(400)
        );

        let custom = stats.with_detection_range(Fx::from_num(500));
        assert_eq!(
            custom.effective_detection_range(Fx::from_num(2)),
            Fx::from_num(500)
        );
    }
}
