//! Data-driven unit archetype definitions.
//!
//! Archetypes are the load-time description of each unit kind: the stat
//! sheet a fresh instance is built from, plus production metadata. The
//! headless runner loads them from RON files; tests construct them inline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::math::Fx;
use crate::stats::{UnitKind, UnitStats};

/// Load-time description of one unit kind.
///
/// # Example RON
///
/// ```ron
/// UnitArchetype(
///     kind: Raider,
///     name: "Raider",
///     cost: 25,
///     stats: UnitStats(
///         max_health: 120,
///         attack_damage: 14,
///         attack_interval_ticks: 24,
///         attack_range: 300647710720,   // fixed-point bits for 70.0
///         move_speed: 12884901888,      // fixed-point bits for 3.0
///         collision_radius: 85899345920, // fixed-point bits for 20.0
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitArchetype {
    /// Kind this archetype describes.
    pub kind: UnitKind,
    /// Display name, reported to the damage sink.
    pub name: String,
    /// Resource cost when produced past a building's free allowance.
    #[serde(default)]
    pub cost: u32,
    /// Pristine stat sheet for fresh instances.
    pub stats: UnitStats,
}

/// Registry of all archetypes, keyed by unit kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchetypeRegistry {
    archetypes: HashMap<UnitKind, UnitArchetype>,
}

impl ArchetypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an archetype.
    pub fn register(&mut self, archetype: UnitArchetype) {
        self.archetypes.insert(archetype.kind, archetype);
    }

    /// Look up the archetype for a kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownArchetype`] when the kind was never
    /// registered.
    pub fn get(&self, kind: UnitKind) -> Result<&UnitArchetype> {
        self.archetypes
            .get(&kind)
            .ok_or(CoreError::UnknownArchetype(kind))
    }

    /// Check whether a kind is registered.
    #[must_use]
    pub fn contains(&self, kind: UnitKind) -> bool {
        self.archetypes.contains_key(&kind)
    }

    /// Number of registered archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Parse a registry from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DataParseError`] when the text is malformed.
    pub fn from_ron(source: &str, origin: &str) -> Result<Self> {
        let archetypes: Vec<UnitArchetype> =
            ron::de::from_str(source).map_err(|e| CoreError::DataParseError {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        let mut registry = Self::new();
        for archetype in archetypes {
            registry.register(archetype);
        }
        Ok(registry)
    }

    /// A registry covering every kind with the shipped default balance.
    ///
    /// Used by benches and as the fallback when a scenario brings no
    /// archetype file of its own.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(UnitArchetype {
            kind: UnitKind::Tower,
            name: "Arrow Tower".into(),
            cost: 0,
            stats: UnitStats::fighter(
                600,
                22,
                30,
                Fx::from_num(260),
                Fx::ZERO,
                Fx::from_num(32),
            )
            .with_projectile_speed(Fx::from_num(24)),
        });
        registry.register(UnitArchetype {
            kind: UnitKind::Hunter,
            name: "Hunter".into(),
            cost: 40,
            stats: UnitStats::fighter(
                160,
                16,
                26,
                Fx::from_num(200),
                Fx::from_num(3),
                Fx::from_num(18),
            )
            .with_projectile_speed(Fx::from_num(20)),
        });
        registry.register(UnitArchetype {
            kind: UnitKind::Militia,
            name: "Militia".into(),
            cost: 25,
            // Melee reach is measured center to center, so it must clear
            // the enforced minimum separation against the largest bodies.
            stats: UnitStats::fighter(
                220,
                12,
                22,
                Fx::from_num(70),
                Fx::from_num(3),
                Fx::from_num(20),
            ),
        });
        registry.register(UnitArchetype {
            kind: UnitKind::StoneWall,
            name: "Stone Wall".into(),
            cost: 10,
            stats: UnitStats::structure(800, Fx::from_num(30)),
        });
        registry.register(UnitArchetype {
            kind: UnitKind::Crystal,
            name: "Crystal".into(),
            cost: 0,
            stats: UnitStats::structure(2000, Fx::from_num(48)),
        });
        registry.register(UnitArchetype {
            kind: UnitKind::Barracks,
            name: "Barracks".into(),
            cost: 0,
            stats: UnitStats::structure(1000, Fx::from_num(40)),
        });
        registry.register(UnitArchetype {
            kind: UnitKind::Raider,
            name: "Raider".into(),
            cost: 0,
            stats: UnitStats::fighter(
                120,
                14,
                24,
                Fx::from_num(70),
                Fx::from_num(3),
                Fx::from_num(20),
            ),
        });
        registry.register(UnitArchetype {
            kind: UnitKind::RaiderBrute,
            name: "Raider Brute".into(),
            cost: 0,
            stats: UnitStats::fighter(
                420,
                30,
                40,
                Fx::from_num(90),
                Fx::from_num(2),
                Fx::from_num(28),
            ),
        });
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_all_kinds() {
        let registry = ArchetypeRegistry::with_defaults();
        for kind in UnitKind::ALL {
            assert!(registry.contains(kind), "missing archetype for {kind:?}");
        }
    }

    #[test]
    fn test_unknown_kind_is_error() {
        let registry = ArchetypeRegistry::new();
        assert!(matches!(
            registry.get(UnitKind::Raider),
            Err(CoreError::UnknownArchetype(UnitKind::Raider))
        ));
    }

    #[test]
    fn test_ron_roundtrip() {
        let registry = ArchetypeRegistry::with_defaults();
        let list: Vec<&UnitArchetype> = UnitKind::ALL
            .iter()
            .map(|&k| registry.get(k).unwrap())
            .collect();
        let text = ron::ser::to_string(&list).expect("serialize");
        let back = ArchetypeRegistry::from_ron(&text, "inline").expect("parse");
        assert_eq!(back.len(), registry.len());
        assert_eq!(
            back.get(UnitKind::Militia).unwrap().stats,
            registry.get(UnitKind::Militia).unwrap().stats
        );
    }

    #[test]
    fn test_malformed_ron_is_data_error() {
        let err = ArchetypeRegistry::from_ron("not ron at all [", "broken.ron").unwrap_err();
        assert!(matches!(err, CoreError::DataParseError { .. }));
    }
}
