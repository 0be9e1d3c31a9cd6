//! Property-based testing strategies.
//!
//! Strategies producing arbitrary-but-valid unit stats and modifier
//! tables, plus property tests for the pool/activation contracts that
//! must hold for *any* stat sheet, not just the shipped archetypes.

use proptest::prelude::*;

use siege_core::prelude::*;

/// Strategy for a plausible fighter stat sheet.
pub fn arb_fighter_stats() -> impl Strategy<Value = UnitStats> {
    (
        10u32..2000,   // max_health
        1u32..200,     // attack_damage
        1u32..80,      // attack_interval_ticks
        20i32..400,    // attack_range
        1i32..8,       // move_speed
        8i32..40,      // collision_radius
    )
        .prop_map(|(hp, damage, interval, range, speed, radius)| {
            UnitStats::fighter(
                hp,
                damage,
                interval,
                Fx::from_num(range),
                Fx::from_num(speed),
                Fx::from_num(radius),
            )
        })
}

/// Strategy for a flat stat-delta row.
pub fn arb_stat_deltas() -> impl Strategy<Value = siege_core::services::StatDeltas> {
    (-50i32..200, -20i32..100).prop_map(|(max_health, attack_damage)| {
        siege_core::services::StatDeltas {
            max_health,
            attack_damage,
            ..Default::default()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use siege_core::services::StatModifierPipeline;

    fn archetype_with(stats: UnitStats) -> UnitArchetype {
        UnitArchetype {
            kind: UnitKind::Raider,
            name: "Raider".into(),
            cost: 0,
            stats,
        }
    }

    fn registry_with(stats: UnitStats) -> ArchetypeRegistry {
        let mut registry = ArchetypeRegistry::new();
        registry.register(archetype_with(stats));
        registry
    }

    fn services_with(deltas: siege_core::services::StatDeltas) -> ServiceRegistry {
        let mut table = EnhancementTable::default();
        table.per_kind.insert(UnitKind::Raider, deltas);
        let mut services = ServiceRegistry::new();
        services.set_modifiers(Box::new(table));
        services
    }

    proptest! {
        /// Checkout → combat mutation → check-in → checkout yields the
        /// pristine sheet, whatever the sheet and whatever the mutation.
        #[test]
        fn pool_roundtrip_restores_pristine(
            stats in arb_fighter_stats(),
            damage_boost in 1u32..500,
        ) {
            let registry = registry_with(stats.clone());
            let services = ServiceRegistry::new();
            let mut pool = UnitPool::new(8);

            let mut unit = pool.checkout(UnitKind::Raider, &registry).unwrap();
            unit.activate(Vec2Fx::ZERO, &services);
            unit.live_stats_mut().attack_damage += damage_boost;
            unit.live_stats_mut().max_health += 17;

            pool.checkin(unit);
            let unit = pool.checkout(UnitKind::Raider, &registry).unwrap();
            prop_assert_eq!(unit.live_stats(), &stats);
        }

        /// Activating twice without a check-in applies the modifier
        /// pipeline exactly once, for any delta table.
        #[test]
        fn double_activation_applies_modifiers_once(
            stats in arb_fighter_stats(),
            deltas in arb_stat_deltas(),
        ) {
            let registry = registry_with(stats.clone());
            let services = services_with(deltas);

            let mut expected = stats;
            services.modifiers().apply_unit_enhancements(UnitKind::Raider, &mut expected);
            services.modifiers().apply_talent_effects(&mut expected);

            let mut unit = CombatUnit::from_archetype(
                registry.get(UnitKind::Raider).unwrap(),
            );
            unit.activate(Vec2Fx::ZERO, &services);
            unit.activate(Vec2Fx::ZERO, &services);

            prop_assert_eq!(unit.live_stats().attack_damage, expected.attack_damage);
            prop_assert_eq!(unit.live_stats().max_health, expected.max_health);
        }
    }
}
