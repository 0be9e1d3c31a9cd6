//! Test fixtures and helpers.
//!
//! Pre-built battle setups and fixed-point shorthands for consistent
//! testing across crates.

use fixed::types::I32F32;

use siege_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fx(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fx_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a point from integer coordinates.
#[must_use]
pub fn at(x: i32, y: i32) -> Vec2Fx {
    Vec2Fx::new(fx(x), fx(y))
}

/// A small skirmish: crystal and towers on one side, a raider wave on
/// the other, using the shipped default archetypes.
#[must_use]
pub fn skirmish_battle() -> Battle {
    let mut battle = Battle::with_defaults();
    battle
        .spawn_unit(UnitKind::Crystal, at(1000, 1400))
        .expect("crystal archetype");
    for i in 0..2 {
        battle
            .spawn_unit(UnitKind::Tower, at(850 + i * 300, 1200))
            .expect("tower archetype");
    }
    for i in 0..6 {
        battle
            .spawn_unit(UnitKind::Militia, at(800 + i * 80, 1000))
            .expect("militia archetype");
    }
    for i in 0..8 {
        let raider = battle
            .spawn_unit(UnitKind::Raider, at(700 + i * 90, 200))
            .expect("raider archetype");
        // Waves march on the crystal until defenders enter detection
        // range.
        battle
            .issue_move(raider, at(1000, 1400))
            .expect("march order");
    }
    battle
}
