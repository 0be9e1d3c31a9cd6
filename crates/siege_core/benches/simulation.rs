//! Simulation benchmarks for siege_core.
//!
//! Run with: `cargo bench -p siege_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use siege_core::prelude::*;
use siege_test_utils::fixtures::at;

/// A mid-game arena: crystal, towers, a militia screen, two raider waves.
fn populated_battle() -> Battle {
    let mut battle = Battle::with_defaults();
    battle.spawn_unit(UnitKind::Crystal, at(1000, 1000)).unwrap();
    for i in 0..4 {
        battle
            .spawn_unit(UnitKind::Tower, at(700 + i * 200, 900))
            .unwrap();
    }
    for i in 0..24 {
        battle
            .spawn_unit(UnitKind::Militia, at(500 + (i % 8) * 80, 700 + (i / 8) * 80))
            .unwrap();
    }
    for i in 0..48 {
        battle
            .spawn_unit(UnitKind::Raider, at(200 + (i % 16) * 90, 100 + (i / 16) * 90))
            .unwrap();
    }
    battle
}

/// Runs simulation benchmarks for the siege_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("tick_77_units_x10", |b| {
        b.iter_batched(
            populated_battle,
            |mut battle| {
                for _ in 0..10 {
                    black_box(battle.tick());
                }
                battle
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("spawn_burst_8", |b| {
        b.iter_batched(
            Battle::with_defaults,
            |mut battle| {
                for _ in 0..8 {
                    black_box(battle.spawn_unit(UnitKind::Militia, at(1000, 1000)).unwrap());
                }
                battle
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
