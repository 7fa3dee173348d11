//! Battle benchmarks for autochess_core.
//!
//! Run with: `cargo bench -p autochess_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use autochess_core::prelude::*;
use autochess_test_utils::fixtures::{mirror_lineup, seeded, skirmish};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

/// Full battles from setup to result.
pub fn battle_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("battle");

    for (name, roster) in [("skirmish_4v4", skirmish()), ("mirror_6v6", mirror_lineup())] {
        group.bench_function(name, |b| {
            b.iter_batched(
                || Battle::new(&roster, seeded(42)).unwrap(),
                |mut battle| black_box(battle.run_to_end().ticks),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Pathfinding across an open board.
pub fn pathfinding_benchmark(c: &mut Criterion) {
    let field = Battlefield::new(16, 16, DistanceMetric::Euclidean).unwrap();
    let goals = [GridPos::new(15, 15)];

    c.bench_function("find_path_16x16", |b| {
        b.iter(|| field.find_path(black_box(GridPos::new(0, 0)), &goals, Fixed::ONE));
    });
}

/// Snapshot encoding.
pub fn snapshot_benchmark(c: &mut Criterion) {
    let mut battle = Battle::new(&mirror_lineup(), seeded(1)).unwrap();
    let snapshot = battle.step().unwrap();

    c.bench_function("snapshot_to_bytes", |b| {
        b.iter(|| black_box(&snapshot).to_bytes().unwrap());
    });
    c.bench_function("snapshot_state_hash", |b| {
        b.iter(|| black_box(&snapshot).state_hash());
    });
}

criterion_group!(
    benches,
    battle_benchmark,
    pathfinding_benchmark,
    snapshot_benchmark
);
criterion_main!(benches);
