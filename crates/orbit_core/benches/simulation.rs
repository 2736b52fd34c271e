//! Simulation benchmarks for orbit_core.
//!
//! Run with: `cargo bench -p orbit_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use orbit_core::prelude::*;

fn warmed_game(difficulty: Difficulty, seed: u64) -> (Engine, ManualClock) {
    let config = GameConfig::default();
    let profile = Profile::ephemeral(&config);
    let game = Game::new(config, difficulty, seed, profile).expect("generated world is valid");
    let mut engine = Engine::new(game);
    let mut clock = ManualClock::default();
    // Get fleets into the air before measuring.
    for _ in 0..600 {
        engine.step(&mut clock);
    }
    (engine, clock)
}

/// Single-tick throughput on generated worlds.
pub fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for difficulty in [Difficulty::Easy, Difficulty::Hard, Difficulty::Extreme] {
        group.bench_with_input(
            BenchmarkId::from_parameter(difficulty),
            &difficulty,
            |b, &difficulty| {
                let (mut engine, mut clock) = warmed_game(difficulty, 42);
                b.iter(|| black_box(engine.step(&mut clock)));
            },
        );
    }
    group.finish();
}

/// Cost of the per-tick desync hash.
pub fn hash_benchmark(c: &mut Criterion) {
    let (engine, _) = warmed_game(Difficulty::Hard, 7);
    c.bench_function("state_hash", |b| b.iter(|| black_box(engine.game().state_hash())));
}

criterion_group!(benches, tick_benchmark, hash_benchmark);
criterion_main!(benches);
