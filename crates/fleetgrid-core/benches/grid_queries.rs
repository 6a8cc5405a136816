//! Grid churn, area/ray queries and full collision passes at several fleet sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fleetgrid_core::prelude::*;
use fleetgrid_logic::SpatialGrid;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIZES: [usize; 3] = [100, 500, 2000];

fn make_engine(ships: usize) -> CombatEngine {
    let mut rng = StdRng::seed_from_u64(ships as u64);
    let mut engine = CombatEngine::default();
    let extent = (ships as f32).sqrt() * 300.0;
    for i in 0..ships {
        let pos = Vec2::new(rng.gen_range(-extent..extent), rng.gen_range(-extent..extent));
        let vel = Vec2::new(rng.gen_range(-300.0..300.0), rng.gen_range(-300.0..300.0));
        let faction = if i % 2 == 0 { Faction::Player } else { Faction::Enemy };
        engine.spawn_ship(
            ShipBlueprint::new(Transform::at(pos).with_velocity(vel))
                .faction(faction)
                .rect(4, 3, BlockType::default()),
        );
    }
    engine
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_churn");
    for &n in &SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut rng = StdRng::seed_from_u64(7);
            let mut grid: SpatialGrid<usize, Faction> = SpatialGrid::new(GridConfig::blocks());
            b.iter(|| {
                for key in 0..n {
                    let pos = Vec2::new(rng.gen_range(-5000.0..5000.0), rng.gen_range(-5000.0..5000.0));
                    grid.insert_or_update(key, Some(pos), Some(Faction::Enemy));
                }
            });
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    for &n in &SIZES {
        let engine = make_engine(n);
        group.bench_with_input(BenchmarkId::new("rect_exclude", n), &n, |b, _| {
            b.iter(|| {
                engine.blocks_in_rect(Vec2::new(-1000.0, -1000.0), Vec2::new(1000.0, 1000.0), Some(Faction::Player))
            });
        });
        group.bench_with_input(BenchmarkId::new("beam_64", n), &n, |b, _| {
            b.iter(|| engine.raycast_blocks(Vec2::new(-4000.0, -50.0), Vec2::new(4000.0, 75.0), 64.0, None));
        });
        group.bench_with_input(BenchmarkId::new("first_hit", n), &n, |b, _| {
            b.iter(|| engine.first_block_hit(Vec2::new(-4000.0, 10.0), Vec2::new(4000.0, 10.0), None, None));
        });
    }
    group.finish();
}

fn bench_collision_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("collision_pass");
    for &n in &SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut engine = make_engine(n);
            let mut damage: Vec<DamageEvent> = Vec::new();
            b.iter(|| {
                damage.clear();
                engine.update(1.0 / 60.0, &mut damage)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_churn, bench_queries, bench_collision_pass);
criterion_main!(benches);
