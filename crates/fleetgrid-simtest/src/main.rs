//! FleetGrid Headless Harness
//!
//! Drives the grid, ray walker and collision pass end to end with no
//! rendering or host game attached, and checks the properties they promise.
//!
//! Usage:
//!   cargo run -p fleetgrid-simtest
//!   cargo run -p fleetgrid-simtest -- --verbose --seed 42
//!   RUST_LOG=trace cargo run -p fleetgrid-simtest

use std::collections::{HashMap, HashSet};

use fleetgrid_core::prelude::*;
use fleetgrid_logic::grid::{CellCoord, SpatialGrid};
use fleetgrid_logic::raycast::walk_cells;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Engine configuration (same JSON a host would ship) ──────────────────
const CONFIG_JSON: &str = include_str!("../../../data/engine_config.json");

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let seed = args
        .iter()
        .position(|a| a == "--seed")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x5EED);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if verbose { "info" } else { "warn" }),
    )
    .init();

    println!("=== FleetGrid Harness (seed {}) ===\n", seed);

    let config = match EngineConfig::from_json_str(CONFIG_JSON) {
        Ok(c) => c,
        Err(e) => {
            println!("  ✗ config_load: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Configuration
    results.extend(validate_config(&config));

    // 2. Grid index churn
    results.extend(validate_grid_churn(seed, verbose));

    // 3. Ray traversal coverage
    results.extend(validate_ray_coverage(seed));

    // 4. Collision scenarios
    results.extend(validate_collision_scenarios(&config));

    // 5. Many-ship stress run
    results.extend(validate_stress(&config, seed, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();
    log::info!("harness finished: {} checks, {} failed", total, failed);

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_config(config: &EngineConfig) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    results.push(TestResult::new(
        "config_matches_defaults",
        *config == EngineConfig::default(),
        format!(
            "block cell {}, ship cell {}, restitution {}",
            config.block_grid.cell_size, config.ship_grid.cell_size, config.collision.restitution
        ),
    ));

    let bad = r#"{ "collision": { "restitution": 2.0, "max_overlap_pairs": 0 } }"#;
    let rejected = match EngineConfig::from_json_str(bad) {
        Err(ConfigLoadError::Invalid(errors)) => errors.len(),
        _ => 0,
    };
    results.push(TestResult::new(
        "config_rejects_invalid",
        rejected == 2,
        format!("{} errors reported", rejected),
    ));

    results
}

// ── 2. Grid churn ───────────────────────────────────────────────────────

const FACTIONS: [Option<Faction>; 5] = [
    Some(Faction::Player),
    Some(Faction::Ally),
    Some(Faction::Enemy),
    Some(Faction::Neutral),
    None,
];

fn validate_grid_churn(seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Grid Churn ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut grid: SpatialGrid<u32, Faction> = SpatialGrid::new(GridConfig::blocks());
    let mut model: HashMap<u32, (Vec2, Option<Faction>)> = HashMap::new();

    for _ in 0..20_000 {
        let key = rng.gen_range(0..1000u32);
        if rng.gen_bool(0.7) {
            let pos = Vec2::new(rng.gen_range(-8000.0..8000.0), rng.gen_range(-8000.0..8000.0));
            let faction = FACTIONS[rng.gen_range(0..FACTIONS.len())];
            grid.insert_or_update(key, Some(pos), faction);
            model.insert(key, (pos, faction));
        } else {
            grid.remove(key);
            model.remove(&key);
        }
    }

    let faults = grid.audit();
    results.push(TestResult::new(
        "grid_index_consistent",
        faults.is_empty() && grid.len() == model.len(),
        format!("{} tracked, {} faults", grid.len(), faults.len()),
    ));

    let stats = grid.stats();
    if verbose {
        println!(
            "  grid: {} occupants in {} cells ({:.2}/cell)",
            stats.occupants, stats.cells_used, stats.avg_per_cell
        );
    }

    // Exclusion: every other allegiance, never the excluded one or the unaligned
    let min = Vec2::new(-4000.0, -4000.0);
    let max = Vec2::new(4000.0, 4000.0);
    let all: HashSet<u32> = grid.query_rect(min, max, None).into_iter().collect();
    let mut leaks = 0;
    let mut missing = 0;
    for excluded in [Faction::Player, Faction::Ally, Faction::Enemy, Faction::Neutral] {
        let filtered: HashSet<u32> = grid.query_rect(min, max, Some(excluded)).into_iter().collect();
        for k in &all {
            let expected = matches!(model[k].1, Some(f) if f != excluded);
            match (expected, filtered.contains(k)) {
                (false, true) => leaks += 1,
                (true, false) => missing += 1,
                _ => {}
            }
        }
    }
    results.push(TestResult::new(
        "grid_exclusion_exact",
        leaks == 0 && missing == 0,
        format!("{} leaked, {} missing over {} candidates", leaks, missing, all.len()),
    ));

    // Completeness: everyone whose cell is in range
    let lo = grid.cell_of(min);
    let hi = grid.cell_of(max);
    let expected = model
        .values()
        .filter(|(p, _)| {
            let c = grid.cell_of(*p);
            c.x >= lo.x && c.x <= hi.x && c.y >= lo.y && c.y <= hi.y
        })
        .count();
    results.push(TestResult::new(
        "grid_query_complete",
        expected == all.len(),
        format!("{} expected, {} returned", expected, all.len()),
    ));

    results
}

// ── 3. Ray coverage ─────────────────────────────────────────────────────

fn validate_ray_coverage(seed: u64) -> Vec<TestResult> {
    println!("--- Ray Traversal ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed ^ 0xA11CE);
    let cell_size = 256.0;
    let cell = |p: Vec2| CellCoord::new((p.x / cell_size).floor() as i32, (p.y / cell_size).floor() as i32);

    let mut misses = 0;
    let rays = 500;
    for _ in 0..rays {
        let a = Vec2::new(rng.gen_range(-20000.0..20000.0), rng.gen_range(-20000.0..20000.0));
        let b = a + Vec2::new(rng.gen_range(-9000.0..9000.0), rng.gen_range(-9000.0..9000.0));
        let cells: HashSet<CellCoord> = walk_cells(a, b, cell_size, 500).into_iter().collect();
        for i in 0..=32 {
            let p = a + (b - a) * (i as f32 / 32.0);
            if !cells.contains(&cell(p)) {
                misses += 1;
            }
        }
    }
    results.push(TestResult::new(
        "ray_covers_segment",
        misses == 0,
        format!("{} sample misses over {} rays", misses, rays),
    ));

    // Beam of 64 over 256 cells, running just under a row boundary
    let mut grid: SpatialGrid<u32, Faction> = SpatialGrid::new(GridConfig::blocks());
    for (key, y) in [(1, 100.0), (2, 300.0), (3, 600.0)] {
        grid.insert_or_update(key, Some(Vec2::new(700.0, y)), Some(Faction::Enemy));
    }
    let beam = grid.raycast(Vec2::new(0.0, 300.0), Vec2::new(1500.0, 300.0), 64.0, None);
    let columns: HashSet<i32> = beam
        .iter()
        .filter_map(|k| grid.position_of(*k))
        .map(|p| grid.cell_of(p).y)
        .collect();
    results.push(TestResult::new(
        "beam_spans_three_columns",
        columns.len() >= 3,
        format!("{} occupants from {} columns", beam.len(), columns.len()),
    ));

    let capped = walk_cells(Vec2::ZERO, Vec2::new(1.0e9, 1.0), 1.0, 500).len();
    results.push(TestResult::new(
        "ray_step_cap",
        capped == 500,
        format!("{} cells emitted", capped),
    ));

    results
}

// ── 4. Collision scenarios ──────────────────────────────────────────────

fn single_block(engine: &mut CombatEngine, x: f32, vx: f32) -> hecs::Entity {
    engine.spawn_ship(
        ShipBlueprint::new(Transform::at(Vec2::new(x, 0.0)).with_velocity(Vec2::new(vx, 0.0)))
            .block(BlockCoord::new(0, 0), BlockType::default()),
    )
}

fn validate_collision_scenarios(config: &EngineConfig) -> Vec<TestResult> {
    println!("--- Collision Scenarios ---");
    let mut results = Vec::new();

    // Equal masses, half a footprint of overlap, closing at 500
    {
        let mut engine = CombatEngine::new(config.clone());
        let a = single_block(&mut engine, 0.0, 250.0);
        let b = single_block(&mut engine, 16.0, -250.0);
        let mut damage: Vec<DamageEvent> = Vec::new();
        engine.run_collision_pass(&mut damage);

        let (ta, tb) = (engine.transform(a), engine.transform(b));
        let passed = match (ta, tb) {
            (Some(ta), Some(tb)) => {
                let da = ta.position.x;
                let db = tb.position.x - 16.0;
                let closing_after = ta.velocity.x - tb.velocity.x;
                (da + db).abs() < 1e-3
                    && da < 0.0
                    && closing_after < 500.0
                    && damage.iter().any(|d| d.target == a)
                    && damage.iter().any(|d| d.target == b)
            }
            _ => false,
        };
        results.push(TestResult::new(
            "equal_mass_head_on",
            passed,
            format!("{:?} / {:?}, {} damage events", ta, tb, damage.len()),
        ));
    }

    // Immovable station: only the ship moves
    {
        let mut engine = CombatEngine::new(config.clone());
        let ship = single_block(&mut engine, 0.0, 250.0);
        let station = engine.spawn_ship(
            ShipBlueprint::new(Transform::at(Vec2::new(16.0, 0.0)))
                .faction(Faction::Neutral)
                .rect(1, 1, BlockType::default())
                .immovable(),
        );
        let before = engine.transform(station);
        let mut damage: Vec<DamageEvent> = Vec::new();
        engine.run_collision_pass(&mut damage);
        let moved = engine.transform(ship).map(|t| t.position.x < 0.0).unwrap_or(false);
        results.push(TestResult::new(
            "immovable_station",
            moved && engine.transform(station) == before,
            format!("ship {:?}", engine.transform(ship)),
        ));
    }

    // Slow contact: physics but no damage
    {
        let mut engine = CombatEngine::new(config.clone());
        let a = single_block(&mut engine, 0.0, 25.0);
        single_block(&mut engine, 16.0, -25.0);
        let mut damage: Vec<DamageEvent> = Vec::new();
        let stats = engine.run_collision_pass(&mut damage);
        let pushed = engine.transform(a).map(|t| t.position.x < 0.0).unwrap_or(false);
        results.push(TestResult::new(
            "slow_contact_no_damage",
            damage.is_empty() && pushed && stats.penetrations >= 1,
            format!("{:?}", stats),
        ));
    }

    // Exclusion with shared cells
    {
        let mut engine = CombatEngine::new(config.clone());
        let mut spawn = |x: f32, faction: Faction| {
            engine.spawn_ship(
                ShipBlueprint::new(Transform::at(Vec2::new(x, 40.0)))
                    .faction(faction)
                    .rect(1, 1, BlockType::default()),
            )
        };
        let enemy = spawn(10.0, Faction::Enemy);
        spawn(80.0, Faction::Neutral);
        spawn(150.0, Faction::Player);
        let hits = engine.blocks_in_rect(Vec2::ZERO, Vec2::new(200.0, 200.0), Some(Faction::Enemy));
        results.push(TestResult::new(
            "exclusion_shared_cell",
            hits.len() == 2 && hits.iter().all(|k| k.ship != enemy),
            format!("{} non-enemy blocks", hits.len()),
        ));
    }

    results
}

// ── 5. Stress ───────────────────────────────────────────────────────────

fn validate_stress(config: &EngineConfig, seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Stress ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed ^ 0xF1EE7);
    let mut engine = CombatEngine::new(config.clone());

    let factions = [Faction::Player, Faction::Ally, Faction::Enemy, Faction::Neutral];
    for i in 0..150 {
        let pos = Vec2::new(rng.gen_range(-3000.0..3000.0), rng.gen_range(-3000.0..3000.0));
        let vel = Vec2::new(rng.gen_range(-400.0..400.0), rng.gen_range(-400.0..400.0));
        let mut blueprint = ShipBlueprint::new(
            Transform::at(pos)
                .with_velocity(vel)
                .with_rotation(rng.gen_range(0.0..std::f32::consts::TAU)),
        )
        .faction(factions[i % factions.len()])
        .rect(rng.gen_range(2..6), rng.gen_range(2..6), BlockType::default());
        if i % 25 == 0 {
            blueprint = blueprint.immovable();
        }
        engine.spawn_ship(blueprint);
    }

    let mut totals = CollisionStats::default();
    let mut damage: Vec<DamageEvent> = Vec::new();
    for _ in 0..240 {
        totals += engine.update(1.0 / 60.0, &mut damage);
    }
    if verbose {
        println!("  stress: {:?}", totals);
    }

    results.push(TestResult::new(
        "stress_indices_consistent",
        engine.audit() == 0,
        format!("{} block occupants", engine.block_grid().len()),
    ));

    let mut stale = 0;
    let mut non_finite = 0;
    for (entity, transform) in engine.world.query::<&Transform>().iter() {
        if !(transform.position.is_finite() && transform.velocity.is_finite()) {
            non_finite += 1;
        }
        if engine.ship_grid().position_of(entity) != Some(transform.position) {
            stale += 1;
        }
    }
    results.push(TestResult::new(
        "stress_transforms_synced",
        stale == 0 && non_finite == 0,
        format!("{} stale, {} non-finite", stale, non_finite),
    ));

    let bad_damage = damage
        .iter()
        .filter(|d| !(d.amount > 0.0) || d.cause.as_str() != "collision")
        .count();
    results.push(TestResult::new(
        "stress_damage_well_formed",
        bad_damage == 0,
        format!("{} events, {} contacts", damage.len(), totals.contacts),
    ));

    results
}
