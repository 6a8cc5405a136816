//! Randomized invariant checks for the spatial grid and ray walker.
//!
//! Exercises: insert/update/remove churn → index audit, query completeness,
//! allegiance exclusion, and DDA cell coverage. Seeded so failures reproduce.

use std::collections::{HashMap, HashSet};

use fleetgrid_logic::grid::{CellCoord, SpatialGrid};
use fleetgrid_logic::raycast::walk_cells;
use fleetgrid_logic::{GridConfig, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Faction {
    Player,
    Enemy,
    Neutral,
}

const FACTIONS: [Option<Faction>; 4] = [
    Some(Faction::Player),
    Some(Faction::Enemy),
    Some(Faction::Neutral),
    None,
];

// ── Helpers ────────────────────────────────────────────────────────────

fn random_pos(rng: &mut StdRng, extent: f32) -> Vec2 {
    Vec2::new(rng.gen_range(-extent..extent), rng.gen_range(-extent..extent))
}

/// Run a random churn sequence, returning the grid and the model of what
/// should be tracked.
fn churn(
    seed: u64,
    ops: usize,
) -> (
    SpatialGrid<u32, Faction>,
    HashMap<u32, (Vec2, Option<Faction>)>,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut grid = SpatialGrid::new(GridConfig::with_cell_size(256.0));
    let mut model = HashMap::new();

    for _ in 0..ops {
        let key = rng.gen_range(0..200u32);
        match rng.gen_range(0..10) {
            0..=5 => {
                let pos = random_pos(&mut rng, 3000.0);
                let faction = FACTIONS[rng.gen_range(0..FACTIONS.len())];
                grid.insert_or_update(key, Some(pos), faction);
                model.insert(key, (pos, faction));
            }
            6 => {
                // small move, usually within the same cell
                if let Some((pos, faction)) = model.get(&key).copied() {
                    let moved = pos + Vec2::new(rng.gen_range(-20.0..20.0), 0.0);
                    grid.insert_or_update(key, Some(moved), faction);
                    model.insert(key, (moved, faction));
                }
            }
            7 => {
                // positionless updates never change anything
                grid.insert_or_update(key, None, Some(Faction::Enemy));
            }
            8 => {
                let batch: Vec<u32> = (0..5).map(|_| rng.gen_range(0..200u32)).collect();
                grid.remove_many(batch.iter().copied());
                for k in batch {
                    model.remove(&k);
                }
            }
            _ => {
                let was_tracked = model.remove(&key).is_some();
                assert_eq!(grid.remove(key), was_tracked);
            }
        }
    }
    (grid, model)
}

// ── Index consistency ──────────────────────────────────────────────────

#[test]
fn churn_keeps_indices_consistent() {
    for seed in 0..8 {
        let (grid, model) = churn(seed, 4000);
        let faults = grid.audit();
        assert!(faults.is_empty(), "seed {seed}: {:?}", &faults[..faults.len().min(5)]);
        assert_eq!(grid.len(), model.len(), "seed {seed}");
        for (&key, &(pos, faction)) in &model {
            assert_eq!(grid.position_of(key), Some(pos));
            assert_eq!(grid.allegiance_of(key), faction);
            assert_eq!(grid.tracked_cell(key), Some(grid.cell_of(pos)));
        }
    }
}

// ── Query completeness ─────────────────────────────────────────────────

#[test]
fn rect_query_finds_every_contained_occupant() {
    let (grid, model) = churn(99, 3000);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..200 {
        let a = random_pos(&mut rng, 3500.0);
        let b = random_pos(&mut rng, 3500.0);
        let min = a.min(b);
        let max = a.max(b);
        let hits: HashSet<u32> = grid.query_rect(min, max, None).into_iter().collect();

        let lo = grid.cell_of(min);
        let hi = grid.cell_of(max);
        for (&key, &(pos, _)) in &model {
            let c = grid.cell_of(pos);
            let in_range = c.x >= lo.x && c.x <= hi.x && c.y >= lo.y && c.y <= hi.y;
            assert_eq!(hits.contains(&key), in_range, "key {key} at {pos:?}");
        }
    }
}

#[test]
fn rect_query_has_no_duplicates() {
    let (grid, _) = churn(3, 3000);
    let hits = grid.query_rect(Vec2::new(-4000.0, -4000.0), Vec2::new(4000.0, 4000.0), None);
    let unique: HashSet<u32> = hits.iter().copied().collect();
    assert_eq!(unique.len(), hits.len());
    assert_eq!(hits.len(), grid.len());
}

// ── Allegiance exclusion ───────────────────────────────────────────────

#[test]
fn exclusion_returns_every_other_allegiance() {
    let (grid, model) = churn(11, 3000);
    let min = Vec2::new(-1500.0, -1500.0);
    let max = Vec2::new(1500.0, 1500.0);
    let unfiltered: HashSet<u32> = grid.query_rect(min, max, None).into_iter().collect();

    for excluded in [Faction::Player, Faction::Enemy, Faction::Neutral] {
        let filtered: HashSet<u32> = grid
            .query_rect(min, max, Some(excluded))
            .into_iter()
            .collect();
        let expected: HashSet<u32> = unfiltered
            .iter()
            .copied()
            .filter(|k| matches!(model[k].1, Some(f) if f != excluded))
            .collect();
        assert_eq!(filtered, expected, "excluding {excluded:?}");
    }
}

#[test]
fn enemy_never_leaks_through_shared_cell() {
    let mut grid: SpatialGrid<u32, Faction> = SpatialGrid::new(GridConfig::blocks());
    grid.insert_or_update(1, Some(Vec2::new(10.0, 10.0)), Some(Faction::Enemy));
    grid.insert_or_update(2, Some(Vec2::new(12.0, 10.0)), Some(Faction::Neutral));
    grid.insert_or_update(3, Some(Vec2::new(14.0, 10.0)), Some(Faction::Player));

    let mut hits = grid.query_rect(Vec2::ZERO, Vec2::new(100.0, 100.0), Some(Faction::Enemy));
    hits.sort_unstable();
    assert_eq!(hits, vec![2, 3]);

    let mut near = grid.query_radius(Vec2::new(10.0, 10.0), 50.0, Some(Faction::Enemy));
    near.sort_unstable();
    assert_eq!(near, vec![2, 3]);
}

// ── Ray coverage ───────────────────────────────────────────────────────

#[test]
fn walk_covers_endpoints_and_samples() {
    let mut rng = StdRng::seed_from_u64(2024);
    let cell_size = 100.0;

    for _ in 0..300 {
        let a = random_pos(&mut rng, 5000.0);
        let b = random_pos(&mut rng, 5000.0);
        let cells: HashSet<CellCoord> = walk_cells(a, b, cell_size, 500).into_iter().collect();

        let cell = |p: Vec2| {
            CellCoord::new(
                (p.x / cell_size).floor() as i32,
                (p.y / cell_size).floor() as i32,
            )
        };
        assert!(cells.contains(&cell(a)), "origin cell missing");
        assert!(cells.contains(&cell(b)), "target cell missing");

        for i in 1..20 {
            let t = i as f32 / 20.0 + 0.013;
            let p = a + (b - a) * t.min(1.0);
            assert!(cells.contains(&cell(p)), "sample {p:?} on {a:?} -> {b:?}");
        }
    }
}

#[test]
fn beam_reaches_three_columns_across_boundary() {
    let mut grid: SpatialGrid<u32, Faction> = SpatialGrid::new(GridConfig::blocks());
    // Ray runs along y = 300 (row 1); beam should also cover rows 0 and 2.
    grid.insert_or_update(1, Some(Vec2::new(400.0, 100.0)), Some(Faction::Enemy));
    grid.insert_or_update(2, Some(Vec2::new(400.0, 300.0)), Some(Faction::Enemy));
    grid.insert_or_update(3, Some(Vec2::new(400.0, 600.0)), Some(Faction::Enemy));
    grid.insert_or_update(4, Some(Vec2::new(400.0, 900.0)), Some(Faction::Enemy));

    let origin = Vec2::new(0.0, 300.0);
    let target = Vec2::new(900.0, 300.0);

    let thin = grid.raycast(origin, target, 0.0, None);
    assert_eq!(thin, vec![2]);

    let mut beam = grid.raycast(origin, target, 64.0, None);
    beam.sort_unstable();
    assert_eq!(beam, vec![1, 2, 3]);
}
