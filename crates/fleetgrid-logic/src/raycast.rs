//! DDA grid traversal and ray queries over a [`SpatialGrid`].
//!
//! Algorithm: classic Amanatides-Woo walk.
//! 1. Step direction per axis (+1 / -1)
//! 2. `t_delta`: ray parameter needed to cross one full cell on that axis
//! 3. `t_max`: ray parameter to the first cell boundary from the origin
//! 4. Advance along whichever axis has the smaller `t_max` until the target
//!    cell is reached or `max_ray_steps` cells have been emitted
//!
//! Beams walk several parallel columns, offset along the ray normal, and
//! union the results. That approximates a swept capsule; it is not exact.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use crate::geometry::{ray_aabb_entry, Aabb, Vec2};
use crate::grid::{cell_of, CellCoord, SpatialGrid};

/// Closest occupant hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit<K> {
    pub key: K,
    pub point: Vec2,
    /// Distance from the ray origin to `point`.
    pub distance: f32,
}

/// Cells crossed by the segment `origin -> target`, in walk order.
///
/// Always starts with the origin cell. Stops at the target cell or after
/// `max_steps` cells, whichever comes first.
pub fn walk_cells(origin: Vec2, target: Vec2, cell_size: f32, max_steps: u32) -> Vec<CellCoord> {
    let mut cells = Vec::new();
    if !(origin.is_finite() && target.is_finite()) || cell_size <= 0.0 {
        return cells;
    }

    let d = target - origin;
    let mut cell = cell_of(origin, cell_size);
    let end = cell_of(target, cell_size);

    let step_x = if d.x > 0.0 { 1 } else { -1 };
    let step_y = if d.y > 0.0 { 1 } else { -1 };

    let t_delta_x = t_delta(d.x, cell_size);
    let t_delta_y = t_delta(d.y, cell_size);
    let mut t_max_x = t_first(origin.x, d.x, cell.x, cell_size);
    let mut t_max_y = t_first(origin.y, d.y, cell.y, cell_size);

    for _ in 0..max_steps {
        cells.push(cell);
        if cell == end {
            return cells;
        }
        // An axis that already sits on the target column never steps again,
        // so float drift in t_max cannot walk past the target cell.
        let step_along_x = if cell.x == end.x {
            false
        } else if cell.y == end.y {
            true
        } else {
            t_max_x < t_max_y
        };
        if step_along_x {
            t_max_x += t_delta_x;
            cell.x = cell.x.saturating_add(step_x);
        } else {
            t_max_y += t_delta_y;
            cell.y = cell.y.saturating_add(step_y);
        }
    }

    log::debug!(
        "raycast: walk from {:?} to {:?} truncated at {} cells",
        origin,
        target,
        max_steps
    );
    cells
}

fn t_delta(d: f32, cell_size: f32) -> f32 {
    if d == 0.0 {
        f32::INFINITY
    } else {
        (cell_size / d).abs()
    }
}

fn t_first(origin: f32, d: f32, cell: i32, cell_size: f32) -> f32 {
    if d == 0.0 {
        return f32::INFINITY;
    }
    let boundary = if d > 0.0 {
        (cell as f32 + 1.0) * cell_size - origin
    } else {
        origin - cell as f32 * cell_size
    };
    (boundary / d).abs()
}

/// Cell offsets of the parallel columns a beam covers.
///
/// Offsets are `round(normal * i)` for `i` in `[-r, r]` with
/// `r = ceil((thickness / 2) / cell_size)`, de-duplicated. `r` is clamped so
/// at most `max_columns` columns come back; an infinite thickness gets the
/// widest allowed beam. A thin beam (or a zero-length ray, which has no
/// normal) walks a single column.
pub fn beam_offsets(
    origin: Vec2,
    target: Vec2,
    thickness: f32,
    cell_size: f32,
    max_columns: u32,
) -> Vec<(i32, i32)> {
    let d = target - origin;
    let len = d.length();
    if !(thickness > 0.0) || !(len > 0.0) || !(cell_size > 0.0) || !len.is_finite() {
        return vec![(0, 0)];
    }

    let normal = (d / len).perp();
    let max_radius = (max_columns.saturating_sub(1) / 2) as f32;
    // an infinite ratio clamps to max_radius
    let cell_radius = ((thickness / 2.0) / cell_size).ceil().min(max_radius) as i32;

    let mut seen = HashSet::new();
    let mut offsets = Vec::new();
    for i in -cell_radius..=cell_radius {
        let o = (
            (normal.x * i as f32).round() as i32,
            (normal.y * i as f32).round() as i32,
        );
        if seen.insert(o) {
            offsets.push(o);
        }
    }
    offsets
}

impl<K, F> SpatialGrid<K, F>
where
    K: Copy + Eq + Hash + Debug,
    F: Copy + Eq + Hash,
{
    /// Every occupant in every cell the (optionally thickened) segment passes
    /// through. Order is unspecified; each occupant appears once.
    pub fn raycast(
        &self,
        origin: Vec2,
        target: Vec2,
        beam_thickness: f32,
        exclude: Option<F>,
    ) -> Vec<K> {
        let cell_size = self.cell_size();
        let walk = walk_cells(origin, target, cell_size, self.config().max_ray_steps);
        let offsets = beam_offsets(
            origin,
            target,
            beam_thickness,
            cell_size,
            self.config().max_beam_columns,
        );
        let sources = self.sources(exclude);

        let mut visited = HashSet::new();
        let mut hits = Vec::new();
        for cell in walk {
            for &(ox, oy) in &offsets {
                let c = cell.offset(ox, oy);
                if !visited.insert(c) {
                    continue;
                }
                for map in &sources {
                    if let Some(list) = map.get(&c) {
                        hits.extend_from_slice(list);
                    }
                }
            }
        }
        hits
    }

    /// Closest occupant whose box (half a cell on each side of its position)
    /// the segment enters. `accept` lets the caller skip candidates such as
    /// the firing ship's own blocks.
    pub fn first_hit_along_ray<P>(
        &self,
        origin: Vec2,
        target: Vec2,
        exclude: Option<F>,
        accept: P,
    ) -> Option<RayHit<K>>
    where
        P: Fn(&K) -> bool,
    {
        let d = target - origin;
        let len = d.length();
        if !(len > 0.0) || !len.is_finite() {
            return None;
        }
        let dir = d / len;
        let half = self.cell_size() / 2.0;

        let mut best: Option<RayHit<K>> = None;
        for key in self.raycast(origin, target, 0.0, exclude) {
            if !accept(&key) {
                continue;
            }
            let Some(pos) = self.tracked_position(&key) else {
                continue;
            };
            let Some(t) = ray_aabb_entry(origin, dir, &Aabb::from_center(pos, half)) else {
                continue;
            };
            if t > len {
                continue;
            }
            if best.map_or(true, |b| t < b.distance) {
                best = Some(RayHit {
                    key,
                    point: origin + dir * t,
                    distance: t,
                });
            }
        }
        best
    }
}
