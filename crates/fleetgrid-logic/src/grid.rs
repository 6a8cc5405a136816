//! Spatial hash grid with a global index and one mirror index per allegiance.
//!
//! Cells are keyed by `(floor(x / cell_size), floor(y / cell_size))`, so a
//! cell spans `[n * cell_size, (n + 1) * cell_size)` on each axis. The same
//! structure serves both the fine block grid and the coarse ship grid; only
//! the [`GridConfig`] differs.
//!
//! # Index invariant
//!
//! An occupant tracked at cell C appears exactly once in the global index at
//! C and, if it has an allegiance, exactly once in that allegiance's index at
//! C and nowhere else. Every mutation goes through the private `attach` and
//! `detach` helpers, which update all three structures together.
//! [`SpatialGrid::audit`] checks the invariant and is meant for tests.
//!
//! Because each occupant lives in exactly one cell of each index it belongs
//! to, rect queries never yield duplicates and need no de-duplication pass.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::config::GridConfig;
use crate::geometry::{Aabb, Vec2};

/// Integer cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

type CellMap<K> = HashMap<CellCoord, Vec<K>>;

/// What the grid remembers about a tracked occupant.
#[derive(Debug, Clone, Copy)]
struct Tracked<F> {
    cell: CellCoord,
    position: Vec2,
    allegiance: Option<F>,
}

/// Occupancy summary (for debug overlays and the harness).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStats {
    pub occupants: usize,
    pub cells_used: usize,
    pub avg_per_cell: f32,
}

/// One divergence between the tracked state and the cell indices.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexFault<K> {
    pub key: K,
    pub cell: CellCoord,
    pub kind: FaultKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Tracked but absent from the global cell.
    MissingFromGlobal,
    /// Tracked with an allegiance but absent from that allegiance's cell.
    MissingFromAllegiance,
    /// Present in a global cell it is not tracked at.
    StrayInGlobal,
    /// Present in an allegiance cell it is not tracked at, or under the wrong allegiance.
    StrayInAllegiance,
    /// Listed more than once in the same cell.
    Duplicate,
}

/// Spatial hash over occupants of type `K`, partitioned by allegiance `F`.
///
/// The grid holds keys, not occupants: callers own the occupant data and
/// push position changes through [`SpatialGrid::insert_or_update`].
#[derive(Debug, Clone)]
pub struct SpatialGrid<K, F> {
    config: GridConfig,
    cells: CellMap<K>,
    factions: HashMap<F, CellMap<K>>,
    tracked: HashMap<K, Tracked<F>>,
}

impl<K, F> SpatialGrid<K, F>
where
    K: Copy + Eq + Hash + Debug,
    F: Copy + Eq + Hash,
{
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            cells: HashMap::new(),
            factions: HashMap::new(),
            tracked: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn cell_size(&self) -> f32 {
        self.config.cell_size
    }

    /// Cell containing a world position. Non-finite input saturates rather than panics.
    pub fn cell_of(&self, pos: Vec2) -> CellCoord {
        cell_of(pos, self.config.cell_size)
    }

    // --- Mutation ---

    /// Track `key` at `position`, relocating it if its cell or allegiance changed.
    ///
    /// Occupants without a finite position are rejected and left untouched.
    /// Returns whether `key` is tracked after the call.
    pub fn insert_or_update(
        &mut self,
        key: K,
        position: Option<Vec2>,
        allegiance: Option<F>,
    ) -> bool {
        let Some(position) = position.filter(|p| p.is_finite()) else {
            log::debug!("grid: rejecting {:?} without a finite position", key);
            return self.tracked.contains_key(&key);
        };
        let cell = self.cell_of(position);

        if let Some(t) = self.tracked.get_mut(&key) {
            if t.cell == cell && t.allegiance == allegiance {
                t.position = position;
                return true;
            }
        }

        self.detach(key);
        self.attach(
            key,
            Tracked {
                cell,
                position,
                allegiance,
            },
        );
        true
    }

    /// Stop tracking `key`. No-op (returns `false`) if it was not tracked.
    pub fn remove(&mut self, key: K) -> bool {
        self.detach(key).is_some()
    }

    /// Remove a batch of occupants, sweeping each affected cell once.
    /// Returns how many were actually tracked.
    pub fn remove_many<I: IntoIterator<Item = K>>(&mut self, keys: I) -> usize {
        let mut global: HashMap<CellCoord, HashSet<K>> = HashMap::new();
        let mut by_faction: HashMap<(F, CellCoord), HashSet<K>> = HashMap::new();

        for key in keys {
            let Some(t) = self.tracked.remove(&key) else {
                continue;
            };
            global.entry(t.cell).or_default().insert(key);
            if let Some(f) = t.allegiance {
                by_faction.entry((f, t.cell)).or_default().insert(key);
            }
        }

        let removed = global.values().map(HashSet::len).sum();

        for (cell, doomed) in &global {
            if let Some(list) = self.cells.get_mut(cell) {
                list.retain(|k| !doomed.contains(k));
            }
        }
        for ((faction, cell), doomed) in &by_faction {
            if let Some(list) = self
                .factions
                .get_mut(faction)
                .and_then(|map| map.get_mut(cell))
            {
                list.retain(|k| !doomed.contains(k));
            }
        }

        removed
    }

    /// Drop every index and all tracked state.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.factions.clear();
        self.tracked.clear();
    }

    fn attach(&mut self, key: K, t: Tracked<F>) {
        self.cells.entry(t.cell).or_default().push(key);
        if let Some(f) = t.allegiance {
            self.factions
                .entry(f)
                .or_default()
                .entry(t.cell)
                .or_default()
                .push(key);
        }
        self.tracked.insert(key, t);
    }

    fn detach(&mut self, key: K) -> Option<Tracked<F>> {
        let t = self.tracked.remove(&key)?;
        if let Some(list) = self.cells.get_mut(&t.cell) {
            remove_key(list, key);
        }
        if let Some(f) = t.allegiance {
            if let Some(list) = self.factions.get_mut(&f).and_then(|m| m.get_mut(&t.cell)) {
                remove_key(list, key);
            }
        }
        Some(t)
    }

    // --- Tracked state ---

    pub fn contains(&self, key: K) -> bool {
        self.tracked.contains_key(&key)
    }

    /// Position recorded at the last successful insert/update.
    pub fn position_of(&self, key: K) -> Option<Vec2> {
        self.tracked.get(&key).map(|t| t.position)
    }

    pub fn allegiance_of(&self, key: K) -> Option<F> {
        self.tracked.get(&key).and_then(|t| t.allegiance)
    }

    pub fn tracked_cell(&self, key: K) -> Option<CellCoord> {
        self.tracked.get(&key).map(|t| t.cell)
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    // --- Queries ---

    /// Every occupant in the inclusive cell range covering the rectangle.
    ///
    /// With `exclude`, the result is the union of every *other* allegiance's
    /// index, so occupants without an allegiance are never returned.
    pub fn query_rect(&self, min: Vec2, max: Vec2, exclude: Option<F>) -> Vec<K> {
        let mut out = Vec::new();
        if !(min.is_finite() && max.is_finite()) {
            return out;
        }
        let range = CellRange::new(self.cell_of(min.min(max)), self.cell_of(min.max(max)));
        for map in self.sources(exclude) {
            collect_range(map, &range, &mut out);
        }
        out
    }

    pub fn query_aabb(&self, aabb: &Aabb, exclude: Option<F>) -> Vec<K> {
        self.query_rect(aabb.min, aabb.max, exclude)
    }

    /// Occupants whose tracked position lies within `radius` of `center`.
    pub fn query_radius(&self, center: Vec2, radius: f32, exclude: Option<F>) -> Vec<K> {
        if !center.is_finite() {
            return Vec::new();
        }
        let r = radius.max(0.0);
        let reach = Vec2::new(r, r);
        let r2 = r * r;
        let (min, max) = (center - reach, center + reach);
        // an unbounded square covers the whole index
        let mut hits = if min.is_finite() && max.is_finite() {
            self.query_rect(min, max, exclude)
        } else {
            self.all(exclude)
        };
        hits.retain(|k| {
            self.tracked
                .get(k)
                .is_some_and(|t| t.position.distance_squared(center) <= r2)
        });
        hits
    }

    /// Global contents of the cell containing `pos`.
    pub fn query_cell(&self, pos: Vec2) -> &[K] {
        self.query_cell_coords(self.cell_of(pos))
    }

    pub fn query_cell_coords(&self, cell: CellCoord) -> &[K] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The 3x3 block of cells centred on the cell containing `pos`.
    pub fn relevant_cells(&self, pos: Vec2) -> [CellCoord; 9] {
        let c = self.cell_of(pos);
        let mut cells = [c; 9];
        let mut i = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                cells[i] = c.offset(dx, dy);
                i += 1;
            }
        }
        cells
    }

    /// Every occupant, honouring the same exclusion rule as [`Self::query_rect`].
    pub fn all(&self, exclude: Option<F>) -> Vec<K> {
        let mut out = Vec::new();
        for map in self.sources(exclude) {
            for list in map.values() {
                out.extend_from_slice(list);
            }
        }
        out
    }

    pub fn count(&self, exclude: Option<F>) -> usize {
        self.sources(exclude)
            .into_iter()
            .flat_map(|map| map.values())
            .map(Vec::len)
            .sum()
    }

    pub fn stats(&self) -> GridStats {
        let mut occupants = 0;
        let mut cells_used = 0;
        for list in self.cells.values().filter(|l| !l.is_empty()) {
            occupants += list.len();
            cells_used += 1;
        }
        GridStats {
            occupants,
            cells_used,
            avg_per_cell: if cells_used > 0 {
                occupants as f32 / cells_used as f32
            } else {
                0.0
            },
        }
    }

    /// Indices to read for a query: the global one, or every other allegiance's.
    pub(crate) fn sources(&self, exclude: Option<F>) -> Vec<&CellMap<K>> {
        match exclude {
            None => vec![&self.cells],
            Some(ex) => self
                .factions
                .iter()
                .filter(|(f, _)| **f != ex)
                .map(|(_, map)| map)
                .collect(),
        }
    }

    pub(crate) fn tracked_position(&self, key: &K) -> Option<Vec2> {
        self.tracked.get(key).map(|t| t.position)
    }

    // --- Consistency ---

    /// Compare tracked state against both index structures.
    pub fn audit(&self) -> Vec<IndexFault<K>> {
        let mut faults = Vec::new();

        for (&key, t) in &self.tracked {
            match count_in(&self.cells, t.cell, key) {
                0 => faults.push(fault(key, t.cell, FaultKind::MissingFromGlobal)),
                1 => {}
                _ => faults.push(fault(key, t.cell, FaultKind::Duplicate)),
            }
            if let Some(f) = t.allegiance {
                let n = self
                    .factions
                    .get(&f)
                    .map_or(0, |map| count_in(map, t.cell, key));
                match n {
                    0 => faults.push(fault(key, t.cell, FaultKind::MissingFromAllegiance)),
                    1 => {}
                    _ => faults.push(fault(key, t.cell, FaultKind::Duplicate)),
                }
            }
        }

        for (&cell, list) in &self.cells {
            for &key in list {
                if self.tracked.get(&key).map(|t| t.cell) != Some(cell) {
                    faults.push(fault(key, cell, FaultKind::StrayInGlobal));
                }
            }
        }

        for (&faction, map) in &self.factions {
            for (&cell, list) in map {
                for &key in list {
                    let ok = self
                        .tracked
                        .get(&key)
                        .is_some_and(|t| t.cell == cell && t.allegiance == Some(faction));
                    if !ok {
                        faults.push(fault(key, cell, FaultKind::StrayInAllegiance));
                    }
                }
            }
        }

        faults
    }
}

/// Free-standing cell computation shared with the ray walker.
pub(crate) fn cell_of(pos: Vec2, cell_size: f32) -> CellCoord {
    CellCoord::new(
        (pos.x / cell_size).floor() as i32,
        (pos.y / cell_size).floor() as i32,
    )
}

fn remove_key<K: PartialEq>(list: &mut Vec<K>, key: K) {
    if let Some(idx) = list.iter().position(|k| *k == key) {
        list.swap_remove(idx);
    }
}

fn count_in<K: PartialEq>(map: &CellMap<K>, cell: CellCoord, key: K) -> usize {
    map.get(&cell)
        .map_or(0, |list| list.iter().filter(|k| **k == key).count())
}

fn fault<K>(key: K, cell: CellCoord, kind: FaultKind) -> IndexFault<K> {
    IndexFault { key, cell, kind }
}

/// Inclusive rectangle of cells.
struct CellRange {
    min: CellCoord,
    max: CellCoord,
}

impl CellRange {
    fn new(min: CellCoord, max: CellCoord) -> Self {
        Self { min, max }
    }

    fn contains(&self, c: CellCoord) -> bool {
        c.x >= self.min.x && c.x <= self.max.x && c.y >= self.min.y && c.y <= self.max.y
    }

    fn area(&self) -> u64 {
        let w = (self.max.x as i64 - self.min.x as i64 + 1) as u64;
        let h = (self.max.y as i64 - self.min.y as i64 + 1) as u64;
        w.saturating_mul(h)
    }
}

/// Append every key in `range`. Huge ranges scan the occupied cells instead
/// of probing each coordinate, so cost stays bounded by the map size.
fn collect_range<K: Copy>(map: &CellMap<K>, range: &CellRange, out: &mut Vec<K>) {
    if range.area() > map.len() as u64 {
        for (cell, list) in map {
            if range.contains(*cell) {
                out.extend_from_slice(list);
            }
        }
        return;
    }
    for x in range.min.x..=range.max.x {
        for y in range.min.y..=range.max.y {
            if let Some(list) = map.get(&CellCoord::new(x, y)) {
                out.extend_from_slice(list);
            }
        }
    }
}
