//! Hull component: the blocks a ship is built from.

use std::collections::BTreeMap;

use fleetgrid_logic::damage::RamStats;
use fleetgrid_logic::{Aabb, Vec2};
use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::ship::Transform;

/// Block coordinate in the ship's local grid (units of one block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockCoord {
    pub x: i32,
    pub y: i32,
}

impl BlockCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Per-type block data the collision core reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockType {
    pub mass: f32,
    pub ram: RamStats,
}

impl Default for BlockType {
    fn default() -> Self {
        Self {
            mass: 1.0,
            ram: RamStats::default(),
        }
    }
}

impl BlockType {
    pub fn with_mass(mass: f32) -> Self {
        Self {
            mass,
            ..Self::default()
        }
    }
}

/// One placed block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub kind: BlockType,
    /// Derived from the owning transform; `None` until the ship is synced.
    pub world_position: Option<Vec2>,
}

/// Grid handle for a block: the owning ship plus its local coordinate.
/// Resolving a grid hit back to its ship is just reading `ship`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey {
    pub ship: Entity,
    pub coord: BlockCoord,
}

/// All blocks of a ship, keyed by local coordinate.
///
/// Total mass is cached and invalidated whenever a block is added or removed.
#[derive(Debug, Clone, Default)]
pub struct Hull {
    blocks: BTreeMap<BlockCoord, Block>,
    mass: Option<f32>,
}

impl Hull {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks<I: IntoIterator<Item = (BlockCoord, BlockType)>>(blocks: I) -> Self {
        let mut hull = Self::new();
        for (coord, kind) in blocks {
            hull.insert(coord, kind);
        }
        hull
    }

    /// Place (or replace) a block. Its world position stays unknown until
    /// the next [`Hull::update_world_positions`].
    pub fn insert(&mut self, coord: BlockCoord, kind: BlockType) -> Option<Block> {
        self.mass = None;
        self.blocks.insert(
            coord,
            Block {
                kind,
                world_position: None,
            },
        )
    }

    pub fn remove(&mut self, coord: BlockCoord) -> Option<Block> {
        let removed = self.blocks.remove(&coord);
        if removed.is_some() {
            self.mass = None;
        }
        removed
    }

    pub fn get(&self, coord: BlockCoord) -> Option<&Block> {
        self.blocks.get(&coord)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn coords(&self) -> impl Iterator<Item = BlockCoord> + '_ {
        self.blocks.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockCoord, &Block)> {
        self.blocks.iter().map(|(c, b)| (*c, b))
    }

    /// Sum of block masses, recomputed only after the block set changed.
    pub fn total_mass(&mut self) -> f32 {
        if let Some(m) = self.mass {
            return m;
        }
        let m = self.blocks.values().map(|b| b.kind.mass).sum();
        self.mass = Some(m);
        m
    }

    pub fn cached_mass(&self) -> Option<f32> {
        self.mass
    }

    /// Re-derive every block's world position from the ship transform.
    pub fn update_world_positions(&mut self, transform: &Transform, block_size: f32) {
        for (coord, block) in self.blocks.iter_mut() {
            block.world_position = Some(transform.block_world_position(*coord, block_size));
        }
    }

    /// Box around every positioned block, padded by half a block so it
    /// covers the block footprints.
    pub fn bounds(&self, block_size: f32) -> Option<Aabb> {
        Aabb::from_points(self.blocks.values().filter_map(|b| b.world_position))
            .map(|b| b.expanded(block_size / 2.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: i32) -> Hull {
        Hull::from_blocks((0..n).map(|x| (BlockCoord::new(x, 0), BlockType::with_mass(2.0))))
    }

    #[test]
    fn mass_cache_invalidates_on_change() {
        let mut hull = line(3);
        assert_eq!(hull.cached_mass(), None);
        assert_eq!(hull.total_mass(), 6.0);
        assert_eq!(hull.cached_mass(), Some(6.0));

        hull.insert(BlockCoord::new(5, 0), BlockType::with_mass(4.0));
        assert_eq!(hull.cached_mass(), None);
        assert_eq!(hull.total_mass(), 10.0);

        hull.remove(BlockCoord::new(0, 0));
        assert_eq!(hull.total_mass(), 8.0);

        // removing a missing block keeps the cache
        hull.remove(BlockCoord::new(42, 42));
        assert_eq!(hull.cached_mass(), Some(8.0));
    }

    #[test]
    fn positions_follow_transform() {
        let mut hull = line(2);
        assert!(hull.bounds(32.0).is_none());

        hull.update_world_positions(&Transform::at(Vec2::new(100.0, 0.0)), 32.0);
        let b = hull.get(BlockCoord::new(1, 0)).unwrap();
        assert_eq!(b.world_position, Some(Vec2::new(132.0, 0.0)));

        let bounds = hull.bounds(32.0).unwrap();
        assert_eq!(bounds.min, Vec2::new(84.0, -16.0));
        assert_eq!(bounds.max, Vec2::new(148.0, 16.0));
    }
}
