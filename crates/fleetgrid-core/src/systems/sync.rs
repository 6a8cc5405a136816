//! Keeps block world positions and both spatial grids in step with ship
//! transforms.
//!
//! Anything that moves a ship (or adds/removes its blocks) must go through
//! here before the next query, otherwise the grids answer with stale cells.

use fleetgrid_logic::{GridConfig, SpatialGrid};
use hecs::{Entity, World};

use crate::components::{Allegiance, BlockCoord, BlockKey, Faction, Hull, Transform};

/// Fine grid of individual blocks.
pub type BlockGrid = SpatialGrid<BlockKey, Faction>;
/// Coarse grid of whole ships, keyed by transform origin.
pub type ShipGrid = SpatialGrid<Entity, Faction>;

/// The two spatial grids a combat world maintains.
#[derive(Debug, Clone)]
pub struct ShipIndex {
    pub blocks: BlockGrid,
    pub ships: ShipGrid,
}

impl ShipIndex {
    pub fn new(block_grid: GridConfig, ship_grid: GridConfig) -> Self {
        Self {
            blocks: SpatialGrid::new(block_grid),
            ships: SpatialGrid::new(ship_grid),
        }
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.ships.clear();
    }

    /// Drop one block of `ship` from the block grid.
    pub fn remove_block(&mut self, ship: Entity, coord: BlockCoord) -> bool {
        self.blocks.remove(BlockKey { ship, coord })
    }
}

/// Allegiance of a ship, if it has one.
pub fn allegiance_of(world: &World, entity: Entity) -> Option<Faction> {
    world.get::<&Allegiance>(entity).ok().map(|a| a.0)
}

/// Re-derive every block's world position from the ship's transform and
/// update both grids. Returns `false` if `entity` is not a ship.
pub fn sync_ship(world: &mut World, index: &mut ShipIndex, entity: Entity, block_size: f32) -> bool {
    let faction = allegiance_of(world, entity);
    let Ok((transform, hull)) = world.query_one_mut::<(&Transform, &mut Hull)>(entity) else {
        return false;
    };

    hull.update_world_positions(transform, block_size);
    for (coord, block) in hull.iter() {
        index
            .blocks
            .insert_or_update(BlockKey { ship: entity, coord }, block.world_position, faction);
    }
    index
        .ships
        .insert_or_update(entity, Some(transform.position), faction);
    true
}

/// Sync every ship in the world. Returns how many were synced.
pub fn sync_all_ships(world: &mut World, index: &mut ShipIndex, block_size: f32) -> usize {
    let ships: Vec<Entity> = world
        .query::<(&Transform, &Hull)>()
        .iter()
        .map(|(e, _)| e)
        .collect();
    ships
        .into_iter()
        .filter(|&e| sync_ship(world, index, e, block_size))
        .count()
}

/// Remove a ship and all its blocks from both grids. The entity itself is
/// left alone.
pub fn unindex_ship(world: &World, index: &mut ShipIndex, entity: Entity) -> usize {
    let removed = match world.get::<&Hull>(entity) {
        Ok(hull) => index
            .blocks
            .remove_many(hull.coords().map(|coord| BlockKey { ship: entity, coord })),
        Err(_) => 0,
    };
    index.ships.remove(entity);
    removed
}
