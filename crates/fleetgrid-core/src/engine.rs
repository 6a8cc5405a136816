//! Combat engine - owns the ECS world and both spatial grids

use fleetgrid_logic::{RayHit, Vec2};
use hecs::{Entity, EntityBuilder, World};

use crate::components::*;
use crate::config::EngineConfig;
use crate::damage::DamageSink;
use crate::systems::*;

/// Everything needed to spawn one ship.
#[derive(Debug, Clone, Default)]
pub struct ShipBlueprint {
    pub transform: Transform,
    pub faction: Option<Faction>,
    pub blocks: Vec<(BlockCoord, BlockType)>,
    pub immovable: bool,
    pub affixes: RamAffixes,
}

impl ShipBlueprint {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            ..Self::default()
        }
    }

    pub fn faction(mut self, faction: Faction) -> Self {
        self.faction = Some(faction);
        self
    }

    pub fn block(mut self, coord: BlockCoord, kind: BlockType) -> Self {
        self.blocks.push((coord, kind));
        self
    }

    pub fn blocks<I: IntoIterator<Item = (BlockCoord, BlockType)>>(mut self, blocks: I) -> Self {
        self.blocks.extend(blocks);
        self
    }

    /// Solid rectangle of `width x height` blocks starting at local (0, 0).
    pub fn rect(self, width: i32, height: i32, kind: BlockType) -> Self {
        let cells = (0..width).flat_map(move |x| (0..height).map(move |y| (BlockCoord::new(x, y), kind)));
        self.blocks(cells)
    }

    pub fn immovable(mut self) -> Self {
        self.immovable = true;
        self
    }

    pub fn affixes(mut self, affixes: RamAffixes) -> Self {
        self.affixes = affixes;
        self
    }
}

/// Spatial queries and collision resolution for one combat world.
///
/// All mutation of ship transforms and hulls should go through the engine
/// (or be followed by [`CombatEngine::sync_ship`]) so the grids stay current.
pub struct CombatEngine {
    /// ECS world containing all ships
    pub world: World,
    config: EngineConfig,
    index: ShipIndex,
    cache: PassCache,
}

impl CombatEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            world: World::new(),
            index: ShipIndex::new(config.block_grid, config.ship_grid),
            cache: PassCache::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn block_grid(&self) -> &BlockGrid {
        &self.index.blocks
    }

    pub fn ship_grid(&self) -> &ShipGrid {
        &self.index.ships
    }

    pub fn collisions_enabled(&self) -> bool {
        self.config.collisions_enabled
    }

    pub fn set_collisions_enabled(&mut self, enabled: bool) {
        self.config.collisions_enabled = enabled;
    }

    fn block_size(&self) -> f32 {
        self.config.collision.block_size
    }

    // --- Ship lifecycle ---

    /// Spawn a ship and index it in both grids.
    pub fn spawn_ship(&mut self, blueprint: ShipBlueprint) -> Entity {
        let block_count = blueprint.blocks.len();
        let mut builder = EntityBuilder::new();
        builder
            .add(blueprint.transform)
            .add(Hull::from_blocks(blueprint.blocks))
            .add(blueprint.affixes)
            .add(CollisionState::default());
        if let Some(faction) = blueprint.faction {
            builder.add(Allegiance(faction));
        }
        if blueprint.immovable {
            builder.add(Immovable);
        }

        let entity = self.world.spawn(builder.build());
        self.sync_ship(entity);
        log::info!(
            "spawned ship {:?} ({:?}, {} blocks) at {:?}",
            entity,
            blueprint.faction,
            block_count,
            blueprint.transform.position
        );
        entity
    }

    /// Remove a ship from the world and both grids.
    pub fn despawn_ship(&mut self, entity: Entity) -> bool {
        if !self.is_ship(entity) {
            log::warn!("despawn_ship: {:?} is not a ship", entity);
            return false;
        }
        let blocks = unindex_ship(&self.world, &mut self.index, entity);
        self.cache.invalidate(entity);
        if self.world.despawn(entity).is_err() {
            return false;
        }
        log::info!("despawned ship {:?} ({} blocks)", entity, blocks);
        true
    }

    pub fn is_ship(&self, entity: Entity) -> bool {
        self.world.satisfies::<(&Transform, &Hull)>(entity).unwrap_or(false)
    }

    pub fn ship_count(&self) -> usize {
        self.world.query::<(&Transform, &Hull)>().iter().count()
    }

    /// Attach (or replace) a block. Invalidates the ship's mass cache.
    pub fn add_block(&mut self, ship: Entity, coord: BlockCoord, kind: BlockType) -> bool {
        match self.world.get::<&mut Hull>(ship) {
            Ok(mut hull) => {
                hull.insert(coord, kind);
            }
            Err(_) => return false,
        }
        self.cache.invalidate(ship);
        self.sync_ship(ship)
    }

    /// Detach a block, e.g. after it was destroyed.
    pub fn remove_block(&mut self, ship: Entity, coord: BlockCoord) -> bool {
        let removed = match self.world.get::<&mut Hull>(ship) {
            Ok(mut hull) => hull.remove(coord).is_some(),
            Err(_) => false,
        };
        if removed {
            self.index.remove_block(ship, coord);
            self.cache.invalidate(ship);
        }
        removed
    }

    pub fn transform(&self, ship: Entity) -> Option<Transform> {
        self.world.get::<&Transform>(ship).ok().map(|t| *t)
    }

    /// Replace a ship's transform and re-index it.
    pub fn set_transform(&mut self, ship: Entity, transform: Transform) -> bool {
        match self.world.get::<&mut Transform>(ship) {
            Ok(mut t) => *t = transform,
            Err(_) => return false,
        }
        self.cache.invalidate(ship);
        self.sync_ship(ship)
    }

    /// Re-derive block positions from the transform and update both grids.
    pub fn sync_ship(&mut self, ship: Entity) -> bool {
        let block_size = self.block_size();
        sync_ship(&mut self.world, &mut self.index, ship, block_size)
    }

    pub fn sync_all(&mut self) -> usize {
        let block_size = self.block_size();
        sync_all_ships(&mut self.world, &mut self.index, block_size)
    }

    /// Integrate velocities for `delta_seconds` and re-index every ship that moved.
    pub fn advance(&mut self, delta_seconds: f32) -> usize {
        let moved = motion_system(&mut self.world, delta_seconds);
        for &ship in &moved {
            self.sync_ship(ship);
        }
        moved.len()
    }

    // --- Queries ---

    pub fn ships_in_radius(&self, center: Vec2, radius: f32, exclude: Option<Faction>) -> Vec<Entity> {
        self.index.ships.query_radius(center, radius, exclude)
    }

    pub fn ships_in_rect(&self, min: Vec2, max: Vec2, exclude: Option<Faction>) -> Vec<Entity> {
        self.index.ships.query_rect(min, max, exclude)
    }

    pub fn blocks_in_rect(&self, min: Vec2, max: Vec2, exclude: Option<Faction>) -> Vec<BlockKey> {
        self.index.blocks.query_rect(min, max, exclude)
    }

    /// Blocks along a segment, optionally widened into a beam.
    pub fn raycast_blocks(
        &self,
        origin: Vec2,
        target: Vec2,
        beam_thickness: f32,
        exclude: Option<Faction>,
    ) -> Vec<BlockKey> {
        self.index.blocks.raycast(origin, target, beam_thickness, exclude)
    }

    /// Distinct ships owning any block along the segment.
    pub fn raycast_ships(
        &self,
        origin: Vec2,
        target: Vec2,
        beam_thickness: f32,
        exclude: Option<Faction>,
    ) -> Vec<Entity> {
        let mut ships: Vec<Entity> = self
            .raycast_blocks(origin, target, beam_thickness, exclude)
            .into_iter()
            .map(|k| k.ship)
            .collect();
        ships.sort_unstable_by_key(|e| e.to_bits());
        ships.dedup();
        ships
    }

    /// Closest block the segment enters, skipping `ignore_ship`'s own blocks.
    pub fn first_block_hit(
        &self,
        origin: Vec2,
        target: Vec2,
        exclude: Option<Faction>,
        ignore_ship: Option<Entity>,
    ) -> Option<RayHit<BlockKey>> {
        self.index
            .blocks
            .first_hit_along_ray(origin, target, exclude, |key| Some(key.ship) != ignore_ship)
    }

    pub fn is_colliding(&self, ship: Entity) -> bool {
        self.world
            .get::<&CollisionState>(ship)
            .map(|s| s.colliding)
            .unwrap_or(false)
    }

    // --- Collision ---

    /// Reset per-pass state. Call once before driving
    /// [`CombatEngine::resolve_collisions`] for individual ships.
    pub fn begin_pass(&mut self) {
        self.cache.clear();
        for (_, state) in self.world.query_mut::<&mut CollisionState>() {
            state.colliding = false;
        }
    }

    /// Resolve collisions for a single moving ship.
    pub fn resolve_collisions<S: DamageSink + ?Sized>(&mut self, mover: Entity, sink: &mut S) -> CollisionStats {
        if !self.config.collisions_enabled {
            return CollisionStats::default();
        }
        resolve_collisions(
            &mut self.world,
            &mut self.index,
            &mut self.cache,
            &self.config.collision,
            mover,
            sink,
        )
    }

    /// Resolve collisions for every movable ship.
    pub fn run_collision_pass<S: DamageSink + ?Sized>(&mut self, sink: &mut S) -> CollisionStats {
        if !self.config.collisions_enabled {
            return CollisionStats::default();
        }
        collision_system(
            &mut self.world,
            &mut self.index,
            &mut self.cache,
            &self.config.collision,
            sink,
        )
    }

    /// Advance motion, then run a collision pass.
    pub fn update<S: DamageSink + ?Sized>(&mut self, delta_seconds: f32, sink: &mut S) -> CollisionStats {
        self.advance(delta_seconds);
        self.run_collision_pass(sink)
    }

    /// Number of divergences between the grids' global and allegiance
    /// indices. Zero when healthy.
    pub fn audit(&self) -> usize {
        self.index.blocks.audit().len() + self.index.ships.audit().len()
    }
}

impl Default for CombatEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
