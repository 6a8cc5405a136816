//! Ship-vs-ship collision resolution.
//!
//! For one moving ship per call:
//! 1. Broad phase: block-grid query over the ship's padded bounds, mapped
//!    back to owning ships
//! 2. Pair test: bounds overlap, which also raises both `CollisionState` flags
//! 3. Narrow phase: capped block-pair overlaps, then the separation vector
//! 4. Penetration: move the movable side(s) and re-sync their blocks
//! 5. Impulse: restitution along the separation normal
//! 6. Damage: per overlapping block pair, forwarded to a [`DamageSink`]
//!
//! The math lives in `fleetgrid_logic::collision`; this module only gathers
//! state from the world and writes results back.

use std::collections::{HashMap, HashSet};

use fleetgrid_logic::collision::{
    find_overlaps, penetration_displacement, resolve_impulse, separation_vector, BodyState,
    Displacement, ImpulseResult, OverlapPair,
};
use fleetgrid_logic::damage::{impact_damage, ramming_damage};
use fleetgrid_logic::{Aabb, CollisionConfig, Vec2};
use hecs::{Entity, World};

use super::sync::{sync_ship, ShipIndex};
use crate::components::{
    BlockCoord, CollisionState, Hull, Immovable, RamAffixes, RamStats, Transform,
};
use crate::damage::{DamageCause, DamageEvent, DamageSink};

/// One positioned block as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSample {
    pub coord: BlockCoord,
    pub position: Vec2,
    pub ram: RamStats,
}

/// Everything the resolver reads about one ship, gathered once per pass.
#[derive(Debug, Clone)]
pub struct ShipSnapshot {
    pub body: BodyState,
    pub affixes: RamAffixes,
    pub blocks: Vec<BlockSample>,
    pub positions: Vec<Vec2>,
    /// Block positions padded by half a block.
    pub bounds: Aabb,
}

impl ShipSnapshot {
    /// `None` for entities that are not ships or have no positioned blocks.
    pub fn capture(world: &mut World, entity: Entity, block_size: f32) -> Option<Self> {
        let (transform, hull, immovable, affixes) = world
            .query_one_mut::<(&Transform, &mut Hull, Option<&Immovable>, Option<&RamAffixes>)>(
                entity,
            )
            .ok()?;

        let blocks: Vec<BlockSample> = hull
            .iter()
            .filter_map(|(coord, block)| {
                block.world_position.map(|position| BlockSample {
                    coord,
                    position,
                    ram: block.kind.ram,
                })
            })
            .collect();
        let positions: Vec<Vec2> = blocks.iter().map(|b| b.position).collect();
        let bounds = hull.bounds(block_size)?;

        Some(Self {
            body: BodyState {
                velocity: transform.velocity,
                mass: hull.total_mass(),
                immovable: immovable.is_some(),
            },
            affixes: affixes.copied().unwrap_or_default(),
            blocks,
            positions,
            bounds,
        })
    }
}

/// Per-pass snapshot cache. Must be cleared at the start of every pass,
/// since blocks can be added or destroyed between passes.
#[derive(Debug, Default)]
pub struct PassCache {
    ships: HashMap<Entity, ShipSnapshot>,
}

impl PassCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ships.clear();
    }

    /// Forget one ship, e.g. after it moved or its velocity changed.
    pub fn invalidate(&mut self, entity: Entity) {
        self.ships.remove(&entity);
    }

    pub fn get(&self, entity: Entity) -> Option<&ShipSnapshot> {
        self.ships.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Capture `entity` if it is not cached yet. Returns whether a snapshot exists.
    pub fn ensure(&mut self, world: &mut World, entity: Entity, block_size: f32) -> bool {
        if self.ships.contains_key(&entity) {
            return true;
        }
        match ShipSnapshot::capture(world, entity, block_size) {
            Some(snap) => {
                self.ships.insert(entity, snap);
                true
            }
            None => false,
        }
    }
}

/// Counters for one resolve call or one whole pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionStats {
    /// Distinct ships returned by broad phase.
    pub candidates: usize,
    /// Pairs whose bounds overlapped.
    pub contacts: usize,
    /// Pairs with at least one overlapping block pair.
    pub penetrations: usize,
    pub impulses: usize,
    pub damage_events: usize,
}

impl std::ops::AddAssign for CollisionStats {
    fn add_assign(&mut self, rhs: Self) {
        self.candidates += rhs.candidates;
        self.contacts += rhs.contacts;
        self.penetrations += rhs.penetrations;
        self.impulses += rhs.impulses;
        self.damage_events += rhs.damage_events;
    }
}

/// What resolving one overlapping pair will do, computed from snapshots
/// before anything is written back.
#[derive(Debug, Clone)]
pub struct PairPlan {
    pub pairs: Vec<OverlapPair>,
    /// Magnitude of the velocity difference before any impulse.
    pub relative_speed: f32,
    pub msv: Option<Vec2>,
    pub displacement: Option<Displacement>,
    pub impulse: Option<ImpulseResult>,
}

/// Plan a pair, or `None` when their bounds do not overlap.
pub fn plan_pair(a: &ShipSnapshot, b: &ShipSnapshot, config: &CollisionConfig) -> Option<PairPlan> {
    if !a.bounds.overlaps(&b.bounds) {
        return None;
    }
    let pairs = find_overlaps(
        &a.positions,
        &b.positions,
        config.block_size,
        config.max_overlap_pairs,
    );
    let relative_speed = (a.body.velocity - b.body.velocity).length();
    let msv = separation_vector(&pairs, config);
    let displacement = msv.map(|m| penetration_displacement(m, &a.body, &b.body));
    let impulse = msv.and_then(|m| resolve_impulse(m, &a.body, &b.body, config));
    Some(PairPlan {
        pairs,
        relative_speed,
        msv,
        displacement,
        impulse,
    })
}

/// Damage each side of an overlapping pair deals to the other.
///
/// At most `max_damaged_blocks` distinct blocks are damaged per side.
/// Zero-amount hits are dropped.
pub fn damage_events(
    a_id: Entity,
    a: &ShipSnapshot,
    b_id: Entity,
    b: &ShipSnapshot,
    plan: &PairPlan,
    config: &CollisionConfig,
) -> Vec<DamageEvent> {
    let base = impact_damage(plan.relative_speed, config);
    let mut events = Vec::new();
    if !(base > 0.0) {
        return events;
    }

    let mut hit_a: HashSet<usize> = HashSet::new();
    let mut hit_b: HashSet<usize> = HashSet::new();
    let cap = config.max_damaged_blocks;

    for pair in &plan.pairs {
        let (block_a, block_b) = (&a.blocks[pair.a], &b.blocks[pair.b]);

        if hit_b.contains(&pair.b) || hit_b.len() < cap {
            let amount = ramming_damage(base, block_a.ram, a.affixes, block_b.ram, b.affixes);
            if amount > 0.0 {
                hit_b.insert(pair.b);
                events.push(DamageEvent {
                    target: b_id,
                    instigator: a_id,
                    block: block_b.coord,
                    world_position: block_b.position,
                    amount,
                    cause: DamageCause::Collision,
                });
            }
        }

        if hit_a.contains(&pair.a) || hit_a.len() < cap {
            let amount = ramming_damage(base, block_b.ram, b.affixes, block_a.ram, a.affixes);
            if amount > 0.0 {
                hit_a.insert(pair.a);
                events.push(DamageEvent {
                    target: a_id,
                    instigator: b_id,
                    block: block_a.coord,
                    world_position: block_a.position,
                    amount,
                    cause: DamageCause::Collision,
                });
            }
        }
    }
    events
}

/// Raise the colliding flag, attaching the component if it is missing.
pub fn mark_colliding(world: &mut World, entity: Entity) {
    let updated = match world.get::<&mut CollisionState>(entity) {
        Ok(mut state) => {
            state.colliding = true;
            true
        }
        Err(_) => false,
    };
    if !updated && world.contains(entity) {
        if let Err(e) = world.insert_one(entity, CollisionState { colliding: true }) {
            log::trace!("collision: cannot flag {:?}: {}", entity, e);
        }
    }
}

/// Resolve every collision of `mover` against the rest of the world.
pub fn resolve_collisions<S: DamageSink + ?Sized>(
    world: &mut World,
    index: &mut ShipIndex,
    cache: &mut PassCache,
    config: &CollisionConfig,
    mover: Entity,
    sink: &mut S,
) -> CollisionStats {
    let mut stats = CollisionStats::default();
    if !cache.ensure(world, mover, config.block_size) {
        log::trace!("collision: {:?} has no positioned blocks", mover);
        return stats;
    }
    // Pad by another half block so neighbours whose footprints reach the
    // bounds are found even when their centres lie just outside.
    let Some(query_box) = cache.get(mover).map(|s| s.bounds.expanded(config.block_size / 2.0)) else {
        return stats;
    };

    let mut candidates: Vec<Entity> = index
        .blocks
        .query_aabb(&query_box, None)
        .into_iter()
        .map(|key| key.ship)
        .filter(|&ship| ship != mover)
        .collect();
    candidates.sort_unstable_by_key(|e| e.to_bits());
    candidates.dedup();
    stats.candidates = candidates.len();

    for other in candidates {
        resolve_pair(world, index, cache, config, mover, other, sink, &mut stats);
    }
    stats
}

#[allow(clippy::too_many_arguments)]
fn resolve_pair<S: DamageSink + ?Sized>(
    world: &mut World,
    index: &mut ShipIndex,
    cache: &mut PassCache,
    config: &CollisionConfig,
    a_id: Entity,
    b_id: Entity,
    sink: &mut S,
    stats: &mut CollisionStats,
) {
    // Earlier pairs may have moved the mover; recapture on demand.
    if !cache.ensure(world, a_id, config.block_size) || !cache.ensure(world, b_id, config.block_size) {
        return;
    }
    let (Some(a), Some(b)) = (cache.get(a_id), cache.get(b_id)) else {
        return;
    };

    let Some(plan) = plan_pair(a, b, config) else {
        return;
    };
    let events = damage_events(a_id, a, b_id, b, &plan, config);
    let (a_immovable, b_immovable) = (a.body.immovable, b.body.immovable);

    stats.contacts += 1;
    mark_colliding(world, a_id);
    mark_colliding(world, b_id);

    if plan.pairs.is_empty() {
        log::trace!("collision: {:?}/{:?} bounds overlap only", a_id, b_id);
        return;
    }
    stats.penetrations += 1;

    stats.damage_events += events.len();
    for event in events {
        sink.apply_damage(event);
    }

    let Some(displacement) = plan.displacement else {
        log::trace!("collision: {:?}/{:?} degenerate separation", a_id, b_id);
        return;
    };

    if !a_immovable {
        nudge(world, a_id, displacement.a, plan.impulse.map(|i| i.a_velocity));
    }
    if !b_immovable {
        nudge(world, b_id, displacement.b, plan.impulse.map(|i| i.b_velocity));
    }
    match plan.impulse {
        Some(_) => stats.impulses += 1,
        None => log::trace!("collision: {:?}/{:?} no impulse", a_id, b_id),
    }

    for (id, immovable) in [(a_id, a_immovable), (b_id, b_immovable)] {
        if !immovable {
            sync_ship(world, index, id, config.block_size);
            cache.invalidate(id);
        }
    }
}

fn nudge(world: &mut World, entity: Entity, offset: Vec2, velocity: Option<Vec2>) {
    if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
        transform.position += offset;
        if let Some(v) = velocity {
            transform.velocity = v;
        }
    }
}

/// Full collision pass: clear the cache and every colliding flag, then
/// resolve each movable ship in entity order.
pub fn collision_system<S: DamageSink + ?Sized>(
    world: &mut World,
    index: &mut ShipIndex,
    cache: &mut PassCache,
    config: &CollisionConfig,
    sink: &mut S,
) -> CollisionStats {
    cache.clear();
    for (_, state) in world.query_mut::<&mut CollisionState>() {
        state.colliding = false;
    }

    let mut movers: Vec<Entity> = world
        .query::<(&Transform, &Hull)>()
        .without::<&Immovable>()
        .iter()
        .map(|(e, _)| e)
        .collect();
    movers.sort_unstable_by_key(|e| e.to_bits());

    let mut stats = CollisionStats::default();
    for mover in movers {
        stats += resolve_collisions(world, index, cache, config, mover, sink);
    }
    if stats.penetrations > 0 {
        log::debug!(
            "collision pass: {} contacts, {} penetrating, {} impulses, {} damage events",
            stats.contacts,
            stats.penetrations,
            stats.impulses,
            stats.damage_events
        );
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{BlockType, Faction};
    use crate::systems::sync::sync_all_ships;
    use fleetgrid_logic::GridConfig;

    fn setup() -> (World, ShipIndex, PassCache, CollisionConfig) {
        (
            World::new(),
            ShipIndex::new(GridConfig::blocks(), GridConfig::ships()),
            PassCache::new(),
            CollisionConfig::default(),
        )
    }

    fn single_block(world: &mut World, x: f32, vx: f32) -> Entity {
        let hull = Hull::from_blocks([(BlockCoord::new(0, 0), BlockType::default())]);
        world.spawn((
            Transform::at(Vec2::new(x, 0.0)).with_velocity(Vec2::new(vx, 0.0)),
            hull,
            CollisionState::default(),
        ))
    }

    #[test]
    fn snapshot_reads_mass_and_bounds() {
        let (mut world, mut index, mut cache, cfg) = setup();
        let e = single_block(&mut world, 100.0, 0.0);
        sync_all_ships(&mut world, &mut index, cfg.block_size);

        assert!(cache.ensure(&mut world, e, cfg.block_size));
        let snap = cache.get(e).unwrap();
        assert_eq!(snap.body.mass, 1.0);
        assert!(!snap.body.immovable);
        assert_eq!(snap.bounds.min, Vec2::new(84.0, -16.0));
        assert_eq!(snap.bounds.max, Vec2::new(116.0, 16.0));
        let hull_bounds = world.get::<&Hull>(e).unwrap().bounds(cfg.block_size);
        assert_eq!(Some(snap.bounds), hull_bounds);
    }

    #[test]
    fn unsynced_ship_has_no_snapshot() {
        let (mut world, _, mut cache, cfg) = setup();
        let e = single_block(&mut world, 0.0, 0.0);
        assert!(!cache.ensure(&mut world, e, cfg.block_size));
        assert!(cache.is_empty());
    }

    #[test]
    fn distant_ships_do_not_interact() {
        let (mut world, mut index, mut cache, cfg) = setup();
        let a = single_block(&mut world, 0.0, 100.0);
        single_block(&mut world, 500.0, -100.0);
        sync_all_ships(&mut world, &mut index, cfg.block_size);

        let mut sink: Vec<DamageEvent> = Vec::new();
        let stats = resolve_collisions(&mut world, &mut index, &mut cache, &cfg, a, &mut sink);
        assert_eq!(stats, CollisionStats::default());
        assert!(sink.is_empty());
        assert!(!world.get::<&CollisionState>(a).unwrap().colliding);
    }

    #[test]
    fn bounds_touching_flags_without_response() {
        let (mut world, mut index, mut cache, cfg) = setup();
        // exactly one footprint apart: bounds touch, blocks do not overlap
        let a = single_block(&mut world, 0.0, 100.0);
        let b = single_block(&mut world, 32.0, -100.0);
        sync_all_ships(&mut world, &mut index, cfg.block_size);

        let mut sink: Vec<DamageEvent> = Vec::new();
        let stats = resolve_collisions(&mut world, &mut index, &mut cache, &cfg, a, &mut sink);
        assert_eq!(stats.contacts, 1);
        assert_eq!(stats.penetrations, 0);
        assert!(world.get::<&CollisionState>(a).unwrap().colliding);
        assert!(world.get::<&CollisionState>(b).unwrap().colliding);
        assert_eq!(world.get::<&Transform>(a).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn flag_is_attached_when_missing() {
        let mut world = World::new();
        let e = world.spawn((Transform::default(),));
        mark_colliding(&mut world, e);
        assert!(world.get::<&CollisionState>(e).unwrap().colliding);
    }

    #[test]
    fn damage_cap_limits_blocks_per_side() {
        let (mut world, mut index, mut cache, mut cfg) = setup();
        cfg.max_damaged_blocks = 2;
        cfg.max_overlap_pairs = 50;

        let column = |n: i32| {
            Hull::from_blocks((0..n).map(|y| (BlockCoord::new(0, y), BlockType::default())))
        };
        let a = world.spawn((
            Transform::at(Vec2::ZERO).with_velocity(Vec2::new(800.0, 0.0)),
            column(5),
        ));
        let b = world.spawn((
            // offset half a block on both axes so every A block overlaps two B blocks
            Transform::at(Vec2::new(16.0, 16.0)).with_velocity(Vec2::new(-800.0, 0.0)),
            column(5),
        ));
        sync_all_ships(&mut world, &mut index, cfg.block_size);
        assert!(cache.ensure(&mut world, a, cfg.block_size));
        assert!(cache.ensure(&mut world, b, cfg.block_size));

        let (sa, sb) = (cache.get(a).unwrap(), cache.get(b).unwrap());
        let plan = plan_pair(sa, sb, &cfg).unwrap();
        assert!(plan.pairs.len() > 5);
        let events = damage_events(a, sa, b, sb, &plan, &cfg);

        let on_a: HashSet<BlockCoord> = events.iter().filter(|e| e.target == a).map(|e| e.block).collect();
        let on_b: HashSet<BlockCoord> = events.iter().filter(|e| e.target == b).map(|e| e.block).collect();
        assert_eq!(on_a.len(), 2);
        assert_eq!(on_b.len(), 2);
        assert!(events.iter().all(|e| e.amount > 0.0 && e.cause == DamageCause::Collision));
    }

    #[test]
    fn pass_resets_flags_and_skips_immovable_movers() {
        let (mut world, mut index, mut cache, cfg) = setup();
        let station = world.spawn((
            Transform::at(Vec2::new(5000.0, 0.0)),
            Hull::from_blocks([(BlockCoord::new(0, 0), BlockType::default())]),
            Immovable,
            CollisionState { colliding: true },
        ));
        world.insert_one(station, crate::components::Allegiance(Faction::Neutral)).unwrap();
        sync_all_ships(&mut world, &mut index, cfg.block_size);

        let mut sink: Vec<DamageEvent> = Vec::new();
        let stats = collision_system(&mut world, &mut index, &mut cache, &cfg, &mut sink);
        assert_eq!(stats, CollisionStats::default());
        assert!(!world.get::<&CollisionState>(station).unwrap().colliding);
    }
}
