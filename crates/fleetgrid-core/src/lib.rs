//! FleetGrid Core - ship combat spatial engine
//!
//! An ECS world of block-built ships, indexed by two spatial hash grids, with
//! a per-tick collision resolution pass.
//!
//! # Architecture
//!
//! The engine uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: ships (stations and asteroids are immovable ships)
//! - **Components**: `Transform`, `Hull`, `Allegiance`, `Immovable`, `RamAffixes`, `CollisionState`
//! - **Systems**: grid sync, motion, collision resolution
//!
//! Grid and collision math live in `fleetgrid-logic`; this crate wires them
//! to the world and owns the per-pass state.
//!
//! # Example
//!
//! ```rust,no_run
//! use fleetgrid_core::prelude::*;
//!
//! let mut engine = CombatEngine::new(EngineConfig::default());
//! let ship = engine.spawn_ship(
//!     ShipBlueprint::new(Transform::at(Vec2::new(0.0, 0.0)))
//!         .faction(Faction::Player)
//!         .rect(4, 2, BlockType::default()),
//! );
//!
//! let mut damage: Vec<DamageEvent> = Vec::new();
//! for _ in 0..60 {
//!     engine.update(1.0 / 60.0, &mut damage);
//! }
//! println!("{:?} took {} hits", ship, damage.len());
//! ```

pub mod components;
pub mod config;
pub mod damage;
pub mod engine;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{ConfigLoadError, EngineConfig};
    pub use crate::damage::{DamageCause, DamageEvent, DamageSink};
    pub use crate::engine::{CombatEngine, ShipBlueprint};
    pub use crate::systems::CollisionStats;
    pub use fleetgrid_logic::{Aabb, CollisionConfig, GridConfig, RayHit, Vec2};
}
