//! Ship-level components: transform, allegiance and collision flags.

use fleetgrid_logic::Vec2;
use serde::{Deserialize, Serialize};

use super::hull::BlockCoord;

/// Allegiance tags used by the host game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Ally,
    Enemy,
    /// Non-hostile third party. Still an allegiance of its own, so it shows
    /// up in every exclusion query except one that excludes `Neutral`.
    Neutral,
}

/// Allegiance of a ship. Ships without this component are indexed globally
/// only and never appear in allegiance-filtered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allegiance(pub Faction);

/// Rigid-body transform shared by every block of a ship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    /// Radians, counter-clockwise.
    pub rotation: f32,
    pub velocity: Vec2,
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// World-space centre of the block at `coord`.
    pub fn block_world_position(&self, coord: BlockCoord, block_size: f32) -> Vec2 {
        let local = Vec2::new(coord.x as f32 * block_size, coord.y as f32 * block_size);
        self.position + local.rotate(self.rotation)
    }
}

/// Marker: collision response never moves this ship (stations, asteroids).
#[derive(Debug, Clone, Copy, Default)]
pub struct Immovable;

/// Set while a ship's bounding box overlaps another ship this pass.
/// Cleared at the start of every collision pass; read by effects code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionState {
    pub colliding: bool,
}
