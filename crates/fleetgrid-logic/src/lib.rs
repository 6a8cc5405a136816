//! Pure spatial-indexing and collision logic for fleetgrid.
//!
//! This crate has no ECS or engine dependency. Functions take plain data and
//! return results, so every piece is unit-testable on its own and the
//! engine crate only has to move data in and out.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`collision`] | Narrow phase, separation vector, penetration split, impulse |
//! | [`config`] | Grid and collision tuning, validation errors |
//! | [`damage`] | Speed-based ramming damage with armor and affixes |
//! | [`geometry`] | `Vec2`, `Aabb`, ray/box slab test |
//! | [`grid`] | Spatial hash with global and per-allegiance indices |
//! | [`raycast`] | DDA cell walk, beams, first-hit queries |

pub mod collision;
pub mod config;
pub mod damage;
pub mod geometry;
pub mod grid;
pub mod raycast;

pub use config::{CollisionConfig, ConfigError, GridConfig};
pub use geometry::{Aabb, Vec2};
pub use grid::{CellCoord, SpatialGrid};
pub use raycast::RayHit;
