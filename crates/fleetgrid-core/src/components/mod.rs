//! Component definitions for the combat ECS.
//!
//! Components are pure data structs attached to ship entities.
//! They have no behavior - that lives in systems.

mod hull;
mod ship;

pub use fleetgrid_logic::damage::{RamAffixes, RamStats};
pub use hull::*;
pub use ship::*;
