//! Damage hand-off to the host game.
//!
//! The collision system only computes amounts. Applying them (hit points,
//! block destruction, debris) is the host's job, behind [`DamageSink`].

use fleetgrid_logic::Vec2;
use hecs::Entity;

use crate::components::BlockCoord;

/// Why a block took damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DamageCause {
    Collision,
}

impl DamageCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            DamageCause::Collision => "collision",
        }
    }
}

impl std::fmt::Display for DamageCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instruction to damage one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    /// Ship owning the damaged block.
    pub target: Entity,
    /// Ship that dealt the damage.
    pub instigator: Entity,
    pub block: BlockCoord,
    /// Where the damaged block was when the damage was computed.
    pub world_position: Vec2,
    pub amount: f32,
    pub cause: DamageCause,
}

/// Receiver of damage instructions.
pub trait DamageSink {
    fn apply_damage(&mut self, event: DamageEvent);
}

/// Collects events for later inspection (tests, replays, batching).
impl DamageSink for Vec<DamageEvent> {
    fn apply_damage(&mut self, event: DamageEvent) {
        self.push(event);
    }
}

impl<S: DamageSink + ?Sized> DamageSink for &mut S {
    fn apply_damage(&mut self, event: DamageEvent) {
        (**self).apply_damage(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cause_tag() {
        assert_eq!(DamageCause::Collision.as_str(), "collision");
        assert_eq!(DamageCause::Collision.to_string(), "collision");
    }

    #[test]
    fn vec_collects_events() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let mut sink: Vec<DamageEvent> = Vec::new();
        sink.apply_damage(DamageEvent {
            target: a,
            instigator: b,
            block: BlockCoord::new(0, 0),
            world_position: Vec2::ZERO,
            amount: 3.0,
            cause: DamageCause::Collision,
        });
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].target, a);
    }
}
