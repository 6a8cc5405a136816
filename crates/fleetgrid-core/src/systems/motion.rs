//! Motion system - integrates ship velocities

use hecs::{Entity, World};

use crate::components::{Immovable, Transform};

/// Advance every movable ship by `velocity * delta_seconds`.
///
/// Returns the ships that actually moved; callers must re-sync them before
/// querying the grids.
pub fn motion_system(world: &mut World, delta_seconds: f32) -> Vec<Entity> {
    let mut moved = Vec::new();
    if !(delta_seconds > 0.0) {
        return moved;
    }

    for (entity, transform) in world.query_mut::<&mut Transform>().without::<&Immovable>() {
        if transform.velocity.length_squared() == 0.0 {
            continue;
        }
        let next = transform.position + transform.velocity * delta_seconds;
        if !next.is_finite() {
            log::debug!("motion: {:?} would leave finite space, holding", entity);
            continue;
        }
        transform.position = next;
        moved.push(entity);
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgrid_logic::Vec2;

    #[test]
    fn moves_by_velocity() {
        let mut world = World::new();
        let e = world.spawn((Transform::at(Vec2::new(1.0, 1.0)).with_velocity(Vec2::new(10.0, -4.0)),));

        let moved = motion_system(&mut world, 0.5);
        assert_eq!(moved, vec![e]);
        assert_eq!(world.get::<&Transform>(e).unwrap().position, Vec2::new(6.0, -1.0));
    }

    #[test]
    fn immovable_and_resting_ships_stay_put() {
        let mut world = World::new();
        let station = world.spawn((
            Transform::at(Vec2::ZERO).with_velocity(Vec2::new(10.0, 0.0)),
            Immovable,
        ));
        let parked = world.spawn((Transform::at(Vec2::new(5.0, 5.0)),));

        assert!(motion_system(&mut world, 1.0).is_empty());
        assert_eq!(world.get::<&Transform>(station).unwrap().position, Vec2::ZERO);
        assert_eq!(world.get::<&Transform>(parked).unwrap().position, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn non_positive_delta_is_ignored() {
        let mut world = World::new();
        world.spawn((Transform::at(Vec2::ZERO).with_velocity(Vec2::new(1.0, 0.0)),));
        assert!(motion_system(&mut world, 0.0).is_empty());
        assert!(motion_system(&mut world, -1.0).is_empty());
    }
}
