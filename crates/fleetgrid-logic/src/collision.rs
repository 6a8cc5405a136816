//! Pure collision math: narrow phase, separation, penetration split and impulse.
//!
//! Pipeline for one overlapping ship pair (A = mover, B = other):
//! 1. `find_overlaps`: capped cross product of block positions
//! 2. `separation_vector`: averaged B->A displacement, scaled to a partial
//!    correction depth (Baumgarte-style)
//! 3. `penetration_displacement`: split the MSV by the *other* body's mass
//! 4. `resolve_impulse`: restitution impulse along the MSV normal, skipped
//!    when the bodies are already separating
//!
//! The ECS side feeds plain positions and body states in and applies the
//! returned displacements and velocities.

use crate::config::CollisionConfig;
use crate::geometry::Vec2;

/// Two blocks, one from each ship, whose footprints overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapPair {
    /// Index into ship A's block list.
    pub a: usize,
    /// Index into ship B's block list.
    pub b: usize,
    pub a_pos: Vec2,
    pub b_pos: Vec2,
}

/// Physical state of one ship as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub velocity: Vec2,
    pub mass: f32,
    pub immovable: bool,
}

/// Position change for each side of a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement {
    pub a: Vec2,
    pub b: Vec2,
}

/// Velocities after an impulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseResult {
    pub a_velocity: Vec2,
    pub b_velocity: Vec2,
    /// Signed impulse magnitude along the normal.
    pub magnitude: f32,
}

/// Blocks overlap when both axis deltas are strictly below one footprint.
pub fn blocks_overlap(a: Vec2, b: Vec2, footprint: f32) -> bool {
    (a.x - b.x).abs() < footprint && (a.y - b.y).abs() < footprint
}

/// Overlapping block pairs between two ships, at most `max_pairs` of them.
pub fn find_overlaps(a: &[Vec2], b: &[Vec2], footprint: f32, max_pairs: usize) -> Vec<OverlapPair> {
    let mut pairs = Vec::new();
    for (ia, &pa) in a.iter().enumerate() {
        for (ib, &pb) in b.iter().enumerate() {
            if !blocks_overlap(pa, pb, footprint) {
                continue;
            }
            pairs.push(OverlapPair {
                a: ia,
                b: ib,
                a_pos: pa,
                b_pos: pb,
            });
            if pairs.len() >= max_pairs {
                return pairs;
            }
        }
    }
    pairs
}

/// Minimum separation vector pushing A away from B.
///
/// Direction is the mean B->A centre displacement over all overlapping
/// pairs; length is `max(footprint / 2 - slop, 0) * correction_ratio`.
/// `None` when there are no pairs or the mean displacement is zero.
pub fn separation_vector(pairs: &[OverlapPair], config: &CollisionConfig) -> Option<Vec2> {
    if pairs.is_empty() {
        return None;
    }
    let mut sum = Vec2::ZERO;
    for p in pairs {
        sum += p.a_pos - p.b_pos;
    }
    let mean = sum / pairs.len() as f32;
    if mean.length_squared() == 0.0 || !mean.is_finite() {
        return None;
    }

    let depth = (config.block_size / 2.0 - config.penetration_slop).max(0.0) * config.correction_ratio;
    Some(mean.normalize() * depth)
}

/// Zero total mass would divide by zero; treat it as unit mass.
pub fn safe_total_mass(a: f32, b: f32) -> f32 {
    let total = a + b;
    if total > 0.0 && total.is_finite() {
        total
    } else {
        1.0
    }
}

/// How far each ship moves to resolve penetration.
///
/// One immovable side leaves the other to take the full MSV. Two movable
/// sides split it in proportion to the *other* side's mass.
pub fn penetration_displacement(msv: Vec2, a: &BodyState, b: &BodyState) -> Displacement {
    match (a.immovable, b.immovable) {
        (true, true) => Displacement {
            a: Vec2::ZERO,
            b: Vec2::ZERO,
        },
        (true, false) => Displacement {
            a: Vec2::ZERO,
            b: -msv,
        },
        (false, true) => Displacement {
            a: msv,
            b: Vec2::ZERO,
        },
        (false, false) => {
            let total = safe_total_mass(a.mass, b.mass);
            Displacement {
                a: msv * (b.mass / total),
                b: -msv * (a.mass / total),
            }
        }
    }
}

/// Restitution impulse along the MSV normal.
///
/// Returns `None` when both sides are immovable, the bodies are already
/// separating, or the impulse falls below `impulse_epsilon`. Closing speed
/// is clamped to `max_closing_speed` so tunnelled fast movers do not get
/// launched. Movable velocities are damped after the impulse.
pub fn resolve_impulse(
    msv: Vec2,
    a: &BodyState,
    b: &BodyState,
    config: &CollisionConfig,
) -> Option<ImpulseResult> {
    if a.immovable && b.immovable {
        return None;
    }
    let normal = msv.normalize();
    if normal == Vec2::ZERO {
        return None;
    }

    let closing = (a.velocity - b.velocity).dot(normal);
    if closing >= 0.0 {
        return None;
    }

    let total = safe_total_mass(a.mass, b.mass);
    let clamped = closing.max(-config.max_closing_speed);
    let magnitude = -(1.0 + config.restitution) * clamped / total;
    if magnitude.abs() < config.impulse_epsilon {
        return None;
    }

    let impulse = normal * magnitude;
    let damping = config.velocity_damping;
    let (a_velocity, b_velocity) = match (a.immovable, b.immovable) {
        (true, _) => (a.velocity, (b.velocity - impulse) * damping),
        (_, true) => ((a.velocity + impulse) * damping, b.velocity),
        _ => (
            (a.velocity + impulse * (b.mass / total)) * damping,
            (b.velocity - impulse * (a.mass / total)) * damping,
        ),
    };

    Some(ImpulseResult {
        a_velocity,
        b_velocity,
        magnitude,
    })
}
