//! Ramming damage model.
//!
//! Base damage depends only on relative speed:
//! - below `min_damage_speed` -> 0
//! - otherwise `((min(speed, soft_cap) - min) / (soft_cap - min)) ^ exponent * max_damage`
//!
//! Each side then scales the base by its own block's ramming multiplier and
//! its ship's inflict affix, and the defender subtracts its block armor
//! scaled by its ship's armor affix.

use serde::{Deserialize, Serialize};

use crate::config::CollisionConfig;

/// Intrinsic ramming stats of a block type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RamStats {
    pub damage_multiplier: f32,
    pub armor: f32,
}

impl Default for RamStats {
    fn default() -> Self {
        Self {
            damage_multiplier: 1.0,
            armor: 0.0,
        }
    }
}

/// Ship-level multipliers layered over block stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RamAffixes {
    pub damage_inflict: f32,
    pub armor: f32,
}

impl Default for RamAffixes {
    fn default() -> Self {
        Self {
            damage_inflict: 1.0,
            armor: 1.0,
        }
    }
}

/// Base collision damage for a relative speed. Non-decreasing in `speed`.
pub fn impact_damage(speed: f32, config: &CollisionConfig) -> f32 {
    if !(speed >= config.min_damage_speed) {
        return 0.0;
    }
    let span = config.damage_soft_cap_speed - config.min_damage_speed;
    if span <= 0.0 {
        return config.max_damage;
    }
    let clamped = speed.min(config.damage_soft_cap_speed);
    let normalized = (clamped - config.min_damage_speed) / span;
    normalized.powf(config.damage_exponent) * config.max_damage
}

/// Damage one block deals to another. Never negative.
pub fn ramming_damage(
    base: f32,
    attacker: RamStats,
    attacker_affixes: RamAffixes,
    defender: RamStats,
    defender_affixes: RamAffixes,
) -> f32 {
    let raw = base * attacker.damage_multiplier * attacker_affixes.damage_inflict;
    let armor = defender.armor * defender_affixes.armor;
    (raw - armor).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CollisionConfig {
        CollisionConfig::default()
    }

    #[test]
    fn below_threshold_is_zero() {
        assert_eq!(impact_damage(0.0, &cfg()), 0.0);
        assert_eq!(impact_damage(50.0, &cfg()), 0.0);
        assert_eq!(impact_damage(69.9, &cfg()), 0.0);
        assert_eq!(impact_damage(f32::NAN, &cfg()), 0.0);
    }

    #[test]
    fn threshold_and_soft_cap() {
        assert_eq!(impact_damage(70.0, &cfg()), 0.0);
        assert!((impact_damage(1500.0, &cfg()) - 50.0).abs() < 1e-3);
        assert!((impact_damage(9000.0, &cfg()) - 50.0).abs() < 1e-3);
    }

    #[test]
    fn curve_is_convex() {
        let c = cfg();
        let mid_speed = (c.min_damage_speed + c.damage_soft_cap_speed) / 2.0;
        let mid = impact_damage(mid_speed, &c);
        // exponent > 1 puts the midpoint below the linear midpoint
        assert!(mid < c.max_damage / 2.0, "mid={mid}");
        assert!(mid > 0.0);
    }

    #[test]
    fn monotone_in_speed() {
        let c = cfg();
        let mut last = 0.0;
        for s in (0..2000).step_by(25) {
            let d = impact_damage(s as f32, &c);
            assert!(d >= last, "speed {s}: {d} < {last}");
            last = d;
        }
    }

    #[test]
    fn armor_reduces_and_floors_at_zero() {
        let base = 20.0;
        let plain = RamStats::default();
        let affix = RamAffixes::default();
        assert_eq!(ramming_damage(base, plain, affix, plain, affix), 20.0);

        let armored = RamStats {
            damage_multiplier: 1.0,
            armor: 5.0,
        };
        assert_eq!(ramming_damage(base, plain, affix, armored, affix), 15.0);

        let fortress = RamStats {
            damage_multiplier: 1.0,
            armor: 100.0,
        };
        assert_eq!(ramming_damage(base, plain, affix, fortress, affix), 0.0);
    }

    #[test]
    fn multipliers_and_affixes_stack() {
        let ram = RamStats {
            damage_multiplier: 2.0,
            armor: 0.0,
        };
        let spear = RamAffixes {
            damage_inflict: 2.0,
            armor: 1.0,
        };
        let target = RamStats {
            damage_multiplier: 1.0,
            armor: 4.0,
        };
        let hardened = RamAffixes {
            damage_inflict: 1.0,
            armor: 1.5,
        };
        // 10 * 2 * 2 - 4 * 1.5
        assert_eq!(ramming_damage(10.0, ram, spear, target, hardened), 34.0);
    }

    #[test]
    fn monotone_in_armor() {
        let mut last = f32::INFINITY;
        for armor in 0..30 {
            let d = ramming_damage(
                25.0,
                RamStats::default(),
                RamAffixes::default(),
                RamStats {
                    damage_multiplier: 1.0,
                    armor: armor as f32,
                },
                RamAffixes::default(),
            );
            assert!(d <= last);
            last = d;
        }
    }
}
