//! Tunable constants for the spatial grids and the collision pass.
//!
//! Every value the resolver and the grid depend on lives here as a named,
//! serializable option. Defaults match the tuning the game shipped with.

use serde::{Deserialize, Serialize};

/// Configuration of one spatial hash instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Side length of one square cell in world units.
    pub cell_size: f32,
    /// Hard cap on cells visited by a single DDA walk.
    pub max_ray_steps: u32,
    /// Hard cap on parallel columns a thick beam walks.
    pub max_beam_columns: u32,
}

impl GridConfig {
    pub const DEFAULT_MAX_RAY_STEPS: u32 = 500;
    pub const DEFAULT_MAX_BEAM_COLUMNS: u32 = 33;

    /// Fine-grained grid indexing individual blocks.
    pub fn blocks() -> Self {
        Self {
            cell_size: 256.0,
            max_ray_steps: Self::DEFAULT_MAX_RAY_STEPS,
            max_beam_columns: Self::DEFAULT_MAX_BEAM_COLUMNS,
        }
    }

    /// Coarse grid indexing whole ships by their transform origin.
    pub fn ships() -> Self {
        Self {
            cell_size: 3000.0,
            max_ray_steps: Self::DEFAULT_MAX_RAY_STEPS,
            max_beam_columns: Self::DEFAULT_MAX_BEAM_COLUMNS,
        }
    }

    pub fn with_cell_size(cell_size: f32) -> Self {
        Self {
            cell_size,
            ..Self::blocks()
        }
    }

    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            errors.push(ConfigError::InvalidCellSize(self.cell_size));
        }
        if self.max_ray_steps == 0 {
            errors.push(ConfigError::ZeroRaySteps);
        }
        if self.max_beam_columns == 0 {
            errors.push(ConfigError::ZeroBeamColumns);
        }
        errors
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::blocks()
    }
}

/// Physics and damage tuning for block-vs-block collisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Footprint of one block; two blocks overlap when both axis deltas are below it.
    pub block_size: f32,
    /// Overlap depth tolerated without positional correction.
    pub penetration_slop: f32,
    /// Fraction of the remaining penetration corrected per tick.
    pub correction_ratio: f32,
    /// 0 = fully inelastic, 1 = perfectly elastic.
    pub restitution: f32,
    /// Multiplier applied to velocities after an impulse.
    pub velocity_damping: f32,
    /// Impulses smaller than this are dropped.
    pub impulse_epsilon: f32,
    /// Closing speed is clamped to this before computing the impulse.
    pub max_closing_speed: f32,
    /// Relative speeds below this deal no damage.
    pub min_damage_speed: f32,
    /// Relative speed at which damage stops scaling.
    pub damage_soft_cap_speed: f32,
    /// Curve exponent applied to normalized speed (> 1 is convex).
    pub damage_exponent: f32,
    /// Base damage at the soft cap, before block multipliers and armor.
    pub max_damage: f32,
    /// Overlapping block pairs examined per ship pair.
    pub max_overlap_pairs: usize,
    /// Blocks damaged per side per ship pair.
    pub max_damaged_blocks: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            block_size: 32.0,
            penetration_slop: 4.0,
            correction_ratio: 0.4,
            restitution: 0.2,
            velocity_damping: 0.95,
            impulse_epsilon: 0.05,
            max_closing_speed: 200.0,
            min_damage_speed: 70.0,
            damage_soft_cap_speed: 1500.0,
            damage_exponent: 1.35,
            max_damage: 50.0,
            max_overlap_pairs: 10,
            max_damaged_blocks: 10,
        }
    }
}

impl CollisionConfig {
    /// Validate every field, returning all errors found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if !(self.block_size.is_finite() && self.block_size > 0.0) {
            errors.push(ConfigError::InvalidBlockSize(self.block_size));
        }
        if !(self.penetration_slop >= 0.0) {
            errors.push(ConfigError::NegativeSlop(self.penetration_slop));
        }
        if !(self.correction_ratio > 0.0 && self.correction_ratio <= 1.0) {
            errors.push(ConfigError::CorrectionRatioOutOfRange(self.correction_ratio));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            errors.push(ConfigError::RestitutionOutOfRange(self.restitution));
        }
        if !(self.velocity_damping > 0.0 && self.velocity_damping <= 1.0) {
            errors.push(ConfigError::DampingOutOfRange(self.velocity_damping));
        }
        if !(self.impulse_epsilon >= 0.0) {
            errors.push(ConfigError::NegativeImpulseEpsilon(self.impulse_epsilon));
        }
        if !(self.max_closing_speed > 0.0) {
            errors.push(ConfigError::InvalidClosingSpeed(self.max_closing_speed));
        }
        if !(self.min_damage_speed >= 0.0 && self.damage_soft_cap_speed > self.min_damage_speed) {
            errors.push(ConfigError::DamageSpeedRange {
                min: self.min_damage_speed,
                soft_cap: self.damage_soft_cap_speed,
            });
        }
        if !(self.damage_exponent > 0.0) {
            errors.push(ConfigError::InvalidDamageExponent(self.damage_exponent));
        }
        if !(self.max_damage >= 0.0) {
            errors.push(ConfigError::NegativeMaxDamage(self.max_damage));
        }
        if self.max_overlap_pairs == 0 {
            errors.push(ConfigError::ZeroOverlapPairs);
        }
        if self.max_damaged_blocks == 0 {
            errors.push(ConfigError::ZeroDamagedBlocks);
        }

        errors
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Grid cell size must be finite and positive.
    InvalidCellSize(f32),
    /// Ray walks need at least one step.
    ZeroRaySteps,
    /// Beams need at least the centre column.
    ZeroBeamColumns,
    /// Block footprint must be finite and positive.
    InvalidBlockSize(f32),
    NegativeSlop(f32),
    CorrectionRatioOutOfRange(f32),
    RestitutionOutOfRange(f32),
    DampingOutOfRange(f32),
    NegativeImpulseEpsilon(f32),
    InvalidClosingSpeed(f32),
    /// Soft cap must sit above the minimum damage speed.
    DamageSpeedRange { min: f32, soft_cap: f32 },
    InvalidDamageExponent(f32),
    NegativeMaxDamage(f32),
    ZeroOverlapPairs,
    ZeroDamagedBlocks,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidCellSize(v) => write!(f, "cell size must be positive, got {}", v),
            ConfigError::ZeroRaySteps => write!(f, "max ray steps must be at least 1"),
            ConfigError::ZeroBeamColumns => write!(f, "max beam columns must be at least 1"),
            ConfigError::InvalidBlockSize(v) => {
                write!(f, "block size must be positive, got {}", v)
            }
            ConfigError::NegativeSlop(v) => {
                write!(f, "penetration slop must not be negative, got {}", v)
            }
            ConfigError::CorrectionRatioOutOfRange(v) => {
                write!(f, "correction ratio must be in (0, 1], got {}", v)
            }
            ConfigError::RestitutionOutOfRange(v) => {
                write!(f, "restitution must be in [0, 1], got {}", v)
            }
            ConfigError::DampingOutOfRange(v) => {
                write!(f, "velocity damping must be in (0, 1], got {}", v)
            }
            ConfigError::NegativeImpulseEpsilon(v) => {
                write!(f, "impulse epsilon must not be negative, got {}", v)
            }
            ConfigError::InvalidClosingSpeed(v) => {
                write!(f, "max closing speed must be positive, got {}", v)
            }
            ConfigError::DamageSpeedRange { min, soft_cap } => write!(
                f,
                "damage soft cap ({}) must exceed min damage speed ({})",
                soft_cap, min
            ),
            ConfigError::InvalidDamageExponent(v) => {
                write!(f, "damage exponent must be positive, got {}", v)
            }
            ConfigError::NegativeMaxDamage(v) => {
                write!(f, "max damage must not be negative, got {}", v)
            }
            ConfigError::ZeroOverlapPairs => write!(f, "max overlap pairs must be at least 1"),
            ConfigError::ZeroDamagedBlocks => write!(f, "max damaged blocks must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(GridConfig::blocks().validate().is_empty());
        assert!(GridConfig::ships().validate().is_empty());
        assert!(CollisionConfig::default().validate().is_empty());
    }

    #[test]
    fn presets_differ_only_in_cell_size() {
        let fine = GridConfig::blocks();
        let coarse = GridConfig::ships();
        assert!(coarse.cell_size > fine.cell_size);
        assert_eq!(coarse.max_ray_steps, fine.max_ray_steps);
        assert_eq!(coarse.max_beam_columns, fine.max_beam_columns);
    }

    #[test]
    fn bad_grid_reports_every_error() {
        let cfg = GridConfig {
            cell_size: 0.0,
            max_ray_steps: 0,
            max_beam_columns: 0,
        };
        let errors = cfg.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ConfigError::InvalidCellSize(0.0)));
        assert!(errors.contains(&ConfigError::ZeroRaySteps));
        assert!(errors.contains(&ConfigError::ZeroBeamColumns));
    }

    #[test]
    fn nan_cell_size_rejected() {
        let cfg = GridConfig::with_cell_size(f32::NAN);
        assert_eq!(cfg.validate().len(), 1);
    }

    #[test]
    fn bad_collision_tuning() {
        let cfg = CollisionConfig {
            restitution: 1.5,
            velocity_damping: 0.0,
            min_damage_speed: 2000.0,
            max_overlap_pairs: 0,
            ..CollisionConfig::default()
        };
        let errors = cfg.validate();
        assert!(errors.contains(&ConfigError::RestitutionOutOfRange(1.5)));
        assert!(errors.contains(&ConfigError::DampingOutOfRange(0.0)));
        assert!(errors.contains(&ConfigError::ZeroOverlapPairs));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::DamageSpeedRange { .. })));
    }

    #[test]
    fn error_messages_are_readable() {
        let msg = ConfigError::RestitutionOutOfRange(2.0).to_string();
        assert!(msg.contains("restitution"), "{msg}");
    }
}
