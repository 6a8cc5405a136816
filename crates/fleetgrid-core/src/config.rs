//! Engine-wide configuration, loadable from JSON.

use fleetgrid_logic::{CollisionConfig, ConfigError, GridConfig};
use serde::{Deserialize, Serialize};

/// Everything the [`CombatEngine`](crate::engine::CombatEngine) can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fine grid holding every block.
    pub block_grid: GridConfig,
    /// Coarse grid holding one entry per ship.
    pub ship_grid: GridConfig,
    pub collision: CollisionConfig,
    /// Global switch; when off, collision passes do nothing.
    pub collisions_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_grid: GridConfig::blocks(),
            ship_grid: GridConfig::ships(),
            collision: CollisionConfig::default(),
            collisions_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigLoadError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigLoadError::Invalid(errors))
        }
    }

    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = self.block_grid.validate();
        errors.extend(self.ship_grid.validate());
        errors.extend(self.collision.validate());
        errors
    }
}

/// Errors from [`EngineConfig::from_json_str`].
#[derive(Debug)]
pub enum ConfigLoadError {
    Parse(serde_json::Error),
    Invalid(Vec<ConfigError>),
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::Parse(e) => write!(f, "config parse error: {}", e),
            ConfigLoadError::Invalid(errors) => {
                write!(f, "invalid config:")?;
                for e in errors {
                    write!(f, " {};", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigLoadError::Parse(e) => Some(e),
            ConfigLoadError::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigLoadError {
    fn from(e: serde_json::Error) -> Self {
        ConfigLoadError::Parse(e)
    }
}
