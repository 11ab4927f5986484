//! Combat configuration
//!
//! Timing and action-budget knobs for fights, loaded from a RON file with
//! fallback to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name looked up in the platform config directory
pub const CONFIG_FILE: &str = "combat.ron";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("invalid combat config: {0}")]
    Invalid(&'static str),
}

/// Fight timing and budgets. All durations are in time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Countdown length of each turn
    pub turn_timeout: u32,
    /// Actions granted at the start of each turn
    pub actions_per_turn: u32,
    /// Time units between timer ticks
    pub tick_interval: u32,
    /// Time left at which the acting fighter is warned, once per turn
    pub timeout_warning_threshold: u32,
    /// Real length of one time unit, in milliseconds
    pub time_unit_ms: u64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            turn_timeout: 30,
            actions_per_turn: 1,
            tick_interval: 5,
            timeout_warning_threshold: 10,
            time_unit_ms: 1000,
        }
    }
}

impl CombatConfig {
    /// Reject settings a fight can't run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_timeout == 0 {
            return Err(ConfigError::Invalid("turn_timeout must be positive"));
        }
        if self.tick_interval == 0 {
            return Err(ConfigError::Invalid("tick_interval must be positive"));
        }
        if self.actions_per_turn == 0 {
            return Err(ConfigError::Invalid("actions_per_turn must be positive"));
        }
        Ok(())
    }

    /// Parse and validate a RON document
    pub fn from_ron(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&content, path)
    }

    /// Load from a RON file, using defaults if it's missing or broken
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::info!("No combat config at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                log::info!("Combat config loaded from {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("{}. Using default combat config.", e);
                Self::default()
            }
        }
    }

    /// `combat.ron` in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "turnbattle").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CombatConfig::default();
        assert_eq!(config.turn_timeout, 30);
        assert_eq!(config.actions_per_turn, 1);
        assert_eq!(config.tick_interval, 5);
        assert_eq!(config.timeout_warning_threshold, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config =
            CombatConfig::from_ron("(turn_timeout: 60, actions_per_turn: 2)", Path::new("test.ron"))
                .unwrap();
        assert_eq!(config.turn_timeout, 60);
        assert_eq!(config.actions_per_turn, 2);
        assert_eq!(config.tick_interval, 5);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = CombatConfig::from_ron("(tick_interval: 0)", Path::new("test.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = CombatConfig::load_or_default(Path::new("definitely/not/here.ron"));
        assert_eq!(config, CombatConfig::default());
    }
}
