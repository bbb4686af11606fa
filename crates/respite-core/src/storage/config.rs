//! TOML-based application configuration.
//!
//! Stores engine knobs and CLI defaults at
//! `~/.config/respite/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::recommend::EngineConfig;

/// Engine-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// How many top-scored candidates become recommendations per day
    #[serde(default = "default_max_per_day")]
    pub max_per_day: usize,
    /// Default preferred break duration for new profiles (minutes)
    #[serde(default = "default_break_duration")]
    pub default_break_duration: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_per_day: default_max_per_day(),
            default_break_duration: default_break_duration(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/respite/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSettings,
    /// Email of the profile the CLI acts as when --user is not given
    #[serde(default)]
    pub default_user: Option<String>,
}

impl Config {
    /// Load configuration from disk, falling back to defaults if the
    /// file is missing or unparseable.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Load configuration from disk.
    pub fn load() -> Option<Self> {
        let path = Self::path().ok()?;
        let contents = std::fs::read_to_string(path).ok()?;
        toml::from_str(&contents).ok()
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::path()?;
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Engine configuration derived from the settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_per_day: self.engine.max_per_day.max(1),
        }
    }
}

fn default_max_per_day() -> usize {
    1
}

fn default_break_duration() -> i64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.engine.max_per_day, 1);
        assert_eq!(config.engine.default_break_duration, 10);
        assert!(config.default_user.is_none());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str("default_user = \"me@example.com\"").unwrap();
        assert_eq!(config.default_user.as_deref(), Some("me@example.com"));
        assert_eq!(config.engine.max_per_day, 1);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = Config::default();
        config.engine.max_per_day = 2;
        config.default_user = Some("me@example.com".to_string());
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.engine.max_per_day, 2);
        assert_eq!(parsed.default_user.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn zero_max_per_day_is_clamped() {
        let mut config = Config::default();
        config.engine.max_per_day = 0;
        assert_eq!(config.engine_config().max_per_day, 1);
    }
}
