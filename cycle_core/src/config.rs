//! Configuration file support for Cyclefit.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/cyclefit/config.toml`.

use crate::{Error, Result, DEFAULT_CYCLE_LENGTH, MAX_CYCLE_LENGTH, MIN_CYCLE_LENGTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub user: UserConfig,

    #[serde(default)]
    pub cycle: CycleConfig,

    #[serde(default)]
    pub rewards: RewardsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Identity used for locally stored cycle records
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub id: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
        }
    }
}

/// Cycle defaults applied when a profile omits a value
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleConfig {
    #[serde(default = "default_cycle_length")]
    pub default_length: u32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            default_length: default_cycle_length(),
        }
    }
}

/// Points awarded for completed recommendations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_workout_points")]
    pub workout_points: u32,

    #[serde(default = "default_nutrition_points")]
    pub nutrition_points: u32,

    #[serde(default = "default_recovery_points")]
    pub recovery_points: u32,

    /// Extra points when the activity is the current phase's focus
    #[serde(default = "default_phase_bonus")]
    pub phase_bonus: u32,

    #[serde(default = "default_points_per_level")]
    pub points_per_level: u32,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            workout_points: default_workout_points(),
            nutrition_points: default_nutrition_points(),
            recovery_points: default_recovery_points(),
            phase_bonus: default_phase_bonus(),
            points_per_level: default_points_per_level(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("cyclefit")
}

fn default_user_id() -> String {
    "local".into()
}

fn default_cycle_length() -> u32 {
    DEFAULT_CYCLE_LENGTH
}

fn default_workout_points() -> u32 {
    20
}

fn default_nutrition_points() -> u32 {
    10
}

fn default_recovery_points() -> u32 {
    10
}

fn default_phase_bonus() -> u32 {
    5
}

fn default_points_per_level() -> u32 {
    100
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the rest of the system cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(MIN_CYCLE_LENGTH..=MAX_CYCLE_LENGTH).contains(&self.cycle.default_length) {
            return Err(Error::Config(format!(
                "cycle.default_length must be between {} and {}, got {}",
                MIN_CYCLE_LENGTH, MAX_CYCLE_LENGTH, self.cycle.default_length
            )));
        }
        if self.rewards.points_per_level == 0 {
            return Err(Error::Config(
                "rewards.points_per_level must be positive".into(),
            ));
        }
        if self.user.id.trim().is_empty() {
            return Err(Error::Config("user.id must not be empty".into()));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("cyclefit").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
