//! Configuration file support for medcheck.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/medcheck/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub store: StoreConfig,
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

/// Locations of the record files, relative to the data directory
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_people_file")]
    pub people_file: PathBuf,

    #[serde(default = "default_medicines_file")]
    pub medicines_file: PathBuf,

    /// Archived dose events
    #[serde(default = "default_doses_file")]
    pub doses_file: PathBuf,

    /// Append-only log of newly recorded doses
    #[serde(default = "default_dose_log_file")]
    pub dose_log_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            people_file: default_people_file(),
            medicines_file: default_medicines_file(),
            doses_file: default_doses_file(),
            dose_log_file: default_dose_log_file(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("medcheck")
}

fn default_people_file() -> PathBuf {
    PathBuf::from("people.csv")
}

fn default_medicines_file() -> PathBuf {
    PathBuf::from("medicines.csv")
}

fn default_doses_file() -> PathBuf {
    PathBuf::from("doses.csv")
}

fn default_dose_log_file() -> PathBuf {
    PathBuf::from("wal/doses.wal")
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let base = match dirs::config_dir() {
            Some(dir) => dir,
            None => std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .ok_or_else(|| Error::Config("HOME environment variable not set".into()))?,
        };
        Ok(base.join("medcheck").join("config.toml"))
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
