//! Configuration for the event extractor.

use crate::export::ExportConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Number of labeled events in the reference dataset snapshot.
///
/// Used as the default progress denominator. It is not derived from the
/// loaded catalog, so override it when working with a different snapshot.
pub const DEFAULT_TOTAL_EXPECTED_EVENTS: u64 = 1554;

/// Samples per second of the source recordings.
pub const DEFAULT_SAMPLING_RATE: u32 = 6400;

/// Main configuration for the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one partition per recorded day
    pub base_path: PathBuf,

    /// Event table (ID, Date, Timestamp, Component)
    pub metadata_path: PathBuf,

    /// Directory receiving one `<id>.csv` per event
    pub output_dir: PathBuf,

    /// Progress denominator
    pub total_expected_events: u64,

    /// Length of the window extracted per event
    #[serde(with = "duration_serde")]
    pub window_duration: Duration,

    /// Samples per second in the day partitions
    pub sampling_rate: u32,

    /// File extension of day partitions
    pub partition_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = Self::default_data_dir();

        Self {
            base_path: data_dir.join("days"),
            metadata_path: data_dir.join("events.csv"),
            output_dir: data_dir.join("component_events"),
            total_expected_events: DEFAULT_TOTAL_EXPECTED_EVENTS,
            window_duration: Duration::from_secs(10),
            sampling_rate: DEFAULT_SAMPLING_RATE,
            partition_extension: "csv".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("event-extract")
            .join("config.json")
    }

    /// Default root for source data and exports.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("event-extract")
    }

    /// Ensure the output directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Settings handed to the exporter.
    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            base_path: self.base_path.clone(),
            output_dir: self.output_dir.clone(),
            total_expected_events: self.total_expected_events,
            window_duration: self.window_duration,
            partition_extension: self.partition_extension.clone(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(serde_json::Error),

    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
