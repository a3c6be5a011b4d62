use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use snowsense_engine::DeviceConfig;
use snowsense_forecast::Units;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowSenseConfig {
    /// API key from <https://openweathermap.org/api>
    pub api_key: String,

    /// One Call API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// "lat,lon", a five-digit zip, or "city,state,country"
    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default)]
    pub units: Units,

    /// Minimum minutes between upstream forecast calls (engine floors at 5)
    #[serde(default = "default_api_throttle_minutes")]
    pub api_throttle_minutes: u32,

    /// Treat precipitation below this temperature as snow
    #[serde(default)]
    pub cold_precipitation_threshold: Option<f64>,

    /// Only report snowy at or below `cold_temperature_threshold`
    #[serde(default)]
    pub only_when_cold: bool,

    #[serde(default)]
    pub cold_temperature_threshold: Option<f64>,

    /// Directory holding the observation history file
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    #[serde(default = "default_history_file")]
    pub history_file: String,

    /// One entry per snow sensor, each with its own thresholds
    #[serde(default)]
    pub sensors: Vec<DeviceConfig>,
}

fn default_api_version() -> String {
    "2.5".to_string()
}

fn default_location() -> String {
    "New York,NY,US".to_string()
}

fn default_api_throttle_minutes() -> u32 {
    15
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snowsense")
}

fn default_history_file() -> String {
    snowsense_engine::HISTORY_FILE.to_string()
}

impl Default for SnowSenseConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_version: default_api_version(),
            location: default_location(),
            units: Units::default(),
            api_throttle_minutes: default_api_throttle_minutes(),
            cold_precipitation_threshold: None,
            only_when_cold: false,
            cold_temperature_threshold: None,
            storage_path: default_storage_path(),
            history_file: default_history_file(),
            sensors: vec![DeviceConfig {
                display_name: "Is Snowy".to_string(),
                hours_before_snow_is_snowy: 3.0,
                hours_after_snow_is_snowy: 3.0,
                consecutive_hours_future_is_snowy: 0.0,
            }],
        }
    }
}

impl SnowSenseConfig {
    /// Load configuration from the default path, creating a default file if
    /// it doesn't exist.
    ///
    /// # Errors
    ///
    /// IO or TOML parse failures, with context naming the file.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, creating it with defaults
    /// when absent.
    ///
    /// # Errors
    ///
    /// IO or TOML parse failures, with context naming the file.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load and validate; fails on validation errors, returns warnings for
    /// the caller to log.
    ///
    /// # Errors
    ///
    /// Load failures, or a summary of validation errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        Ok((config, validation))
    }

    /// Validate the configuration, separating hard errors from warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.api_key.trim().is_empty() {
            result.add_error("api_key", "An OpenWeatherMap API key is required");
        }

        if self.location.trim().is_empty() {
            result.add_error("location", "Location must not be empty");
        }

        if self.api_throttle_minutes < 5 {
            result.add_warning(
                "api_throttle_minutes",
                "Below the 5 minute floor; the engine will use 5 minutes",
            );
        } else if self.api_throttle_minutes > 1440 {
            result.add_warning(
                "api_throttle_minutes",
                "Forecast refresh interval is more than 24 hours",
            );
        }

        if self.only_when_cold && self.cold_temperature_threshold.is_none() {
            result.add_warning(
                "only_when_cold",
                "Set without cold_temperature_threshold; it will have no effect",
            );
        }

        if self.sensors.is_empty() {
            result.add_warning("sensors", "No sensors configured - nothing will be reported");
        }
        for (i, sensor) in self.sensors.iter().enumerate() {
            if sensor.display_name.trim().is_empty() {
                result.add_error(format!("sensors[{i}].display_name"), "Must not be empty");
            }
        }

        result
    }

    /// Save configuration to a specific file.
    ///
    /// # Errors
    ///
    /// Directory creation, serialization, or write failures.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("snowsense");
        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use tempfile::tempdir;

    fn configured() -> SnowSenseConfig {
        SnowSenseConfig {
            api_key: "test-key".to_string(),
            ..SnowSenseConfig::default()
        }
    }

    #[test]
    fn test_default_config_needs_api_key() {
        let result = SnowSenseConfig::default().validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "api_key"));
    }

    #[test]
    fn test_configured_default_is_valid() {
        let result = configured().validate();
        assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn test_low_throttle_is_a_warning() {
        let mut config = configured();
        config.api_throttle_minutes = 1;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "api_throttle_minutes"));
    }

    #[test]
    fn test_no_sensors_is_a_warning() {
        let mut config = configured();
        config.sensors.clear();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "sensors"));
    }

    #[test]
    fn test_unnamed_sensor_is_an_error() {
        let mut config = configured();
        config.sensors[0].display_name = "  ".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_only_when_cold_without_threshold_warns() {
        let mut config = configured();
        config.only_when_cold = true;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "only_when_cold"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = SnowSenseConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.location, "New York,NY,US");
        assert_eq!(config.api_throttle_minutes, 15);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = configured();
        config.location = "10001".to_string();
        config.cold_precipitation_threshold = Some(32.0);
        config.save_to(&path).unwrap();

        let loaded = SnowSenseConfig::load_from(&path).unwrap();
        assert_eq!(loaded.location, "10001");
        assert_eq!(loaded.cold_precipitation_threshold, Some(32.0));
        assert_eq!(loaded.sensors.len(), 1);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_key = \"abc\"\n").unwrap();

        let config = SnowSenseConfig::load_from(&path).unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.history_file, snowsense_engine::HISTORY_FILE);
        assert!(config.sensors.is_empty());
    }

    #[test]
    fn test_error_summary_joins_fields() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
