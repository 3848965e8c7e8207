//! # Configuration System
//!
//! YAML configuration for the occupancy engine:
//!
//! - Noise floor percentile
//! - Manual threshold and auto-margin operating ranges
//! - License matching tolerance and candidate window
//! - Anomaly rule margins and the band allocation table
//! - Result sizing, peak detection and logging
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `SPECMON_CONFIG` environment variable
//! 2. `./specmon.yaml` (current directory)
//! 3. `~/.config/specmon/config.yaml` (user config)
//! 4. `/etc/specmon/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! noise_floor:
//!   percentile: 0.1
//!
//! threshold:
//!   manual_min: 30.0
//!   manual_max: 70.0
//!
//! matcher:
//!   default_tolerance_mhz: 0.0125
//!
//! allocations:
//!   - service: "FM BROADCAST"
//!     start_freq: 87.5
//!     stop_freq: 108.0
//! ```

use crate::analysis::anomaly::BandAllocation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "SPECMON_CONFIG";

/// Error type for configuration operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to read or write a configuration file
    #[error("failed to read config: {0}")]
    ReadError(String),
    /// Failed to parse configuration
    #[error("failed to parse config: {0}")]
    ParseError(String),
    /// Invalid configuration value
    #[error("invalid config: {0}")]
    ValidationError(String),
}

/// Noise floor estimation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseFloorConfig {
    /// Fraction of the quietest channels whose median forms the floor
    pub percentile: f64,
}

impl Default for NoiseFloorConfig {
    fn default() -> Self {
        Self { percentile: 0.10 }
    }
}

/// Threshold operating ranges (all inclusive).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Lowest accepted manual threshold in dBµV/m
    pub manual_min: f64,
    /// Highest accepted manual threshold in dBµV/m
    pub manual_max: f64,
    /// Lowest accepted auto margin in dB
    pub margin_min: f64,
    /// Highest accepted auto margin in dB
    pub margin_max: f64,
    /// Margin used when the caller asks for auto mode without one
    pub default_margin_db: f64,
    /// Threshold used when the caller asks for manual mode without one
    pub default_threshold: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            manual_min: 30.0,
            manual_max: 70.0,
            margin_min: 5.0,
            margin_max: 20.0,
            default_margin_db: 10.0,
            default_threshold: 50.0,
        }
    }
}

/// License matching settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatcherConfig {
    /// Fixed tolerance in MHz; overrides the per-band derivation when set
    pub tolerance_mhz: Option<f64>,
    /// Tolerance used when a band has no usable channel step
    pub default_tolerance_mhz: f64,
    /// Half-width of the registry pre-filter window in MHz
    pub candidate_window_mhz: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            tolerance_mhz: None,
            default_tolerance_mhz: 0.0125,
            candidate_window_mhz: 0.1,
        }
    }
}

/// Anomaly rule settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Margin above the threshold that makes an unlicensed signal high-power
    pub high_power_margin_db: f64,
    /// Average level above which any occupied channel is unusually strong
    pub strong_signal_dbuv: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            high_power_margin_db: 30.0,
            strong_signal_dbuv: 80.0,
        }
    }
}

/// Result assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResultConfig {
    /// Length cap of the ranked top-signal list
    pub top_signals: usize,
}

impl Default for ResultConfig {
    fn default() -> Self {
        Self { top_signals: 20 }
    }
}

/// Emission peak detection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PeakConfig {
    /// Minimum height above the surrounding valleys in dB
    pub prominence_db: f64,
    /// Minimum spacing between reported peaks in channels
    pub min_distance: usize,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            prominence_db: 3.0,
            min_distance: 3,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SpecmonConfig {
    pub noise_floor: NoiseFloorConfig,
    pub threshold: ThresholdConfig,
    pub matcher: MatcherConfig,
    pub anomaly: AnomalyConfig,
    pub result: ResultConfig,
    pub peaks: PeakConfig,
    /// Band allocation table used for out-of-band detection
    pub allocations: Vec<BandAllocation>,
    pub logging: LogConfig,
}

impl SpecmonConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if Path::new(&path).exists() {
                return Self::load_from(Path::new(&path));
            }
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_yaml()?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.noise_floor.percentile;
        if !(p > 0.0 && p <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "noise_floor.percentile {} must be in (0, 1]",
                p
            )));
        }

        let t = &self.threshold;
        if !(t.manual_min <= t.manual_max) {
            return Err(ConfigError::ValidationError(format!(
                "threshold.manual_min {} exceeds manual_max {}",
                t.manual_min, t.manual_max
            )));
        }
        if !(t.margin_min <= t.margin_max) {
            return Err(ConfigError::ValidationError(format!(
                "threshold.margin_min {} exceeds margin_max {}",
                t.margin_min, t.margin_max
            )));
        }

        let m = &self.matcher;
        if let Some(tol) = m.tolerance_mhz {
            if !(tol > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "matcher.tolerance_mhz {} must be positive",
                    tol
                )));
            }
        }
        if !(m.default_tolerance_mhz > 0.0) || !(m.candidate_window_mhz > 0.0) {
            return Err(ConfigError::ValidationError(
                "matcher tolerances must be positive".to_string(),
            ));
        }

        for alloc in &self.allocations {
            if !(alloc.start_freq < alloc.stop_freq) {
                return Err(ConfigError::ValidationError(format!(
                    "allocation '{}' has inverted range {}..{}",
                    alloc.service, alloc.start_freq, alloc.stop_freq
                )));
            }
        }

        Ok(())
    }

    /// Get configuration search paths.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("specmon.yaml")];
        if let Ok(home) = std::env::var("HOME") {
            paths.push(PathBuf::from(home).join(".config/specmon/config.yaml"));
        }
        paths.push(PathBuf::from("/etc/specmon/config.yaml"));
        paths
    }

    /// Generate an example configuration file.
    pub fn example_yaml() -> String {
        let mut config = Self::default();
        config.allocations.push(BandAllocation::new("FM BROADCAST", 87.5, 108.0));
        serde_yaml::to_string(&config).unwrap_or_default()
    }
}
