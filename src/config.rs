//! Configuration module for monitor tunables.
//!
//! Holds the active [`MonitorConfig`], the field-level [`ConfigUpdate`]
//! used for partial merges, and a file-backed [`ConfigManager`].

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Tunable parameters for the degradation controller.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Degrade when completed-window FPS stays below this value.
    pub fps_threshold: f64,
    /// Fraction of the original particle count kept while degraded.
    pub particle_reduction_factor: f64,
    /// Gesture polling interval used while degraded, in milliseconds.
    pub gesture_detection_interval_ms: u64,
    /// Consecutive qualifying windows required for an automatic transition.
    pub debounce_windows: u32,
}

impl MonitorConfig {
    pub const DEFAULT_FPS_THRESHOLD: f64 = 30.0;
    pub const DEFAULT_PARTICLE_REDUCTION_FACTOR: f64 = 0.5;
    pub const DEFAULT_GESTURE_DETECTION_INTERVAL_MS: u64 = 100;
    pub const DEFAULT_DEBOUNCE_WINDOWS: u32 = 3;

    /// Multiplier applied to `fps_threshold` to get the restore threshold.
    pub const RESTORE_MULTIPLIER: f64 = 1.5;

    /// FPS that must be exceeded before a degraded monitor recovers.
    pub fn restore_threshold(&self) -> f64 {
        self.fps_threshold * Self::RESTORE_MULTIPLIER
    }

    /// Validate configuration values.
    ///
    /// The monitor applies whatever it is given; this check is only
    /// enforced where configuration enters from a file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fps_threshold.is_finite() || self.fps_threshold <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "fps_threshold ({}) must be a positive number",
                self.fps_threshold
            )));
        }

        if !(self.particle_reduction_factor > 0.0 && self.particle_reduction_factor <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "particle_reduction_factor ({}) must be in (0, 1]",
                self.particle_reduction_factor
            )));
        }

        if self.gesture_detection_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "gesture_detection_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.debounce_windows == 0 {
            return Err(ConfigError::ValidationError(
                "debounce_windows must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            fps_threshold: Self::DEFAULT_FPS_THRESHOLD,
            particle_reduction_factor: Self::DEFAULT_PARTICLE_REDUCTION_FACTOR,
            gesture_detection_interval_ms: Self::DEFAULT_GESTURE_DETECTION_INTERVAL_MS,
            debounce_windows: Self::DEFAULT_DEBOUNCE_WINDOWS,
        }
    }
}

/// Partial configuration. `None` fields leave the current value untouched.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particle_reduction_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesture_detection_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_windows: Option<u32>,
}

impl ConfigUpdate {
    pub fn fps_threshold(mut self, value: f64) -> Self {
        self.fps_threshold = Some(value);
        self
    }

    pub fn particle_reduction_factor(mut self, value: f64) -> Self {
        self.particle_reduction_factor = Some(value);
        self
    }

    pub fn gesture_detection_interval_ms(mut self, value: u64) -> Self {
        self.gesture_detection_interval_ms = Some(value);
        self
    }

    pub fn debounce_windows(mut self, value: u32) -> Self {
        self.debounce_windows = Some(value);
        self
    }

    /// Override each field of `base` that is set in this update.
    pub fn apply(&self, base: MonitorConfig) -> MonitorConfig {
        MonitorConfig {
            fps_threshold: self.fps_threshold.unwrap_or(base.fps_threshold),
            particle_reduction_factor: self
                .particle_reduction_factor
                .unwrap_or(base.particle_reduction_factor),
            gesture_detection_interval_ms: self
                .gesture_detection_interval_ms
                .unwrap_or(base.gesture_detection_interval_ms),
            debounce_windows: self.debounce_windows.unwrap_or(base.debounce_windows),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<MonitorConfig> for ConfigUpdate {
    fn from(config: MonitorConfig) -> Self {
        Self {
            fps_threshold: Some(config.fps_threshold),
            particle_reduction_factor: Some(config.particle_reduction_factor),
            gesture_detection_interval_ms: Some(config.gesture_detection_interval_ms),
            debounce_windows: Some(config.debounce_windows),
        }
    }
}

/// Configuration manager with file I/O.
///
/// The file holds a [`ConfigUpdate`], so any subset of fields may be
/// present; missing ones fall back to defaults.
pub struct ConfigManager {
    config: MonitorConfig,
    path: PathBuf,
}

impl ConfigManager {
    /// Load configuration from file or use defaults.
    /// If the file doesn't exist, returns a manager with default config.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path).map_err(|e| {
                ConfigError::ParseError(format!("Failed to read config file: {}", e))
            })?;

            let update: ConfigUpdate = serde_json::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(format!("Invalid JSON: {}", e)))?;

            let config = update.apply(MonitorConfig::default());
            config.validate()?;
            config
        } else {
            MonitorConfig::default()
        };

        Ok(Self {
            config,
            path: path.to_path_buf(),
        })
    }

    /// Save configuration to file using atomic write.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&self.config)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {}", e)))?;

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    /// Get current configuration.
    pub fn get(&self) -> MonitorConfig {
        self.config
    }

    /// Merge `update` over the current configuration, validate, and persist.
    pub fn update(&mut self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let merged = update.apply(self.config);
        merged.validate()?;
        self.config = merged;
        self.save()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the default config path (~/.config/adaptive-perf-monitor/config.json).
    pub fn default_path() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("adaptive-perf-monitor")
                .join("config.json")
        } else {
            PathBuf::from("/tmp/adaptive-perf-monitor/config.json")
        }
    }
}
