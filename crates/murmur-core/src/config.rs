//! TOML-based application configuration.
//!
//! Stores the externally tunable engine constants:
//! - Cool-down window and tick interval
//! - Geofence radius default and bounds
//! - Notification channel settings
//!
//! Configuration is stored at `~/.config/murmur/config.toml`. The engine
//! consumes these values as read-only parameters at construction time.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::storage::data_dir;

/// Engine timing and retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum seconds between successive fires of the same condition.
    #[serde(default = "default_cool_down_secs")]
    pub cool_down_secs: u64,
    /// Clock heartbeat interval; also the worst-case deadline fire latency.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Escalate to the error reporter after this many consecutive dispatch
    /// failures for one condition. 0 means unlimited (never escalate).
    #[serde(default)]
    pub max_consecutive_dispatch_failures: u32,
}

/// Geofence radius configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceConfig {
    #[serde(default = "default_radius_m")]
    pub default_radius_m: f64,
    #[serde(default = "default_min_radius_m")]
    pub min_radius_m: f64,
    #[serde(default = "default_max_radius_m")]
    pub max_radius_m: f64,
    /// Minimum movement between position fixes requested from the host.
    #[serde(default = "default_distance_interval_m")]
    pub distance_interval_m: f64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_notification_title")]
    pub title: String,
    #[serde(default = "default_channel_id")]
    pub channel_id: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/murmur/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub geofence: GeofenceConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_cool_down_secs() -> u64 {
    3600
}
fn default_tick_interval_secs() -> u64 {
    60
}
fn default_radius_m() -> f64 {
    150.0
}
fn default_min_radius_m() -> f64 {
    50.0
}
fn default_max_radius_m() -> f64 {
    500.0
}
fn default_distance_interval_m() -> f64 {
    50.0
}
fn default_true() -> bool {
    true
}
fn default_notification_title() -> String {
    "Murmur Reminder".into()
}
fn default_channel_id() -> String {
    "murmur-reminders".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cool_down_secs: default_cool_down_secs(),
            tick_interval_secs: default_tick_interval_secs(),
            max_consecutive_dispatch_failures: 0,
        }
    }
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            default_radius_m: default_radius_m(),
            min_radius_m: default_min_radius_m(),
            max_radius_m: default_max_radius_m(),
            distance_interval_m: default_distance_interval_m(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: default_notification_title(),
            channel_id: default_channel_id(),
        }
    }
}

impl Config {
    /// Path to the config file inside the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/murmur"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, falling back to defaults when the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Config =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geofence.min_radius_m > self.geofence.max_radius_m {
            return Err(ConfigError::InvalidValue {
                key: "geofence.min_radius_m".into(),
                message: format!(
                    "min radius {} exceeds max radius {}",
                    self.geofence.min_radius_m, self.geofence.max_radius_m
                ),
            });
        }
        if self.engine.tick_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "engine.tick_interval_secs".into(),
                message: "tick interval must be at least one second".into(),
            });
        }
        Ok(())
    }

    pub fn cool_down(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.engine.cool_down_secs as i64)
    }
}
