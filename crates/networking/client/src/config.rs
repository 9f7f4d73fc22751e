//! Client sync settings, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid config.
//!
//! ```toml
//! poll_interval_ms = 1
//! disconnected_backoff_ms = 5
//! stats_log_interval_secs = 10
//! player_speed = 5.0
//! worker_threads = 2
//!
//! [spawn]
//! x = 250.0
//! y = 250.0
//! rotation = 0.0
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    entity::{DEFAULT_PLAYER_SPEED, Pose},
    error::ConfigError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Wait between polls when the transport has nothing ready.
    pub poll_interval_ms: u64,
    /// Wait between polls while the transport is not connected.
    pub disconnected_backoff_ms: u64,
    /// Cadence of the trace-level stats dump. 0 disables it.
    pub stats_log_interval_secs: u64,
    pub spawn: SpawnConfig,
    pub player_speed: f32,
    /// Worker threads of the owned runtime. Ignored when started on an existing handle.
    pub worker_threads: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            poll_interval_ms: 1,
            disconnected_backoff_ms: 5,
            stats_log_interval_secs: 10,
            spawn: SpawnConfig::default(),
            player_speed: DEFAULT_PLAYER_SPEED,
            worker_threads: 2,
        }
    }
}

/// Where the local player appears (center of a 500x500 view by default).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        SpawnConfig {
            x: 250.0,
            y: 250.0,
            rotation: 0.0,
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid(
                "worker_threads must be greater than 0".into(),
            ));
        }
        if !self.player_speed.is_finite() || self.player_speed < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "player_speed must be a finite, non-negative number (got {})",
                self.player_speed
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn disconnected_backoff(&self) -> Duration {
        Duration::from_millis(self.disconnected_backoff_ms)
    }

    pub fn stats_log_interval(&self) -> Option<Duration> {
        (self.stats_log_interval_secs > 0).then(|| Duration::from_secs(self.stats_log_interval_secs))
    }

    pub fn spawn_pose(&self) -> Pose {
        Pose::new(self.spawn.x, self.spawn.y, self.spawn.rotation)
    }
}
