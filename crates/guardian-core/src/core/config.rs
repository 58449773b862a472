// crates/guardian-core/src/core/config.rs
// ============================================================================
// Module: Runtime Configuration
// Description: Scheduler intervals and per-camera defaults, loadable from
// TOML.
// Purpose: Give deployments a single file to tune cadence and default
// policy without touching code.
// Dependencies: crate::core::camera, serde, toml
// ============================================================================

//! ## Overview
//! `RuntimeConfig` is the one place scheduler cadence (spec.md §4.7) and
//! the defaults handed to newly registered cameras are declared. Loading
//! fails closed: an oversized or malformed file is rejected rather than
//! silently falling back to defaults.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::camera::CameraConfig;
use crate::core::camera::NotificationPolicy;

/// Maximum accepted configuration file size, in bytes.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Errors loading a [`RuntimeConfig`] from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// The file exceeds [`MAX_CONFIG_FILE_SIZE`].
    #[error("config file too large: {0} bytes")]
    TooLarge(u64),
    /// The file is not valid TOML for this schema.
    #[error("config parse error: {0}")]
    Parse(String),
}

/// Scheduler cadence and per-camera defaults (spec.md §4.7/§4.8).
///
/// # Invariants
/// - All interval fields are `>= 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Seconds between `warehouse_flush` scheduler ticks.
    #[serde(default = "default_warehouse_flush_interval_s")]
    pub warehouse_flush_interval_s: u64,
    /// Seconds between `config_optimization` scheduler ticks.
    #[serde(default = "default_config_optimization_interval_s")]
    pub config_optimization_interval_s: u64,
    /// Seconds between severity-ticker recomputations.
    #[serde(default = "default_severity_tick_interval_s")]
    pub severity_tick_interval_s: u64,
    /// Capacity of the bounded, drop-oldest warehouse flush buffer.
    #[serde(default = "default_timeline_buffer_capacity")]
    pub timeline_buffer_capacity: usize,
    /// Default notification policy assigned to newly registered cameras.
    #[serde(default)]
    pub default_notification_policy: NotificationPolicy,
    /// Default recognized-config mapping assigned to newly registered cameras.
    #[serde(default)]
    pub default_camera_config: CameraConfig,
}

const fn default_warehouse_flush_interval_s() -> u64 {
    10
}

const fn default_config_optimization_interval_s() -> u64 {
    300
}

const fn default_severity_tick_interval_s() -> u64 {
    1
}

const fn default_timeline_buffer_capacity() -> usize {
    10_000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            warehouse_flush_interval_s: default_warehouse_flush_interval_s(),
            config_optimization_interval_s: default_config_optimization_interval_s(),
            severity_tick_interval_s: default_severity_tick_interval_s(),
            timeline_buffer_capacity: default_timeline_buffer_capacity(),
            default_notification_policy: NotificationPolicy::default(),
            default_camera_config: CameraConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Loads a [`RuntimeConfig`] from a TOML file, failing closed on an
    /// oversized or malformed file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, exceeds
    /// [`MAX_CONFIG_FILE_SIZE`], or fails to parse against this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let metadata = fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge(metadata.len()));
        }
        let raw = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        toml::from_str(&raw).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use super::RuntimeConfig;

    #[test]
    fn defaults_match_spec_cadence() {
        let config = RuntimeConfig::default();
        assert_eq!(config.warehouse_flush_interval_s, 10);
        assert_eq!(config.config_optimization_interval_s, 300);
        assert_eq!(config.severity_tick_interval_s, 1);
        assert_eq!(config.timeline_buffer_capacity, 10_000);
    }

    #[test]
    fn partial_toml_fills_in_remaining_defaults() {
        let parsed: RuntimeConfig = toml::from_str("warehouse_flush_interval_s = 20\n").expect("valid toml");
        assert_eq!(parsed.warehouse_flush_interval_s, 20);
        assert_eq!(parsed.config_optimization_interval_s, 300);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result: Result<RuntimeConfig, _> = toml::from_str("not_a_real_field = 1\n");
        assert!(result.is_err());
    }
}
