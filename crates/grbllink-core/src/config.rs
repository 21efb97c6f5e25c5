//! Controller configuration
//!
//! Timing and link parameters for a controller session. Stored as JSON and
//! validated on load.

use crate::error::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default serial link speed
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Link and timing parameters for a controller session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Baud rate used when none is supplied to `connect`
    pub baud_rate: u32,
    /// Delay after a soft reset before the banner is read
    pub settle_ms: u64,
    /// Window for capturing the startup banner
    pub banner_read_ms: u64,
    /// Window for draining the reboot banner after `soft_reset`
    pub reset_drain_ms: u64,
    /// Default wait for a queued command
    pub command_timeout_ms: u64,
    /// Wait for the homing cycle
    pub homing_timeout_ms: u64,
    /// Wait for `$X` and setting writes
    pub quick_timeout_ms: u64,
    /// Wait for a status frame
    pub status_timeout_ms: u64,
    /// Ceiling for collecting a `$$` listing
    pub settings_timeout_ms: u64,
    /// Per-read slice inside wait loops
    pub line_poll_ms: u64,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            settle_ms: 2000,
            banner_read_ms: 1000,
            reset_drain_ms: 500,
            command_timeout_ms: 5000,
            homing_timeout_ms: 30_000,
            quick_timeout_ms: 2000,
            status_timeout_ms: 500,
            settings_timeout_ms: 5000,
            line_poll_ms: 500,
            event_capacity: 64,
        }
    }
}

impl ControllerConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle window as a [`Duration`]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Load config from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded controller config from {}", path.display());
        Ok(config)
    }

    /// Save config to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(invalid("baud_rate", "must be > 0"));
        }

        let timeouts = [
            ("banner_read_ms", self.banner_read_ms),
            ("reset_drain_ms", self.reset_drain_ms),
            ("command_timeout_ms", self.command_timeout_ms),
            ("homing_timeout_ms", self.homing_timeout_ms),
            ("quick_timeout_ms", self.quick_timeout_ms),
            ("status_timeout_ms", self.status_timeout_ms),
            ("settings_timeout_ms", self.settings_timeout_ms),
            ("line_poll_ms", self.line_poll_ms),
        ];
        if let Some((key, _)) = timeouts.iter().find(|(_, ms)| *ms == 0) {
            return Err(invalid(key, "timeout must be > 0"));
        }

        if self.event_capacity == 0 {
            return Err(invalid("event_capacity", "must be > 0"));
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.settle(), Duration::from_secs(2));
        assert_eq!(config.command_timeout_ms, 5000);
        assert_eq!(config.homing_timeout_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_settle_is_allowed() {
        let config = ControllerConfig {
            settle_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ControllerConfig {
            status_timeout_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("status_timeout_ms"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.json");

        let config = ControllerConfig {
            baud_rate: 57_600,
            settle_ms: 1500,
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = ControllerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "settle_ms": 250 }"#).unwrap();

        let loaded = ControllerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.settle_ms, 250);
        assert_eq!(loaded.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_invalid_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ControllerConfig::load_from_file(&path),
            Err(Error::Json(_))
        ));
    }
}
