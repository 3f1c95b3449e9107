//! Synchronization configuration
//!
//! ```rust
//! use filterlink_remote::SyncConfig;
//!
//! let config = SyncConfig::from_json_str(r#"{"topic_root": "rt/d415"}"#).unwrap();
//! assert_eq!(config.control_topic(), "rt/d415/control");
//! assert_eq!(config.notification_capacity, 64);
//!
//! let offline = SyncConfig::new().offline_fallback(true);
//! assert!(offline.offline_fallback);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default prefix of all filter topics
pub const DEFAULT_TOPIC_ROOT: &str = "rt/device";

/// Default bound of the inbound notification channel
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 64;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Topic root must not be empty")]
    EmptyTopicRoot,

    #[error("Notification capacity must be at least 1")]
    ZeroCapacity,
}

/// How a sensor talks to its device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Prefix of the control and notification topics
    pub topic_root: String,
    /// Inbound notifications buffered before delivery blocks
    pub notification_capacity: usize,
    /// Build offline filters when no transport is wired
    pub offline_fallback: bool,
}

impl SyncConfig {
    /// Create configuration with defaults
    pub fn new() -> Self {
        Self {
            topic_root: DEFAULT_TOPIC_ROOT.to_string(),
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            offline_fallback: false,
        }
    }

    /// Load from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the topic prefix
    pub fn topic_root(mut self, root: impl Into<String>) -> Self {
        self.topic_root = root.into();
        self
    }

    /// Set the notification channel bound
    pub fn notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Fall back to offline filters without a transport
    pub fn offline_fallback(mut self, enabled: bool) -> Self {
        self.offline_fallback = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic_root.trim_matches('/').is_empty() {
            return Err(ConfigError::EmptyTopicRoot);
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Topic carrying options updates and queries to the device
    pub fn control_topic(&self) -> String {
        format!("{}/control", self.root())
    }

    /// Topic carrying device-originated changes
    pub fn notification_topic(&self) -> String {
        format!("{}/notification", self.root())
    }

    fn root(&self) -> &str {
        self.topic_root.trim_end_matches('/')
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = SyncConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SyncConfig::new());
        assert_eq!(config.notification_topic(), "rt/device/notification");
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let config = SyncConfig::new().topic_root("rt/cam/");
        assert_eq!(config.control_topic(), "rt/cam/control");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            SyncConfig::from_json_str(r#"{"topic_root": "/"}"#),
            Err(ConfigError::EmptyTopicRoot)
        ));
        assert!(matches!(
            SyncConfig::from_json_str(r#"{"notification_capacity": 0}"#),
            Err(ConfigError::ZeroCapacity)
        ));
        assert!(matches!(
            SyncConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
