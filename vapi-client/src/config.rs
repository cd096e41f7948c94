//! Connection configuration
//!
//! All durations are stored as milliseconds so they read naturally in
//! configuration files, and exposed as [`Duration`]s through accessors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ClientError, Result};

/// Settings for establishing and keeping a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Name registered with the forwarding plane
    ///
    /// Default: `vapi-client`
    #[serde(default = "defaults::client_name")]
    pub client_name: String,

    /// Connection attempts made before giving up
    ///
    /// Default: 3
    #[serde(default = "defaults::max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Pause between two connection attempts
    ///
    /// Default: 1000 ms
    #[serde(default = "defaults::reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Timeout for opening the socket and registering the client
    ///
    /// Default: 1000 ms
    #[serde(default = "defaults::connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Timeout for each reply on a channel
    ///
    /// Default: 1000 ms
    #[serde(default = "defaults::reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    #[serde(default)]
    pub health_check: HealthCheckConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            client_name: defaults::client_name(),
            max_reconnect_attempts: defaults::max_reconnect_attempts(),
            reconnect_interval_ms: defaults::reconnect_interval_ms(),
            connect_timeout_ms: defaults::connect_timeout_ms(),
            reply_timeout_ms: defaults::reply_timeout_ms(),
            health_check: HealthCheckConfig::default(),
        }
    }
}

impl ConnectionConfig {
    #[must_use]
    pub const fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    /// Reject settings that would make the connection unusable
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] naming the offending field
    pub fn validate(&self) -> Result<()> {
        if self.max_reconnect_attempts == 0 {
            return Err(ClientError::InvalidConfig(
                "max_reconnect_attempts must be at least 1".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "connect_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.reply_timeout_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "reply_timeout_ms must be non-zero".to_string(),
            ));
        }
        self.health_check.validate()
    }
}

/// Periodic liveness probe of an established connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Default: true
    #[serde(default = "defaults::health_check_enabled")]
    pub enabled: bool,

    /// Interval between two probes
    ///
    /// Default: 1000 ms
    #[serde(default = "defaults::probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Time allowed for a probe reply
    ///
    /// Default: 250 ms
    #[serde(default = "defaults::probe_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    /// Consecutive failed probes after which the connection is dropped
    ///
    /// Default: 1
    #[serde(default = "defaults::probe_threshold")]
    pub threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::health_check_enabled(),
            probe_interval_ms: defaults::probe_interval_ms(),
            reply_timeout_ms: defaults::probe_reply_timeout_ms(),
            threshold: defaults::probe_threshold(),
        }
    }
}

impl HealthCheckConfig {
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    #[must_use]
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.probe_interval_ms == 0 || self.reply_timeout_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "health_check intervals must be non-zero".to_string(),
            ));
        }
        if self.threshold == 0 {
            return Err(ClientError::InvalidConfig(
                "health_check.threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

mod defaults {
    pub fn client_name() -> String {
        "vapi-client".to_string()
    }

    pub const fn max_reconnect_attempts() -> u32 {
        3
    }

    pub const fn reconnect_interval_ms() -> u64 {
        1000
    }

    pub const fn connect_timeout_ms() -> u64 {
        1000
    }

    pub const fn reply_timeout_ms() -> u64 {
        1000
    }

    pub const fn health_check_enabled() -> bool {
        true
    }

    pub const fn probe_interval_ms() -> u64 {
        1000
    }

    pub const fn probe_reply_timeout_ms() -> u64 {
        250
    }

    pub const fn probe_threshold() -> u32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.reconnect_interval(), Duration::from_secs(1));
        assert_eq!(config.reply_timeout(), Duration::from_secs(1));
        assert!(config.health_check.enabled);
        assert_eq!(config.health_check.reply_timeout(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = ConnectionConfig {
            max_reconnect_attempts: 0,
            ..ConnectionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn disabled_health_check_skips_its_validation() {
        let mut config = ConnectionConfig::default();
        config.health_check.threshold = 0;
        assert!(config.validate().is_err());

        config.health_check.enabled = false;
        assert!(config.validate().is_ok());
    }
}
