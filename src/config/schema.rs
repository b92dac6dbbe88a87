//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bootstrap.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the database bootstrap.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Connection target.
    pub target: TargetConfig,

    /// Failure gate settings.
    pub breaker: BreakerConfig,

    /// Background retry loop settings.
    pub retry: RetryConfig,

    /// Post-connection setup work.
    pub setup: SetupConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Connection target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Database URL handed verbatim to the connection factory.
    pub url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://root@127.0.0.1:26257/defaultdb?sslmode=disable".to_string(),
        }
    }
}

/// Failure gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures tolerated before the cooldown kicks in.
    pub failure_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 4,
        }
    }
}

/// Retry loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Interval between background attempts in seconds.
    pub poll_interval_secs: u64,

    /// Total time budget for the background loop in seconds.
    pub deadline_secs: u64,

    /// Optional per-attempt deadline in seconds. Unset means attempts
    /// run until the driver gives up on its own.
    pub attempt_timeout_secs: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 4,
            deadline_secs: 32,
            attempt_timeout_secs: None,
        }
    }
}

impl RetryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_secs.map(Duration::from_secs)
    }
}

/// Setup work performed once connected.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Run the setup transaction after connecting.
    pub enabled: bool,

    /// Name of the database to create.
    pub database: String,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database: "subjectives".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
