//! Configuration module for scenelock.

use crate::error::{Result, SceneLockError};
use crate::resilience::RetryConfig;
use crate::types::{is_sentinel, SERVER_OWNER};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Main configuration for a scenelock server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneLockConfig {
    /// RPC server configuration.
    pub server: ServerConfig,
    /// Lock manager configuration.
    pub lock: LockConfig,
    /// Observability configuration.
    pub observability: ObservabilityConfig,
}

impl SceneLockConfig {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SceneLockError::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            SceneLockError::Config(format!("Failed to parse config: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.lock.retry.max_attempts == 0 {
            return Err(SceneLockError::InvalidConfig {
                field: "lock.retry.max_attempts".to_string(),
                reason: "At least one attempt is required".to_string(),
            });
        }

        let owner = self.lock.server_owner.trim();
        if owner.is_empty() {
            return Err(SceneLockError::InvalidConfig {
                field: "lock.server_owner".to_string(),
                reason: "Server owner must not be empty".to_string(),
            });
        }
        if is_sentinel(owner) {
            return Err(SceneLockError::InvalidConfig {
                field: "lock.server_owner".to_string(),
                reason: format!("{} is a reserved object id", owner),
            });
        }

        if self.observability.metrics_enabled
            && self.observability.metrics_addr == self.server.bind_addr
        {
            return Err(SceneLockError::InvalidConfig {
                field: "observability.metrics_addr".to_string(),
                reason: "Metrics and RPC servers cannot share an address".to_string(),
            });
        }

        Ok(())
    }

    /// Create a local development configuration.
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: SocketAddr::from(([127, 0, 0, 1], 6789)),
            },
            lock: LockConfig {
                retry: RetryConfig::quick(),
                server_owner: SERVER_OWNER.to_string(),
            },
            observability: ObservabilityConfig {
                metrics_enabled: false,
                metrics_addr: SocketAddr::from(([127, 0, 0, 1], 9090)),
                log_level: "debug".to_string(),
                json_logs: false,
            },
        }
    }
}

/// RPC server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the RPC server.
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 6789)),
        }
    }
}

/// Lock manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Retry policy of lock RPCs.
    pub retry: RetryConfig,
    /// Owner used for locks the server takes on its own behalf.
    pub server_owner: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            server_owner: SERVER_OWNER.to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics.
    pub metrics_enabled: bool,
    /// Metrics bind address.
    pub metrics_addr: SocketAddr,
    /// Log level.
    pub log_level: String,
    /// Enable JSON logging.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Serde helper for durations written as `250ms`, `2s`, `1m` or bare
/// milliseconds. Serializes to milliseconds.
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_duration(raw: &str) -> Result<Duration, String> {
        let raw = raw.trim();
        let (digits, millis_per_unit) = if let Some(v) = raw.strip_suffix("ms") {
            (v, 1)
        } else if let Some(v) = raw.strip_suffix('s') {
            (v, 1_000)
        } else if let Some(v) = raw.strip_suffix('m') {
            (v, 60_000)
        } else {
            (raw, 1)
        };

        let value: u64 = digits
            .trim()
            .parse()
            .map_err(|e| format!("invalid duration {:?}: {}", raw, e))?;
        value
            .checked_mul(millis_per_unit)
            .map(Duration::from_millis)
            .ok_or_else(|| format!("duration {:?} is out of range", raw))
    }
}
