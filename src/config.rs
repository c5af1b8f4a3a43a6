//! Configuration management for the admission gate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::error::{Result, TurnstileError};

/// Behavior when the shared counter store cannot be consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Reject requests while the store is unavailable.
    FailClosed,
    /// Admit requests while the store is unavailable.
    FailOpen,
}

/// Configuration for the admission gate.
///
/// Immutable once the gate is constructed; one configuration applies to all
/// identities under a given gate instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Maximum admitted requests per identity per window
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Request paths that bypass rate limiting entirely
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: HashSet<String>,

    /// Response payload returned when the rate limit is exceeded
    #[serde(default = "default_denial_body")]
    pub denial_body: serde_json::Value,

    /// Response payload returned when the counter store is unavailable
    #[serde(default = "default_unavailable_body")]
    pub unavailable_body: serde_json::Value,

    /// Behavior when the counter store cannot be consulted
    #[serde(default = "default_failure_mode")]
    pub failure_mode: FailureMode,

    /// Timeout for a single counter store round trip, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_secs: default_window_secs(),
            exempt_paths: default_exempt_paths(),
            denial_body: default_denial_body(),
            unavailable_body: default_unavailable_body(),
            failure_mode: default_failure_mode(),
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

fn default_limit() -> u64 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_exempt_paths() -> HashSet<String> {
    let mut paths = HashSet::new();
    paths.insert("/health".to_string());
    paths
}

fn default_denial_body() -> serde_json::Value {
    serde_json::json!({"message": "rate limit exceeded"})
}

fn default_unavailable_body() -> serde_json::Value {
    serde_json::json!({"message": "limiter unavailable"})
}

fn default_failure_mode() -> FailureMode {
    FailureMode::FailClosed
}

fn default_store_timeout_ms() -> u64 {
    1000
}

impl GateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| TurnstileError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Misconfiguration must surface at construction time, never at request time.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(TurnstileError::Config(
                "limit must be a positive integer".to_string(),
            ));
        }
        if self.window_secs == 0 {
            return Err(TurnstileError::Config(
                "window_secs must be a positive duration".to_string(),
            ));
        }
        if self.store_timeout_ms == 0 {
            return Err(TurnstileError::Config(
                "store_timeout_ms must be a positive duration".to_string(),
            ));
        }
        Ok(())
    }

    /// The window length as a duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// The per-round-trip store timeout as a duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
