//! Configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP endpoint configuration for [`HttpCall`](crate::HttpCall)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Endpoint URL receiving POSTed payloads
    pub endpoint: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl HttpConfig {
    /// Create a config for an endpoint with the default timeout
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Get the request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Scheduling interval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minimum elapsed time between the first call joining a batch and
    /// that batch's dispatch, in milliseconds
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,

    /// Minimum time between successive rate-limited dispatch starts,
    /// in milliseconds
    #[serde(default = "default_rate_interval_ms")]
    pub rate_interval_ms: u64,
}

fn default_batch_interval_ms() -> u64 {
    100
}

fn default_rate_interval_ms() -> u64 {
    500
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            batch_interval_ms: default_batch_interval_ms(),
            rate_interval_ms: default_rate_interval_ms(),
        }
    }
}

impl ScheduleConfig {
    /// Get the batch window as a Duration
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    /// Get the rate interval as a Duration
    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }
}
