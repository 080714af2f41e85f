//! FanoutConfig - Config Loader output
//!
//! Describes the flush clock and which sinks each dispatcher owns.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Service label reported through diagnostics
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Flush clock
    #[serde(default)]
    pub flush: FlushConfig,

    /// Sinks receiving aggregated metrics
    #[serde(default)]
    pub metric_sinks: Vec<SinkConfig>,

    /// Sinks receiving spans
    #[serde(default)]
    pub span_sinks: Vec<SinkConfig>,
}

fn default_service_name() -> String {
    "fanout".to_string()
}

/// Flush clock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushConfig {
    /// Interval between flush cycles
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Deadline for a metric flush; defaults to the interval
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_interval_ms() -> u64 {
    10_000
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: None,
        }
    }
}

impl FlushConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Effective metric flush deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(self.interval_ms))
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// JSON-lines file output
    File,
    /// Discard everything
    Blackhole,
}
