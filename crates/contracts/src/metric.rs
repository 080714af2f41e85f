//! Aggregated metric payloads - Aggregator output
//!
//! Values produced once per flush interval and shared read-only by every metric sink.

use serde::{Deserialize, Serialize};

/// Kind of aggregated value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Monotonic count over the interval
    Counter,
    /// Last observed value
    Gauge,
    /// Service status value
    Status,
}

/// A finalized metric ready to be sunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterMetric {
    /// Metric name
    pub name: String,

    /// Unix timestamp (seconds) of the flush that produced the value
    pub timestamp: i64,

    /// Aggregated value
    pub value: f64,

    /// `key:value` tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Value kind
    pub metric_type: MetricType,

    /// Free-form message (status metrics only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Reporting host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
}

impl InterMetric {
    /// Create a metric with no tags, message or host
    pub fn new(
        name: impl Into<String>,
        timestamp: i64,
        value: f64,
        metric_type: MetricType,
    ) -> Self {
        Self {
            name: name.into(),
            timestamp,
            value,
            tags: Vec::new(),
            metric_type,
            message: None,
            host_name: None,
        }
    }

    /// Attach tags
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Out-of-band event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub text: String,
    pub timestamp: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
}

/// Service check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

/// Out-of-band service check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCheck {
    pub name: String,
    pub status: CheckStatus,
    pub timestamp: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
}

/// Everything one flush interval produced
#[derive(Debug, Clone, Default)]
pub struct FlushBatch {
    pub metrics: Vec<InterMetric>,
    pub events: Vec<Event>,
    pub checks: Vec<ServiceCheck>,
}

impl FlushBatch {
    /// True when the interval produced nothing
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty() && self.events.is_empty() && self.checks.is_empty()
    }
}

/// Upstream aggregation engine seam
///
/// Drained once per flush interval by the scheduler.
pub trait MetricSource: Send + Sync {
    /// Take the finalized values for the interval that just ended
    fn drain(&self) -> FlushBatch;
}
