//! Diagnostics - shared read-only health reporting handle
//!
//! Injected into every sink at start. Sinks and dispatchers report through it;
//! it fans out to the `metrics` facade and to `tracing`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use tracing::{trace, warn};

/// Sink-facing operations, used to label diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkOperation {
    /// One-time sink setup
    Start,
    /// Metric batch flush
    Flush,
    /// Events and service checks broadcast
    FlushEventsChecks,
    /// Single span delivery
    Ingest,
    /// Span buffer emission signal
    SpanFlush,
}

impl SinkOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Flush => "flush",
            Self::FlushEventsChecks => "flush_events_checks",
            Self::Ingest => "ingest",
            Self::SpanFlush => "span_flush",
        }
    }
}

impl fmt::Display for SinkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloneable diagnostics handle
///
/// Cheap to clone; every clone reports under the same service label.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    service: Arc<str>,
}

impl Diagnostics {
    /// Create a handle reporting under `service`
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: Arc::from(service.into()),
        }
    }

    /// Service label attached to every emitted metric
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Record a completed sink call
    pub fn record_success(&self, sink: &str, operation: SinkOperation, elapsed: Duration) {
        counter!(
            "fanout_sink_calls_total",
            "service" => self.service.to_string(),
            "sink" => sink.to_string(),
            "operation" => operation.as_str(),
            "status" => "success"
        )
        .increment(1);

        histogram!(
            "fanout_sink_call_duration_ms",
            "service" => self.service.to_string(),
            "sink" => sink.to_string(),
            "operation" => operation.as_str()
        )
        .record(elapsed.as_secs_f64() * 1000.0);

        trace!(
            service = %self.service,
            sink = %sink,
            operation = %operation,
            elapsed_us = elapsed.as_micros() as u64,
            "Sink call completed"
        );
    }

    /// Record a failed sink call
    pub fn record_failure(&self, sink: &str, operation: SinkOperation, message: &str) {
        counter!(
            "fanout_sink_calls_total",
            "service" => self.service.to_string(),
            "sink" => sink.to_string(),
            "operation" => operation.as_str(),
            "status" => "failure"
        )
        .increment(1);

        warn!(
            service = %self.service,
            sink = %sink,
            operation = %operation,
            error = %message,
            "Sink call failed"
        );
    }

    /// Sink-defined counter
    pub fn incr(&self, sink: &str, name: &'static str, value: u64) {
        counter!(
            "fanout_sink_internal_total",
            "service" => self.service.to_string(),
            "sink" => sink.to_string(),
            "name" => name
        )
        .increment(value);
    }

    /// Sink-defined gauge
    pub fn gauge(&self, sink: &str, name: &'static str, value: f64) {
        gauge!(
            "fanout_sink_internal",
            "service" => self.service.to_string(),
            "sink" => sink.to_string(),
            "name" => name
        )
        .set(value);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new("fanout")
    }
}
