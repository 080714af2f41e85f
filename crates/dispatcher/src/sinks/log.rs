//! LogSink - logs batch and span summaries via tracing

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use contracts::{
    ContractError, Diagnostics, Event, FlushContext, InterMetric, MetricSink, ServiceCheck, Sink,
    Span, SpanSink,
};
use tracing::{debug, info};

/// Sink that logs summaries for debugging
pub struct LogSink {
    name: String,
    /// Spans seen since the last span flush
    pending_spans: AtomicU64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending_spans: AtomicU64::new(0),
        }
    }

    fn log_batch_summary(&self, metrics: &[InterMetric]) {
        let first = metrics.first().map(|m| m.name.as_str()).unwrap_or("-");
        let total: f64 = metrics.iter().map(|m| m.value).sum();

        info!(
            sink = %self.name,
            metrics = metrics.len(),
            first = %first,
            value_sum = total,
            "Metric batch received"
        );
    }
}

#[async_trait]
impl Sink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, diagnostics: Diagnostics) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            service = %diagnostics.service(),
            "LogSink started"
        );
        Ok(())
    }
}

#[async_trait]
impl MetricSink for LogSink {
    async fn flush(
        &self,
        _ctx: &FlushContext,
        metrics: &[InterMetric],
    ) -> Result<(), ContractError> {
        self.log_batch_summary(metrics);
        Ok(())
    }

    async fn flush_events_checks(
        &self,
        _ctx: &FlushContext,
        events: &[Event],
        checks: &[ServiceCheck],
    ) {
        info!(
            sink = %self.name,
            events = events.len(),
            checks = checks.len(),
            "Events and checks received"
        );
    }
}

#[async_trait]
impl SpanSink for LogSink {
    async fn ingest(&self, span: Arc<Span>) -> Result<(), ContractError> {
        self.pending_spans.fetch_add(1, Ordering::Relaxed);
        debug!(
            sink = %self.name,
            trace_id = span.trace_id,
            span_id = span.id,
            service = %span.service,
            span_name = %span.name,
            duration_ns = span.duration_ns(),
            "Span received"
        );
        Ok(())
    }

    async fn flush(&self) {
        let spans = self.pending_spans.swap(0, Ordering::Relaxed);
        info!(sink = %self.name, spans, "Spans since last flush");
    }
}
