//! BlackholeSink - discards everything, counting what it was given

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use contracts::{
    ContractError, Diagnostics, Event, FlushContext, InterMetric, MetricSink, ServiceCheck, Sink,
    Span, SpanSink,
};

/// Sink that drops all payloads
#[derive(Debug, Default)]
pub struct BlackholeSink {
    name: String,
    metrics: AtomicU64,
    spans: AtomicU64,
}

impl BlackholeSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Metrics discarded so far
    pub fn metric_count(&self) -> u64 {
        self.metrics.load(Ordering::Relaxed)
    }

    /// Spans discarded so far
    pub fn span_count(&self) -> u64 {
        self.spans.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Sink for BlackholeSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, _diagnostics: Diagnostics) -> Result<(), ContractError> {
        Ok(())
    }
}

#[async_trait]
impl MetricSink for BlackholeSink {
    async fn flush(&self, _ctx: &FlushContext, metrics: &[InterMetric]) -> Result<(), ContractError> {
        self.metrics
            .fetch_add(metrics.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn flush_events_checks(
        &self,
        _ctx: &FlushContext,
        _events: &[Event],
        _checks: &[ServiceCheck],
    ) {
    }
}

#[async_trait]
impl SpanSink for BlackholeSink {
    async fn ingest(&self, _span: Arc<Span>) -> Result<(), ContractError> {
        self.spans.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn flush(&self) {}
}
