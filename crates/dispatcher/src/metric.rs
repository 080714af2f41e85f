//! MetricDispatcher - fans aggregated metric batches out to metric sinks

use std::sync::Arc;

use contracts::{Diagnostics, Event, FlushContext, InterMetric, MetricSink, ServiceCheck, SinkOperation};
use tracing::{debug, instrument, warn};

use crate::error::{AggregateError, DispatcherError, DispatcherKind};
use crate::fanout::{failures, fan_out};
use crate::handle::SinkState;
use crate::metrics::MetricsSnapshot;
use crate::registry::SinkRegistry;

/// Owns the metric sinks and drives their lifecycle
pub struct MetricDispatcher {
    registry: SinkRegistry<dyn MetricSink>,
}

impl MetricDispatcher {
    pub fn new() -> Self {
        Self {
            registry: SinkRegistry::new(DispatcherKind::Metric),
        }
    }

    /// Append a sink; only valid before [`MetricDispatcher::start_all`]
    pub fn register(&mut self, sink: Arc<dyn MetricSink>) -> Result<(), DispatcherError> {
        self.registry.register(sink)
    }

    /// Start every registered sink concurrently
    ///
    /// Returns an aggregate naming every sink that failed to start. The
    /// dispatcher is started either way; failed sinks are excluded from all
    /// later cycles.
    pub async fn start_all(&mut self, diagnostics: &Diagnostics) -> Result<(), DispatcherError> {
        self.registry.start_all(diagnostics).await
    }

    /// Deliver one batch to every active sink concurrently
    ///
    /// Every sink sees the same read-only slice. Waiting is bounded by `ctx`;
    /// when it is done, stragglers are signalled through the cycle's token and
    /// reported as timed out, but keep running detached.
    #[instrument(
        name = "metric_dispatcher_flush",
        skip(self, ctx, metrics),
        fields(metrics = metrics.len())
    )]
    pub async fn flush(
        &self,
        ctx: &FlushContext,
        metrics: Arc<[InterMetric]>,
    ) -> Result<(), DispatcherError> {
        let diagnostics = self.registry.started()?;
        let cycle = ctx.child();

        let outcomes = fan_out(
            self.registry.active(),
            SinkOperation::Flush,
            Some(&cycle),
            diagnostics,
            |sink: Arc<dyn MetricSink>| {
                let ctx = cycle.clone();
                let metrics = Arc::clone(&metrics);
                async move { sink.flush(&ctx, &metrics).await }
            },
        )
        .await;
        cycle.cancel();

        let failed = failures(outcomes);
        if failed.is_empty() {
            debug!("Metric flush complete");
            Ok(())
        } else {
            warn!(failed = failed.len(), "Metric flush completed with failures");
            Err(AggregateError::new(SinkOperation::Flush, failed).into())
        }
    }

    /// Broadcast events and service checks to every active sink
    ///
    /// Sinks return nothing here; their failures and panics are only visible
    /// through diagnostics. `Err` is returned for lifecycle misuse only.
    #[instrument(
        name = "metric_dispatcher_flush_events_checks",
        skip(self, ctx, events, checks),
        fields(events = events.len(), checks = checks.len())
    )]
    pub async fn flush_events_checks(
        &self,
        ctx: &FlushContext,
        events: Arc<[Event]>,
        checks: Arc<[ServiceCheck]>,
    ) -> Result<(), DispatcherError> {
        let diagnostics = self.registry.started()?;

        let outcomes = fan_out(
            self.registry.active(),
            SinkOperation::FlushEventsChecks,
            None,
            diagnostics,
            |sink: Arc<dyn MetricSink>| {
                let ctx = ctx.clone();
                let events = Arc::clone(&events);
                let checks = Arc::clone(&checks);
                async move {
                    sink.flush_events_checks(&ctx, &events, &checks).await;
                    Ok(())
                }
            },
        )
        .await;

        let failed = failures(outcomes).len();
        if failed > 0 {
            warn!(failed, "Events/checks broadcast had sink panics");
        }
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.registry.is_started()
    }

    pub fn kind(&self) -> DispatcherKind {
        self.registry.kind()
    }

    /// Number of registered sinks, active or not
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// Names of sinks that will receive the next flush
    pub fn active_sinks(&self) -> Vec<String> {
        self.registry
            .active()
            .map(|h| h.name().to_string())
            .collect()
    }

    /// Lifecycle state of every sink
    pub fn states(&self) -> Vec<(String, SinkState)> {
        self.registry.states()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.registry.metrics()
    }
}

impl Default for MetricDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
