//! FlushScheduler - the periodic clock driving both dispatchers
//!
//! Every tick drains the aggregator, then runs the metric flush, the
//! events/checks broadcast and the span flush signal concurrently.

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    Event, FlushBatch, FlushConfig, FlushContext, InterMetric, MetricSource, ServiceCheck,
};
use observability::FlushStatsAggregator;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::metric::MetricDispatcher;
use crate::span::SpanDispatcher;

/// Outcome of one flush cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    pub metrics: usize,
    pub events: usize,
    pub checks: usize,
    /// Sinks whose metric flush failed or timed out
    pub failed_sinks: Vec<String>,
    /// Set when a dispatcher refused the cycle; nothing was delivered
    pub rejected: Option<String>,
    pub duration: Duration,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.rejected.is_none() && self.failed_sinks.is_empty()
    }
}

/// Drives flush cycles on a fixed interval
pub struct FlushScheduler {
    metrics: Arc<MetricDispatcher>,
    spans: Arc<SpanDispatcher>,
    interval: Duration,
    timeout: Duration,
}

impl FlushScheduler {
    pub fn new(
        metrics: Arc<MetricDispatcher>,
        spans: Arc<SpanDispatcher>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            metrics,
            spans,
            interval,
            timeout,
        }
    }

    /// Create from the `[flush]` configuration section
    pub fn from_config(
        metrics: Arc<MetricDispatcher>,
        spans: Arc<SpanDispatcher>,
        config: &FlushConfig,
    ) -> Self {
        Self::new(metrics, spans, config.interval(), config.timeout())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run cycles until `shutdown` fires or `max_cycles` have run
    ///
    /// On shutdown one more cycle runs with a fresh context so sinks can emit
    /// what they hold.
    #[instrument(
        name = "flush_scheduler_run",
        skip(self, source, shutdown),
        fields(interval_ms = self.interval.as_millis() as u64)
    )]
    pub async fn run<Src>(
        &self,
        source: &Src,
        shutdown: CancellationToken,
        max_cycles: Option<u64>,
    ) -> FlushStatsAggregator
    where
        Src: MetricSource + ?Sized,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut stats = FlushStatsAggregator::new();
        let mut cycle: u64 = 0;
        info!(
            timeout_ms = self.timeout.as_millis() as u64,
            "Flush scheduler started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    cycle += 1;
                    let report = self
                        .flush_cycle(cycle, source.drain(), self.cycle_context(None))
                        .await;
                    Self::record(&mut stats, &report);
                    break;
                }
                _ = ticker.tick() => {}
            }

            cycle += 1;
            let report = self
                .flush_cycle(cycle, source.drain(), self.cycle_context(Some(&shutdown)))
                .await;
            Self::record(&mut stats, &report);

            if max_cycles.is_some_and(|max| cycle >= max) {
                break;
            }
        }

        info!(cycles = cycle, "Flush scheduler stopped");
        stats
    }

    /// Context for one cycle: deadline `timeout` from now, optionally tied to a parent token
    pub fn cycle_context(&self, parent: Option<&CancellationToken>) -> FlushContext {
        let ctx = match parent {
            Some(token) => FlushContext::from_token(token.child_token()),
            None => FlushContext::new(),
        };
        ctx.deadline_at(Instant::now() + self.timeout)
    }

    /// Deliver one interval's batch to every sink
    #[instrument(
        name = "flush_cycle",
        skip(self, batch, ctx),
        fields(metrics = batch.metrics.len())
    )]
    pub async fn flush_cycle(&self, cycle: u64, batch: FlushBatch, ctx: FlushContext) -> CycleReport {
        let begun = Instant::now();
        let metric_count = batch.metrics.len();
        let event_count = batch.events.len();
        let check_count = batch.checks.len();

        let metrics: Arc<[InterMetric]> = batch.metrics.into();
        let events: Arc<[Event]> = batch.events.into();
        let checks: Arc<[ServiceCheck]> = batch.checks.into();

        let (flushed, broadcast, signalled) = tokio::join!(
            self.metrics.flush(&ctx, metrics),
            self.metrics.flush_events_checks(&ctx, events, checks),
            self.spans.flush(),
        );

        let mut rejected = None;
        let failed_sinks = match flushed {
            Ok(()) => Vec::new(),
            Err(DispatcherError::Sinks(aggregate)) => {
                for failure in aggregate.failures() {
                    warn!(cycle, error = %failure, "Metric sink flush failed");
                }
                aggregate
                    .sink_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            }
            Err(e) => {
                warn!(cycle, error = %e, "Metric flush rejected");
                rejected = Some(e.to_string());
                Vec::new()
            }
        };
        for err in [broadcast, signalled].into_iter().filter_map(Result::err) {
            warn!(cycle, error = %err, "Broadcast rejected");
            rejected.get_or_insert_with(|| err.to_string());
        }

        let report = CycleReport {
            cycle,
            metrics: metric_count,
            events: event_count,
            checks: check_count,
            failed_sinks,
            rejected,
            duration: begun.elapsed(),
        };
        debug!(
            cycle,
            failed = report.failed_sinks.len(),
            elapsed_ms = report.duration.as_millis() as u64,
            "Flush cycle complete"
        );
        report
    }

    fn record(stats: &mut FlushStatsAggregator, report: &CycleReport) {
        if report.rejected.is_some() {
            observability::record_flush_rejected(report.metrics);
            stats.update_rejected(report.duration);
            return;
        }
        observability::record_flush_cycle(
            report.duration,
            report.metrics,
            report.events,
            report.checks,
            &report.failed_sinks,
        );
        stats.update(
            report.duration,
            report.metrics,
            report.events,
            report.checks,
            &report.failed_sinks,
        );
    }
}
