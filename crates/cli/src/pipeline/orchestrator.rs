//! Pipeline orchestrator - wires config, dispatchers, scheduler and producers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{Diagnostics, FanoutConfig, Span};
use dispatcher::{DispatcherError, FlushScheduler, SpanDispatcher};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::stats::SinkReport;
use super::{PipelineStats, SyntheticSource};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub config: FanoutConfig,

    /// Flush cycles to run (None = until shutdown)
    pub max_cycles: Option<u64>,

    /// Stop after this long (None = no timeout)
    pub timeout: Option<Duration>,

    /// Concurrent span producers
    pub producers: usize,

    /// Delay between spans of one producer
    pub span_delay: Duration,

    pub metrics_per_cycle: usize,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` fires, the timeout elapses or `max_cycles` complete
    pub async fn run(self, shutdown: CancellationToken) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let fanout = &self.config.config;

        // Build and start dispatchers
        let mut dispatchers =
            dispatcher::create_dispatchers(fanout).context("Failed to create dispatchers")?;
        let diagnostics = Diagnostics::new(fanout.service_name.clone());

        tolerate_start_failures(dispatchers.metrics.start_all(&diagnostics).await)?;
        tolerate_start_failures(dispatchers.spans.start_all(&diagnostics).await)?;

        info!(
            metric_sinks = ?dispatchers.metrics.active_sinks(),
            span_sinks = ?dispatchers.spans.active_sinks(),
            "Dispatchers started"
        );

        let metrics = Arc::new(dispatchers.metrics);
        let spans = Arc::new(dispatchers.spans);

        // Optional timeout
        if let Some(timeout) = self.config.timeout {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => {
                        warn!(timeout_secs = timeout.as_secs(), "Pipeline timed out");
                        shutdown.cancel();
                    }
                    _ = shutdown.cancelled() => {}
                }
            });
        }

        // Span producers stop on their own token so the final flush sees every span
        let producers_stop = CancellationToken::new();
        let ingested = Arc::new(AtomicU64::new(0));
        let mut producers = JoinSet::new();
        for producer in 0..self.config.producers {
            producers.spawn(produce_spans(
                producer as u64,
                Arc::clone(&spans),
                fanout.service_name.clone(),
                self.config.span_delay,
                Arc::clone(&ingested),
                producers_stop.clone(),
            ));
        }
        info!(producers = self.config.producers, "Span producers running");

        // Stop producers as soon as shutdown begins
        let stop_on_shutdown = tokio::spawn({
            let shutdown = shutdown.clone();
            let producers_stop = producers_stop.clone();
            async move {
                shutdown.cancelled().await;
                producers_stop.cancel();
            }
        });

        let source = SyntheticSource::new(fanout.service_name.clone(), self.config.metrics_per_cycle);
        let scheduler =
            FlushScheduler::from_config(Arc::clone(&metrics), Arc::clone(&spans), &fanout.flush);

        let flush_stats = scheduler
            .run(&source, shutdown.clone(), self.config.max_cycles)
            .await;

        info!("Shutting down span producers...");
        producers_stop.cancel();
        stop_on_shutdown.abort();
        while let Some(joined) = producers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Span producer task failed");
            }
        }

        // Spans ingested after the scheduler's last cycle are still buffered
        if let Err(e) = spans.flush().await {
            warn!(error = %e, "Final span flush failed");
        }

        let mut sinks = Vec::new();
        for (name, state) in metrics.states() {
            let calls = snapshot_for(&metrics.metrics(), &name);
            sinks.push(SinkReport { kind: "metric", name, state, calls });
        }
        for (name, state) in spans.states() {
            let calls = snapshot_for(&spans.metrics(), &name);
            sinks.push(SinkReport { kind: "span", name, state, calls });
        }

        let stats = PipelineStats {
            flush: flush_stats.summary(),
            spans_ingested: ingested.load(Ordering::Relaxed),
            duration: start_time.elapsed(),
            sinks,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            span_rate = format!("{:.2}", stats.span_rate()),
            "Pipeline shutdown complete"
        );
        Ok(stats)
    }
}

/// Start failures only disable the failing sinks; anything else is fatal
fn tolerate_start_failures(result: Result<(), DispatcherError>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(DispatcherError::Sinks(aggregate)) => {
            warn!(
                failed = ?aggregate.sink_names(),
                "Some sinks failed to start and are disabled"
            );
            Ok(())
        }
        Err(e) => Err(e).context("Failed to start dispatcher"),
    }
}

fn snapshot_for(
    snapshots: &[(String, dispatcher::MetricsSnapshot)],
    name: &str,
) -> dispatcher::MetricsSnapshot {
    snapshots
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, s)| *s)
        .unwrap_or_default()
}

/// One producer: a trace per span, ids unique per producer
async fn produce_spans(
    producer: u64,
    spans: Arc<SpanDispatcher>,
    service: String,
    delay: Duration,
    ingested: Arc<AtomicU64>,
    stop: CancellationToken,
) {
    let mut seq: u64 = 0;
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        seq += 1;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or_default();
        let span = Span::new(
            (producer << 32) | seq,
            seq,
            format!("producer.{producer}"),
            service.clone(),
            now - delay.as_nanos() as i64,
            now,
        )
        .with_tag("producer", producer.to_string());

        match spans.ingest(Arc::new(span)).await {
            Ok(()) => {
                ingested.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(producer, error = %e, "Span rejected");
                break;
            }
        }
    }
    debug!(producer, spans = seq, "Span producer stopped");
}
