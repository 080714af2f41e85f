//! Flush cycle metrics
//!
//! Prometheus recording for each flush cycle plus an in-memory aggregator
//! used to print a run summary.

use std::collections::HashMap;
use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Record one completed flush cycle
pub fn record_flush_cycle(
    duration: Duration,
    metrics_flushed: usize,
    events: usize,
    checks: usize,
    failed_sinks: &[String],
) {
    counter!("fanout_flush_cycles_total").increment(1);
    histogram!("fanout_flush_cycle_duration_ms").record(duration.as_secs_f64() * 1000.0);

    counter!("fanout_metrics_flushed_total").increment(metrics_flushed as u64);
    gauge!("fanout_last_flush_metrics").set(metrics_flushed as f64);
    counter!("fanout_events_flushed_total").increment(events as u64);
    counter!("fanout_checks_flushed_total").increment(checks as u64);

    gauge!("fanout_last_flush_failed_sinks").set(failed_sinks.len() as f64);
    for sink in failed_sinks {
        counter!("fanout_sink_flush_failures_total", "sink" => sink.clone()).increment(1);
    }
}

/// Record a cycle a dispatcher refused; its metrics were dropped
pub fn record_flush_rejected(metrics_dropped: usize) {
    counter!("fanout_flush_cycles_rejected_total").increment(1);
    counter!("fanout_metrics_dropped_total").increment(metrics_dropped as u64);
}

/// Record spans handed to the span dispatcher
pub fn record_spans_ingested(count: u64) {
    counter!("fanout_spans_ingested_total").increment(count);
}

/// Record active/disabled sink counts after startup
pub fn record_sink_states(kind: &str, active: usize, disabled: usize) {
    gauge!("fanout_sinks_active", "kind" => kind.to_string()).set(active as f64);
    gauge!("fanout_sinks_disabled", "kind" => kind.to_string()).set(disabled as f64);
}

/// Flush cycle aggregator
///
/// Aggregates cycle outcomes in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct FlushStatsAggregator {
    /// Total cycles run
    pub total_cycles: u64,

    /// Cycles where at least one sink failed
    pub cycles_with_failures: u64,

    /// Cycles refused by a dispatcher that was not started
    pub cycles_rejected: u64,

    /// Metrics handed to the dispatcher
    pub total_metrics: u64,

    pub total_events: u64,
    pub total_checks: u64,

    /// Cycle latency in milliseconds
    pub cycle_stats: RunningStats,

    /// Failed cycles per sink
    pub sink_failure_counts: HashMap<String, u64>,
}

impl FlushStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one cycle into the totals
    pub fn update(
        &mut self,
        duration: Duration,
        metrics: usize,
        events: usize,
        checks: usize,
        failed_sinks: &[String],
    ) {
        self.total_cycles += 1;
        self.total_metrics += metrics as u64;
        self.total_events += events as u64;
        self.total_checks += checks as u64;
        self.cycle_stats.push(duration.as_secs_f64() * 1000.0);

        if !failed_sinks.is_empty() {
            self.cycles_with_failures += 1;
            for sink in failed_sinks {
                *self.sink_failure_counts.entry(sink.clone()).or_insert(0) += 1;
            }
        }
    }

    /// Count a refused cycle; nothing was flushed
    pub fn update_rejected(&mut self, duration: Duration) {
        self.total_cycles += 1;
        self.cycles_rejected += 1;
        self.cycle_stats.push(duration.as_secs_f64() * 1000.0);
    }

    /// Build a summary report
    pub fn summary(&self) -> FlushSummary {
        FlushSummary {
            total_cycles: self.total_cycles,
            total_metrics: self.total_metrics,
            total_events: self.total_events,
            total_checks: self.total_checks,
            cycles_with_failures: self.cycles_with_failures,
            cycles_rejected: self.cycles_rejected,
            failure_rate: if self.total_cycles > 0 {
                self.cycles_with_failures as f64 / self.total_cycles as f64 * 100.0
            } else {
                0.0
            },
            cycle_ms: StatsSummary::from(&self.cycle_stats),
            sink_failure_counts: self.sink_failure_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Run summary
#[derive(Debug, Clone, Default)]
pub struct FlushSummary {
    pub total_cycles: u64,
    pub total_metrics: u64,
    pub total_events: u64,
    pub total_checks: u64,
    pub cycles_with_failures: u64,
    pub cycles_rejected: u64,
    pub failure_rate: f64,
    pub cycle_ms: StatsSummary,
    pub sink_failure_counts: HashMap<String, u64>,
}

impl std::fmt::Display for FlushSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Flush Summary ===")?;
        writeln!(f, "Cycles: {}", self.total_cycles)?;
        writeln!(f, "Metrics flushed: {}", self.total_metrics)?;
        writeln!(
            f,
            "Events/checks: {}/{}",
            self.total_events, self.total_checks
        )?;
        writeln!(
            f,
            "Cycles with sink failures: {} ({:.2}%)",
            self.cycles_with_failures, self.failure_rate
        )?;
        if self.cycles_rejected > 0 {
            writeln!(f, "Rejected cycles: {}", self.cycles_rejected)?;
        }
        writeln!(f, "Cycle latency (ms): {}", self.cycle_ms)?;

        if !self.sink_failure_counts.is_empty() {
            let mut sinks: Vec<_> = self.sink_failure_counts.iter().collect();
            sinks.sort();
            writeln!(f, "Failed cycles per sink:")?;
            for (sink, count) in sinks {
                writeln!(f, "  {}: {}", sink, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
