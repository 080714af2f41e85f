//! Synthetic metric source standing in for an aggregator

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use contracts::{
    CheckStatus, Event, FlushBatch, InterMetric, MetricSource, MetricType, ServiceCheck,
};

/// Every this many drains an event is emitted
const EVENT_EVERY: u64 = 5;

#[derive(Debug, Default)]
struct SourceState {
    drains: u64,
    requests: f64,
}

/// Produces a deterministic mix of counters, gauges and checks per drain
#[derive(Debug)]
pub struct SyntheticSource {
    host: String,
    metrics_per_cycle: usize,
    state: Mutex<SourceState>,
}

impl SyntheticSource {
    pub fn new(host: impl Into<String>, metrics_per_cycle: usize) -> Self {
        Self {
            host: host.into(),
            metrics_per_cycle,
            state: Mutex::new(SourceState::default()),
        }
    }

    fn now_secs() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

impl MetricSource for SyntheticSource {
    fn drain(&self) -> FlushBatch {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state.drains += 1;
        state.requests += self.metrics_per_cycle as f64;

        let ts = Self::now_secs();
        let host_tag = format!("host:{}", self.host);

        let metrics = (0..self.metrics_per_cycle)
            .map(|i| {
                let (name, value, metric_type) = if i % 2 == 0 {
                    (format!("synthetic.requests.{i}"), state.requests, MetricType::Counter)
                } else {
                    (
                        format!("synthetic.queue_depth.{i}"),
                        (state.drains % 10) as f64,
                        MetricType::Gauge,
                    )
                };
                let mut metric =
                    InterMetric::new(name, ts, value, metric_type).with_tags(vec![host_tag.clone()]);
                metric.host_name = Some(self.host.clone());
                metric
            })
            .collect();

        let events = if state.drains % EVENT_EVERY == 0 {
            vec![Event {
                title: "synthetic.milestone".to_string(),
                text: format!("{} cycles drained", state.drains),
                timestamp: ts,
                tags: vec![host_tag.clone()],
                aggregation_key: Some("synthetic".to_string()),
                host_name: Some(self.host.clone()),
            }]
        } else {
            Vec::new()
        };

        let checks = vec![ServiceCheck {
            name: "synthetic.source.up".to_string(),
            status: CheckStatus::Ok,
            timestamp: ts,
            tags: vec![host_tag],
            message: None,
            host_name: Some(self.host.clone()),
        }];

        FlushBatch {
            metrics,
            events,
            checks,
        }
    }
}
