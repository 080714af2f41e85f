//! Sink metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SinkFailure;

/// Delivery counters for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Total dispatched calls
    call_count: AtomicU64,
    /// Calls that returned Ok
    success_count: AtomicU64,
    /// Calls that returned an error
    failure_count: AtomicU64,
    /// Calls that panicked
    panic_count: AtomicU64,
    /// Calls abandoned at the deadline or cancelled
    timeout_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn inc_call_count(&self) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    pub fn inc_success_count(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn panic_count(&self) -> u64 {
        self.panic_count.load(Ordering::Relaxed)
    }

    pub fn inc_panic_count(&self) {
        self.panic_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeout_count(&self) -> u64 {
        self.timeout_count.load(Ordering::Relaxed)
    }

    pub fn inc_timeout_count(&self) {
        self.timeout_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Bump the counter matching `failure`
    pub fn record_failure(&self, failure: &SinkFailure) {
        match failure {
            SinkFailure::Failed { .. } => self.inc_failure_count(),
            SinkFailure::Panicked { .. } => self.inc_panic_count(),
            SinkFailure::TimedOut { .. } | SinkFailure::Cancelled { .. } => {
                self.inc_timeout_count()
            }
        }
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            call_count: self.call_count(),
            success_count: self.success_count(),
            failure_count: self.failure_count(),
            panic_count: self.panic_count(),
            timeout_count: self.timeout_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub call_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub panic_count: u64,
    pub timeout_count: u64,
}

impl MetricsSnapshot {
    /// Calls that did not succeed, whatever the reason
    pub fn unsuccessful(&self) -> u64 {
        self.failure_count + self.panic_count + self.timeout_count
    }
}
