//! SinkHandle - a named, stateful sink registration

use std::fmt;
use std::sync::Arc;

use contracts::Sink;

use crate::metrics::SinkMetrics;

/// Lifecycle state of a registered sink
///
/// `Unstarted -> Active` on start success, `Unstarted -> Disabled` on start
/// failure. `Disabled` is terminal; flush or ingest failures never disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Unstarted,
    Active,
    Disabled,
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unstarted => f.write_str("unstarted"),
            Self::Active => f.write_str("active"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

/// Handle to a registered sink
pub struct SinkHandle<S: ?Sized> {
    /// Sink name, captured at registration
    name: String,
    state: SinkState,
    sink: Arc<S>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
}

impl<S: ?Sized + Sink> SinkHandle<S> {
    /// Wrap a sink in an unstarted handle
    pub fn new(sink: Arc<S>) -> Self {
        Self {
            name: sink.name().to_string(),
            state: SinkState::Unstarted,
            sink,
            metrics: Arc::new(SinkMetrics::new()),
        }
    }
}

impl<S: ?Sized> SinkHandle<S> {
    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SinkState::Active
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Apply the outcome of `start`; only legal from `Unstarted`
    pub(crate) fn settle_start(&mut self, started: bool) {
        debug_assert_eq!(self.state, SinkState::Unstarted);
        self.state = if started {
            SinkState::Active
        } else {
            SinkState::Disabled
        };
    }
}

impl<S: ?Sized> fmt::Debug for SinkHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkHandle")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::LogSink;
    use contracts::MetricSink;

    #[test]
    fn test_handle_captures_name_and_starts_unstarted() {
        let sink: Arc<dyn MetricSink> = Arc::new(LogSink::new("debug"));
        let handle = SinkHandle::new(sink);

        assert_eq!(handle.name(), "debug");
        assert_eq!(handle.state(), SinkState::Unstarted);
        assert!(!handle.is_active());
    }

    #[test]
    fn test_settle_start() {
        let mut ok = SinkHandle::new(Arc::new(LogSink::new("ok")));
        ok.settle_start(true);
        assert_eq!(ok.state(), SinkState::Active);

        let mut failed = SinkHandle::new(Arc::new(LogSink::new("failed")));
        failed.settle_start(false);
        assert_eq!(failed.state(), SinkState::Disabled);
        assert_eq!(failed.state().to_string(), "disabled");
    }
}
