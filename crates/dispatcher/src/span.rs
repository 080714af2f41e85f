//! SpanDispatcher - routes every span to every span sink as it arrives

use std::sync::Arc;

use contracts::{Diagnostics, SinkOperation, Span, SpanSink};
use tracing::{debug, instrument};

use crate::error::{DispatcherError, DispatcherKind};
use crate::fanout::fan_out;
use crate::handle::SinkState;
use crate::metrics::MetricsSnapshot;
use crate::registry::SinkRegistry;

/// Owns the span sinks and drives their lifecycle
///
/// Share it behind an `Arc` once started; `ingest` and `flush` take `&self`.
pub struct SpanDispatcher {
    registry: SinkRegistry<dyn SpanSink>,
}

impl SpanDispatcher {
    pub fn new() -> Self {
        Self {
            registry: SinkRegistry::new(DispatcherKind::Span),
        }
    }

    /// Append a sink; only valid before [`SpanDispatcher::start_all`]
    pub fn register(&mut self, sink: Arc<dyn SpanSink>) -> Result<(), DispatcherError> {
        self.registry.register(sink)
    }

    /// Start every registered sink concurrently
    pub async fn start_all(&mut self, diagnostics: &Diagnostics) -> Result<(), DispatcherError> {
        self.registry.start_all(diagnostics).await
    }

    /// Deliver one span to every active sink
    ///
    /// Returns after every sink has settled, so two sequential calls from the
    /// same producer reach each sink in call order. Sink failures are reported
    /// through diagnostics only; `Err` means the dispatcher is not started.
    #[instrument(
        name = "span_dispatcher_ingest",
        level = "trace",
        skip(self, span),
        fields(trace_id = span.trace_id, span_id = span.id)
    )]
    pub async fn ingest(&self, span: Arc<Span>) -> Result<(), DispatcherError> {
        let diagnostics = self.registry.started()?;

        fan_out(
            self.registry.active(),
            SinkOperation::Ingest,
            None,
            diagnostics,
            |sink: Arc<dyn SpanSink>| {
                let span = Arc::clone(&span);
                async move { sink.ingest(span).await }
            },
        )
        .await;
        observability::record_spans_ingested(1);
        Ok(())
    }

    /// Tell every active sink to emit what it has buffered
    ///
    /// No payload and no deadline; panics are isolated and reported through
    /// diagnostics. `Err` means the dispatcher is not started.
    #[instrument(name = "span_dispatcher_flush", skip(self))]
    pub async fn flush(&self) -> Result<(), DispatcherError> {
        let diagnostics = self.registry.started()?;

        let outcomes = fan_out(
            self.registry.active(),
            SinkOperation::SpanFlush,
            None,
            diagnostics,
            |sink: Arc<dyn SpanSink>| async move {
                sink.flush().await;
                Ok(())
            },
        )
        .await;

        debug!(sinks = outcomes.len(), "Span flush signal delivered");
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

    /// Names of sinks that receive spans
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

impl Default for SpanDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use contracts::{ContractError, Sink};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Records span ids in arrival order
    #[derive(Default)]
    struct RecordingSink {
        name: String,
        fail_start: bool,
        reject_errors: bool,
        panic_on_flush: bool,
        panic_on_ingest: bool,
        seen: Mutex<Vec<u64>>,
        flushes: AtomicU64,
    }

    impl RecordingSink {
        fn named(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Default::default()
            }
        }

        fn seen(&self) -> Vec<u64> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn start(&self, _diagnostics: Diagnostics) -> Result<(), ContractError> {
            if self.fail_start {
                return Err(ContractError::sink_start(&self.name, "collector unreachable"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SpanSink for RecordingSink {
        async fn ingest(&self, span: Arc<Span>) -> Result<(), ContractError> {
            if self.panic_on_ingest {
                panic!("ingest fault");
            }
            if self.reject_errors && span.error {
                return Err(ContractError::sink_ingest(&self.name, "error spans rejected"));
            }
            self.seen.lock().unwrap().push(span.id);
            Ok(())
        }

        async fn flush(&self) {
            if self.panic_on_flush {
                panic!("flush fault");
            }
            self.flushes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn span(id: u64) -> Arc<Span> {
        Arc::new(Span::new(1, id, "op", "svc", 0, 10))
    }

    #[tokio::test]
    async fn test_ingest_before_start_is_rejected() {
        let mut dispatcher = SpanDispatcher::new();
        let sink = Arc::new(RecordingSink::named("a"));
        dispatcher.register(sink.clone()).unwrap();

        let err = dispatcher.ingest(span(1)).await.unwrap_err();
        assert!(matches!(err, DispatcherError::NotStarted { kind: DispatcherKind::Span }));
        assert!(dispatcher.flush().await.is_err());
        assert!(sink.seen().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_failure_does_not_block_other_sinks() {
        let mut dispatcher = SpanDispatcher::new();
        let picky = Arc::new(RecordingSink {
            reject_errors: true,
            ..RecordingSink::named("picky")
        });
        let all = Arc::new(RecordingSink::named("all"));
        dispatcher.register(picky.clone()).unwrap();
        dispatcher.register(all.clone()).unwrap();
        dispatcher.start_all(&Diagnostics::default()).await.unwrap();

        let mut failing = Span::new(1, 2, "op", "svc", 0, 10);
        failing.error = true;

        dispatcher.ingest(span(1)).await.unwrap();
        dispatcher.ingest(Arc::new(failing)).await.unwrap();
        dispatcher.ingest(span(3)).await.unwrap();

        assert_eq!(picky.seen(), vec![1, 3]);
        assert_eq!(all.seen(), vec![1, 2, 3]);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics[0].1.failure_count, 1);
        assert_eq!(metrics[0].1.success_count, 2);
        assert_eq!(dispatcher.states()[0].1, SinkState::Active);
    }

    #[tokio::test]
    async fn test_disabled_sink_never_sees_spans() {
        let mut dispatcher = SpanDispatcher::new();
        let down = Arc::new(RecordingSink {
            fail_start: true,
            ..RecordingSink::named("down")
        });
        let up = Arc::new(RecordingSink::named("up"));
        dispatcher.register(down.clone()).unwrap();
        dispatcher.register(up.clone()).unwrap();

        let err = dispatcher
            .start_all(&Diagnostics::default())
            .await
            .unwrap_err();
        assert!(err.as_aggregate().unwrap().contains("down"));

        dispatcher.ingest(span(7)).await.unwrap();
        dispatcher.flush().await.unwrap();

        assert!(down.seen().is_empty());
        assert_eq!(down.flushes.load(Ordering::SeqCst), 0);
        assert_eq!(up.seen(), vec![7]);
        assert_eq!(up.flushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_flush_panic_is_isolated() {
        let mut dispatcher = SpanDispatcher::new();
        let faulty = Arc::new(RecordingSink {
            panic_on_flush: true,
            ..RecordingSink::named("faulty")
        });
        let healthy = Arc::new(RecordingSink::named("healthy"));
        dispatcher.register(faulty.clone()).unwrap();
        dispatcher.register(healthy.clone()).unwrap();
        dispatcher.start_all(&Diagnostics::default()).await.unwrap();

        dispatcher.flush().await.unwrap();
        dispatcher.flush().await.unwrap();

        assert_eq!(healthy.flushes.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.metrics()[0].1.panic_count, 2);
        assert_eq!(dispatcher.active_sinks().len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_panic_is_isolated() {
        let mut dispatcher = SpanDispatcher::new();
        let faulty = Arc::new(RecordingSink {
            panic_on_ingest: true,
            ..RecordingSink::named("faulty")
        });
        let healthy = Arc::new(RecordingSink::named("healthy"));
        dispatcher.register(faulty.clone()).unwrap();
        dispatcher.register(healthy.clone()).unwrap();
        dispatcher.start_all(&Diagnostics::default()).await.unwrap();

        assert!(dispatcher.ingest(span(5)).await.is_ok());

        assert_eq!(healthy.seen(), vec![5]);
        let (name, snapshot) = &dispatcher.metrics()[0];
        assert_eq!(name, "faulty");
        assert_eq!(snapshot.panic_count, 1);
        assert_eq!(dispatcher.states()[0].1, SinkState::Active);
    }
}
