//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 多 sink 端到端 fan-out 场景
//! - 并发 span 生产者的顺序保证
//! - 配置驱动的完整 flush 周期

#[cfg(test)]
mod support {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use contracts::{
        ContractError, Diagnostics, Event, FlushContext, InterMetric, MetricSink, ServiceCheck,
        Sink, Span, SpanSink,
    };

    /// Scriptable backend recording everything it is given
    #[derive(Default)]
    pub struct RecordingBackend {
        pub name: String,
        pub refuse_start: bool,
        /// Panic on this flush call (1-based)
        pub panic_on_flush: Option<u64>,
        pub flush_delay: Option<Duration>,
        pub flush_calls: AtomicU64,
        pub batches: Mutex<Vec<Vec<InterMetric>>>,
        pub events_checks: Mutex<Vec<(usize, usize)>>,
        pub spans: Mutex<Vec<Arc<Span>>>,
        pub span_flushes: AtomicU64,
    }

    impl RecordingBackend {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Default::default()
            }
        }

        pub fn batches(&self) -> Vec<Vec<InterMetric>> {
            self.batches.lock().unwrap().clone()
        }

        pub fn spans(&self) -> Vec<Arc<Span>> {
            self.spans.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sink for RecordingBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn start(&self, _diagnostics: Diagnostics) -> Result<(), ContractError> {
            if self.refuse_start {
                Err(ContractError::sink_connection(&self.name, "connection refused"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl MetricSink for RecordingBackend {
        async fn flush(
            &self,
            ctx: &FlushContext,
            metrics: &[InterMetric],
        ) -> Result<(), ContractError> {
            let call = self.flush_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.panic_on_flush == Some(call) {
                panic!("unexpected fault in {}", self.name);
            }
            if let Some(delay) = self.flush_delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = ctx.done() => return Err(ContractError::sink_flush(&self.name, "abandoned")),
                }
            }
            self.batches.lock().unwrap().push(metrics.to_vec());
            Ok(())
        }

        async fn flush_events_checks(
            &self,
            _ctx: &FlushContext,
            events: &[Event],
            checks: &[ServiceCheck],
        ) {
            self.events_checks
                .lock()
                .unwrap()
                .push((events.len(), checks.len()));
        }
    }

    #[async_trait]
    impl SpanSink for RecordingBackend {
        async fn ingest(&self, span: Arc<Span>) -> Result<(), ContractError> {
            self.spans.lock().unwrap().push(span);
            Ok(())
        }

        async fn flush(&self) {
            self.span_flushes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{Diagnostics, FlushContext, InterMetric, MetricType};
    use dispatcher::{DispatcherError, MetricDispatcher, SinkFailure, SinkState};

    use crate::support::RecordingBackend;

    fn three_metrics() -> Arc<[InterMetric]> {
        vec![
            InterMetric::new("requests", 100, 3.0, MetricType::Counter),
            InterMetric::new("latency.p99", 100, 12.5, MetricType::Gauge),
            InterMetric::new("health", 100, 0.0, MetricType::Status),
        ]
        .into()
    }

    async fn started(backends: Vec<Arc<RecordingBackend>>) -> (MetricDispatcher, Option<DispatcherError>) {
        let mut dispatcher = MetricDispatcher::new();
        for backend in backends {
            dispatcher.register(backend).unwrap();
        }
        let err = dispatcher.start_all(&Diagnostics::new("e2e")).await.err();
        (dispatcher, err)
    }

    /// Both backends receive the identical batch
    #[tokio::test]
    async fn test_flush_reaches_every_backend() {
        let x = Arc::new(RecordingBackend::new("backend-x"));
        let y = Arc::new(RecordingBackend::new("backend-y"));
        let (dispatcher, start_err) = started(vec![x.clone(), y.clone()]).await;
        assert!(start_err.is_none());

        let metrics = three_metrics();
        dispatcher
            .flush(&FlushContext::with_timeout(Duration::from_secs(5)), Arc::clone(&metrics))
            .await
            .unwrap();

        assert_eq!(x.batches(), vec![metrics.to_vec()]);
        assert_eq!(y.batches(), vec![metrics.to_vec()]);
    }

    /// A backend refusing to start is named and then skipped
    #[tokio::test]
    async fn test_start_failure_disables_backend() {
        let x = Arc::new(RecordingBackend {
            refuse_start: true,
            ..RecordingBackend::new("backend-x")
        });
        let y = Arc::new(RecordingBackend::new("backend-y"));
        let (dispatcher, start_err) = started(vec![x.clone(), y.clone()]).await;

        let start_err = start_err.expect("start should report backend-x");
        let aggregate = start_err.as_aggregate().unwrap();
        assert_eq!(aggregate.sink_names(), vec!["backend-x"]);
        assert!(start_err.to_string().contains("connection refused"));

        dispatcher
            .flush(&FlushContext::new(), three_metrics())
            .await
            .unwrap();

        assert_eq!(x.flush_calls.load(Ordering::SeqCst), 0);
        assert_eq!(y.batches().len(), 1);
        assert_eq!(dispatcher.active_sinks(), vec!["backend-y".to_string()]);
        assert!(dispatcher
            .states()
            .contains(&("backend-x".to_string(), SinkState::Disabled)));
    }

    /// A panicking flush is attributed for that cycle only
    #[tokio::test]
    async fn test_flush_fault_is_not_fatal() {
        let x = Arc::new(RecordingBackend {
            panic_on_flush: Some(1),
            ..RecordingBackend::new("backend-x")
        });
        let y = Arc::new(RecordingBackend::new("backend-y"));
        let (dispatcher, _) = started(vec![x.clone(), y.clone()]).await;

        let cycle1 = dispatcher
            .flush(&FlushContext::new(), three_metrics())
            .await
            .unwrap_err();
        let aggregate = cycle1.as_aggregate().unwrap();
        assert_eq!(aggregate.sink_names(), vec!["backend-x"]);
        assert!(matches!(
            aggregate.failure_for("backend-x"),
            Some(SinkFailure::Panicked { .. })
        ));
        assert_eq!(y.batches().len(), 1);

        dispatcher
            .flush(&FlushContext::new(), three_metrics())
            .await
            .unwrap();
        assert_eq!(x.flush_calls.load(Ordering::SeqCst), 2);
        assert_eq!(x.batches().len(), 1);
        assert_eq!(y.batches().len(), 2);
    }

    /// A slow backend times out without delaying the fast one
    #[tokio::test]
    async fn test_slow_backend_bounded_by_deadline() {
        let slow = Arc::new(RecordingBackend {
            flush_delay: Some(Duration::from_secs(30)),
            ..RecordingBackend::new("slow")
        });
        let fast = Arc::new(RecordingBackend::new("fast"));
        let (dispatcher, _) = started(vec![slow.clone(), fast.clone()]).await;

        let begun = tokio::time::Instant::now();
        let err = dispatcher
            .flush(
                &FlushContext::with_timeout(Duration::from_millis(100)),
                three_metrics(),
            )
            .await
            .unwrap_err();

        assert!(begun.elapsed() < Duration::from_secs(5));
        let aggregate = err.as_aggregate().unwrap();
        assert!(aggregate.failure_for("slow").unwrap().is_timeout());
        assert!(!aggregate.contains("fast"));
        assert_eq!(fast.batches().len(), 1);
    }
}

#[cfg(test)]
mod span_ordering_tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use contracts::{Diagnostics, Span};
    use dispatcher::SpanDispatcher;

    use crate::support::RecordingBackend;

    const PRODUCERS: u64 = 10;
    const SPANS_PER_PRODUCER: u64 = 10;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_per_producer_order_preserved() {
        let a = Arc::new(RecordingBackend::new("a"));
        let b = Arc::new(RecordingBackend::new("b"));

        let mut dispatcher = SpanDispatcher::new();
        dispatcher.register(a.clone()).unwrap();
        dispatcher.register(b.clone()).unwrap();
        dispatcher.start_all(&Diagnostics::default()).await.unwrap();
        let dispatcher = Arc::new(dispatcher);

        let mut producers = Vec::new();
        for producer in 0..PRODUCERS {
            let dispatcher = Arc::clone(&dispatcher);
            producers.push(tokio::spawn(async move {
                for seq in 0..SPANS_PER_PRODUCER {
                    let span = Span::new(producer, seq, "op", "svc", 0, 1);
                    dispatcher.ingest(Arc::new(span)).await.unwrap();
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        for backend in [&a, &b] {
            let spans = backend.spans();
            assert_eq!(spans.len() as u64, PRODUCERS * SPANS_PER_PRODUCER);

            let mut per_producer: HashMap<u64, Vec<u64>> = HashMap::new();
            for span in spans {
                per_producer.entry(span.trace_id).or_default().push(span.id);
            }
            assert_eq!(per_producer.len() as u64, PRODUCERS);
            for ids in per_producer.values() {
                let expected: Vec<u64> = (0..SPANS_PER_PRODUCER).collect();
                assert_eq!(ids, &expected);
            }
        }
    }

    #[tokio::test]
    async fn test_span_flush_signal_reaches_active_sinks_only() {
        let ok = Arc::new(RecordingBackend::new("ok"));
        let refused = Arc::new(RecordingBackend {
            refuse_start: true,
            ..RecordingBackend::new("refused")
        });

        let mut dispatcher = SpanDispatcher::new();
        dispatcher.register(ok.clone()).unwrap();
        dispatcher.register(refused.clone()).unwrap();
        assert!(dispatcher.start_all(&Diagnostics::default()).await.is_err());

        dispatcher.flush().await.unwrap();
        assert_eq!(ok.span_flushes.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(refused.span_flushes.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}

#[cfg(test)]
mod config_pipeline_tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        CheckStatus, Diagnostics, FlushBatch, InterMetric, MetricSource, MetricType, ServiceCheck,
        Span,
    };
    use dispatcher::{create_dispatchers, FlushScheduler};
    use tokio_util::sync::CancellationToken;

    use crate::support::RecordingBackend;

    struct FixedSource;

    impl MetricSource for FixedSource {
        fn drain(&self) -> FlushBatch {
            FlushBatch {
                metrics: vec![
                    InterMetric::new("a", 1, 1.0, MetricType::Counter),
                    InterMetric::new("b", 1, 2.0, MetricType::Gauge),
                ],
                events: Vec::new(),
                checks: vec![ServiceCheck {
                    name: "up".to_string(),
                    status: CheckStatus::Ok,
                    timestamp: 1,
                    tags: Vec::new(),
                    message: None,
                    host_name: None,
                }],
            }
        }
    }

    fn read_kinds(path: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["kind"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_config_driven_cycles_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let metrics_path = dir.path().join("metrics.jsonl");
        let spans_path = dir.path().join("spans.jsonl");

        let content = format!(
            r#"
service_name = "it"

[flush]
interval_ms = 50
timeout_ms = 50

[[metric_sinks]]
name = "archive"
sink_type = "file"
params = {{ path = "{}" }}

[[metric_sinks]]
name = "void"
sink_type = "blackhole"

[[span_sinks]]
name = "archive"
sink_type = "file"
params = {{ path = "{}" }}
"#,
            metrics_path.display(),
            spans_path.display()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();

        let mut dispatchers = create_dispatchers(&config).unwrap();
        let diagnostics = Diagnostics::new(config.service_name.clone());
        dispatchers.metrics.start_all(&diagnostics).await.unwrap();
        dispatchers.spans.start_all(&diagnostics).await.unwrap();

        let metrics = Arc::new(dispatchers.metrics);
        let spans = Arc::new(dispatchers.spans);
        for id in 0..3 {
            spans
                .ingest(Arc::new(Span::new(7, id, "op", "it", 0, 10)))
                .await
                .unwrap();
        }

        let scheduler = FlushScheduler::from_config(Arc::clone(&metrics), Arc::clone(&spans), &config.flush);
        let stats = scheduler
            .run(&FixedSource, CancellationToken::new(), Some(2))
            .await;

        assert_eq!(stats.total_cycles, 2);
        assert_eq!(stats.total_metrics, 4);
        assert_eq!(stats.cycles_with_failures, 0);

        let kinds = read_kinds(&metrics_path);
        assert_eq!(kinds.iter().filter(|k| *k == "metric").count(), 4);
        assert_eq!(kinds.iter().filter(|k| *k == "check").count(), 2);
        assert_eq!(read_kinds(&spans_path), vec!["span"; 3]);

        let snapshots = metrics.metrics();
        let archive = snapshots.iter().find(|(n, _)| n == "archive").unwrap().1;
        assert_eq!(archive.success_count, archive.call_count);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_recorded_backend_once_more() {
        let backend = Arc::new(RecordingBackend::new("rec"));
        let mut metrics = dispatcher::MetricDispatcher::new();
        metrics.register(backend.clone()).unwrap();
        metrics.start_all(&Diagnostics::default()).await.unwrap();
        let mut spans = dispatcher::SpanDispatcher::new();
        spans.register(backend.clone()).unwrap();
        spans.start_all(&Diagnostics::default()).await.unwrap();

        let scheduler = FlushScheduler::new(
            Arc::new(metrics),
            Arc::new(spans),
            Duration::from_millis(20),
            Duration::from_millis(20),
        );

        let shutdown = CancellationToken::new();
        let trigger = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(70)).await;
                shutdown.cancel();
            })
        };
        let stats = scheduler.run(&FixedSource, shutdown, None).await;
        trigger.await.unwrap();

        // Regular ticks plus the final shutdown cycle
        assert!(stats.total_cycles >= 2);
        assert_eq!(
            backend.flush_calls.load(Ordering::SeqCst),
            stats.total_cycles
        );
        assert_eq!(
            backend.span_flushes.load(Ordering::SeqCst),
            stats.total_cycles
        );
        assert_eq!(backend.events_checks.lock().unwrap().len() as u64, stats.total_cycles);
    }
}
