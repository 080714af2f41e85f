//! Build dispatchers from configuration

use std::sync::Arc;

use contracts::{FanoutConfig, MetricSink, SinkConfig, SinkType, SpanSink};
use tracing::{info, instrument};

use crate::error::DispatcherError;
use crate::metric::MetricDispatcher;
use crate::sinks::{BlackholeSink, FileSink, LogSink};
use crate::span::SpanDispatcher;

/// Both dispatchers, populated but not started
pub struct Dispatchers {
    pub metrics: MetricDispatcher,
    pub spans: SpanDispatcher,
}

/// Builder for creating dispatchers from a [`FanoutConfig`]
pub struct DispatcherBuilder {
    config: FanoutConfig,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: FanoutConfig) -> Self {
        Self { config }
    }

    /// Create and register every configured sink
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(
            metric_sinks = self.config.metric_sinks.len(),
            span_sinks = self.config.span_sinks.len()
        )
    )]
    pub fn build(self) -> Result<Dispatchers, DispatcherError> {
        let mut metrics = MetricDispatcher::new();
        for sink_config in &self.config.metric_sinks {
            metrics.register(create_sink(sink_config)?.into_metric_sink())?;
        }

        let mut spans = SpanDispatcher::new();
        for sink_config in &self.config.span_sinks {
            spans.register(create_sink(sink_config)?.into_span_sink())?;
        }

        info!(
            metric_sinks = metrics.len(),
            span_sinks = spans.len(),
            "Dispatchers built"
        );
        Ok(Dispatchers { metrics, spans })
    }
}

/// Convenience function to create dispatchers from configuration
pub fn create_dispatchers(config: &FanoutConfig) -> Result<Dispatchers, DispatcherError> {
    DispatcherBuilder::new(config.clone()).build()
}

/// A built-in sink before it is bound to a dispatcher kind
enum BuiltinSink {
    Log(LogSink),
    File(FileSink),
    Blackhole(BlackholeSink),
}

impl BuiltinSink {
    fn into_metric_sink(self) -> Arc<dyn MetricSink> {
        match self {
            Self::Log(sink) => Arc::new(sink),
            Self::File(sink) => Arc::new(sink),
            Self::Blackhole(sink) => Arc::new(sink),
        }
    }

    fn into_span_sink(self) -> Arc<dyn SpanSink> {
        match self {
            Self::Log(sink) => Arc::new(sink),
            Self::File(sink) => Arc::new(sink),
            Self::Blackhole(sink) => Arc::new(sink),
        }
    }
}

/// Create a sink from configuration
#[instrument(
    name = "dispatcher_create_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink(config: &SinkConfig) -> Result<BuiltinSink, DispatcherError> {
    match config.sink_type {
        SinkType::Log => Ok(BuiltinSink::Log(LogSink::new(&config.name))),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(BuiltinSink::File(sink))
        }
        SinkType::Blackhole => Ok(BuiltinSink::Blackhole(BlackholeSink::new(&config.name))),
    }
}
