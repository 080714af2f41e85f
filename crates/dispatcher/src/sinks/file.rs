//! FileSink - appends payloads to a JSON-lines file
//!
//! Metric batches and events/checks are written on every flush. Spans are
//! buffered on ingest and written when the span flush signal arrives.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use contracts::{
    ContractError, Diagnostics, Event, FlushContext, InterMetric, MetricSink, ServiceCheck, Sink,
    SinkOperation, Span, SpanSink,
};
use serde::Serialize;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file, created on start and appended to
    pub path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| ContractError::config_validation("params.path", "missing"))?;

        Ok(Self { path })
    }
}

/// One JSON line
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    Metric(&'a InterMetric),
    Event(&'a Event),
    Check(&'a ServiceCheck),
    Span(&'a Span),
}

/// Sink that writes payloads to disk
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    file: tokio::sync::Mutex<Option<File>>,
    span_buffer: Mutex<Vec<Arc<Span>>>,
    diagnostics: OnceLock<Diagnostics>,
}

impl FileSink {
    /// Create a new FileSink; the file is opened on start
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> Self {
        Self {
            name: name.into(),
            config,
            file: tokio::sync::Mutex::new(None),
            span_buffer: Mutex::new(Vec::new()),
            diagnostics: OnceLock::new(),
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let config = FileSinkConfig::from_params(params)?;
        Ok(Self::new(name, config))
    }

    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }

    /// Number of spans waiting for the next span flush
    pub fn buffered_spans(&self) -> usize {
        self.lock_buffer().len()
    }

    fn lock_buffer(&self) -> std::sync::MutexGuard<'_, Vec<Arc<Span>>> {
        // A poisoned buffer only means a writer panicked mid-push; the Vec is intact
        self.span_buffer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn encode<'a>(records: impl IntoIterator<Item = Record<'a>>) -> Result<Vec<u8>, ContractError> {
        let mut out = Vec::new();
        for record in records {
            serde_json::to_writer(&mut out, &record)
                .map_err(|e| ContractError::Other(format!("json encode error: {e}")))?;
            out.push(b'\n');
        }
        Ok(out)
    }

    async fn append(&self, bytes: &[u8]) -> Result<(), ContractError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let mut guard = self.file.lock().await;
        let file = guard
            .as_mut()
            .ok_or_else(|| ContractError::Other(format!("sink '{}' not started", self.name)))?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, diagnostics: Diagnostics) -> Result<(), ContractError> {
        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ContractError::sink_start(&self.name, e.to_string()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)
            .await
            .map_err(|e| ContractError::sink_start(&self.name, e.to_string()))?;

        *self.file.lock().await = Some(file);
        let _ = self.diagnostics.set(diagnostics);
        debug!(sink = %self.name, path = %self.config.path.display(), "FileSink opened");
        Ok(())
    }
}

#[async_trait]
impl MetricSink for FileSink {
    async fn flush(&self, ctx: &FlushContext, metrics: &[InterMetric]) -> Result<(), ContractError> {
        let bytes = Self::encode(metrics.iter().map(Record::Metric))?;

        // A started write always runs to completion so no partial line is left behind
        if ctx.is_done() {
            return Err(ContractError::sink_flush(&self.name, "flush abandoned at deadline"));
        }
        self.append(&bytes)
            .await
            .map_err(|e| ContractError::sink_flush(&self.name, e.to_string()))
    }

    async fn flush_events_checks(
        &self,
        _ctx: &FlushContext,
        events: &[Event],
        checks: &[ServiceCheck],
    ) {
        let records = events
            .iter()
            .map(Record::Event)
            .chain(checks.iter().map(Record::Check));

        let result = match Self::encode(records) {
            Ok(bytes) => self.append(&bytes).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            error!(sink = %self.name, error = %e, "Events/checks write failed");
            if let Some(diagnostics) = self.diagnostics.get() {
                diagnostics.record_failure(&self.name, SinkOperation::FlushEventsChecks, &e.to_string());
            }
        }
    }
}

#[async_trait]
impl SpanSink for FileSink {
    async fn ingest(&self, span: Arc<Span>) -> Result<(), ContractError> {
        self.lock_buffer().push(span);
        Ok(())
    }

    async fn flush(&self) {
        let spans = std::mem::take(&mut *self.lock_buffer());
        if spans.is_empty() {
            return;
        }

        let result = match Self::encode(spans.iter().map(|s| Record::Span(s))) {
            Ok(bytes) => self.append(&bytes).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                if let Some(diagnostics) = self.diagnostics.get() {
                    diagnostics.incr(&self.name, "spans_written", spans.len() as u64);
                }
            }
            Err(e) => {
                error!(sink = %self.name, spans = spans.len(), error = %e, "Span write failed");
                if let Some(diagnostics) = self.diagnostics.get() {
                    diagnostics.record_failure(&self.name, SinkOperation::SpanFlush, &e.to_string());
                }
            }
        }
    }
}
