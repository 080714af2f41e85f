//! SinkRegistry - ordered sink handles of one kind plus the start barrier
//!
//! Setup (`register`, `start_all`) takes `&mut self`; everything that runs on
//! the hot path takes `&self`, so steady-state dispatch needs no locking.

use std::sync::Arc;

use contracts::{Diagnostics, Sink, SinkOperation};
use tracing::{error, info, instrument};

use crate::error::{AggregateError, DispatcherError, DispatcherKind};
use crate::fanout::{failures, fan_out};
use crate::handle::{SinkHandle, SinkState};
use crate::metrics::MetricsSnapshot;

pub(crate) struct SinkRegistry<S: ?Sized> {
    kind: DispatcherKind,
    handles: Vec<SinkHandle<S>>,
    /// Set once `start_all` has run
    diagnostics: Option<Diagnostics>,
}

impl<S: ?Sized + Sink + 'static> SinkRegistry<S> {
    pub(crate) fn new(kind: DispatcherKind) -> Self {
        Self {
            kind,
            handles: Vec::new(),
            diagnostics: None,
        }
    }

    pub(crate) fn register(&mut self, sink: Arc<S>) -> Result<(), DispatcherError> {
        if self.is_started() {
            return Err(DispatcherError::AlreadyStarted { kind: self.kind });
        }
        if self.handles.iter().any(|h| h.name() == sink.name()) {
            return Err(DispatcherError::DuplicateSink {
                kind: self.kind,
                name: sink.name().to_string(),
            });
        }
        self.handles.push(SinkHandle::new(sink));
        Ok(())
    }

    /// Start every sink concurrently; failed sinks are disabled for good
    #[instrument(
        name = "registry_start_all",
        skip(self, diagnostics),
        fields(kind = %self.kind, sink_count = self.handles.len())
    )]
    pub(crate) async fn start_all(&mut self, diagnostics: &Diagnostics) -> Result<(), DispatcherError> {
        if self.is_started() {
            return Err(DispatcherError::AlreadyStarted { kind: self.kind });
        }

        let outcomes = fan_out(
            self.handles.iter(),
            SinkOperation::Start,
            None,
            diagnostics,
            |sink: Arc<S>| {
                let diagnostics = diagnostics.clone();
                async move { sink.start(diagnostics).await }
            },
        )
        .await;

        for (handle, outcome) in self.handles.iter_mut().zip(&outcomes) {
            handle.settle_start(outcome.is_ok());
            match outcome {
                Ok(()) => info!(kind = %self.kind, sink = %handle.name(), "Sink started"),
                Err(e) => error!(
                    kind = %self.kind,
                    sink = %handle.name(),
                    error = %e,
                    "Sink failed to start, disabled"
                ),
            }
        }
        self.diagnostics = Some(diagnostics.clone());

        let failed = failures(outcomes);
        let active = self.handles.len() - failed.len();
        observability::record_sink_states(&self.kind.to_string(), active, failed.len());
        info!(
            kind = %self.kind,
            active,
            disabled = failed.len(),
            "Dispatcher started"
        );

        if failed.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(SinkOperation::Start, failed).into())
        }
    }
}

impl<S: ?Sized> SinkRegistry<S> {
    pub(crate) fn kind(&self) -> DispatcherKind {
        self.kind
    }

    pub(crate) fn is_started(&self) -> bool {
        self.diagnostics.is_some()
    }

    /// Diagnostics handle, or a lifecycle error before `start_all`
    pub(crate) fn started(&self) -> Result<&Diagnostics, DispatcherError> {
        self.diagnostics
            .as_ref()
            .ok_or(DispatcherError::NotStarted { kind: self.kind })
    }

    pub(crate) fn active(&self) -> impl Iterator<Item = &SinkHandle<S>> {
        self.handles.iter().filter(|h| h.is_active())
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn states(&self) -> Vec<(String, SinkState)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.state()))
            .collect()
    }

    pub(crate) fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }
}
