//! Sink traits - Dispatcher output interface
//!
//! Two capability sets: [`MetricSink`] for batch flushes and [`SpanSink`] for
//! streaming span ingest. Both share the [`Sink`] lifecycle.
//!
//! Obligations binding every implementation:
//! - `start` is invoked exactly once before any other call
//! - received payloads are never mutated (they are shared with other sinks)
//! - every method may be called concurrently with other sinks' calls; a sink
//!   that defers work to background tasks owns its own synchronization

use std::sync::Arc;

use async_trait::async_trait;

use crate::{ContractError, Diagnostics, Event, FlushContext, InterMetric, ServiceCheck, Span};

/// Lifecycle shared by metric and span sinks
#[async_trait]
pub trait Sink: Send + Sync {
    /// Stable sink name (used for logging, metrics and error attribution)
    fn name(&self) -> &str;

    /// Finish setting up the sink and start any background processing
    ///
    /// # Errors
    /// A start error disables the sink for the rest of the process lifetime
    async fn start(&self, diagnostics: Diagnostics) -> Result<(), ContractError>;
}

/// Receiver of aggregated metrics on every flush interval
#[async_trait]
pub trait MetricSink: Sink {
    /// Deliver one flush interval's metrics to the backend
    ///
    /// Implementations should race long-running work against `ctx.done()`.
    ///
    /// # Errors
    /// Returns flush error (retried on the next interval)
    async fn flush(&self, ctx: &FlushContext, metrics: &[InterMetric]) -> Result<(), ContractError>;

    /// Deliver out-of-band events and service checks
    ///
    /// Best effort: failures are reported through [`Diagnostics`] only.
    async fn flush_events_checks(
        &self,
        ctx: &FlushContext,
        events: &[Event],
        checks: &[ServiceCheck],
    );
}

/// Receiver of individual spans as they complete
#[async_trait]
pub trait SpanSink: Sink {
    /// Take a span; must return promptly
    ///
    /// Sinks that batch should buffer here and emit on [`SpanSink::flush`].
    ///
    /// # Errors
    /// Returns ingest error (reported through diagnostics)
    async fn ingest(&self, span: Arc<Span>) -> Result<(), ContractError>;

    /// Periodic signal to emit anything buffered
    async fn flush(&self);
}
