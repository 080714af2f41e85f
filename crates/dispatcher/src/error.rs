//! Dispatcher error types

use std::fmt;

use contracts::{ContractError, SinkOperation};
use thiserror::Error;

/// Which dispatcher an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherKind {
    Metric,
    Span,
}

impl fmt::Display for DispatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => f.write_str("metric"),
            Self::Span => f.write_str("span"),
        }
    }
}

/// A single sink's failure, attributed by name
#[derive(Debug, Error)]
pub enum SinkFailure {
    /// Sink returned an error
    #[error("sink '{sink}' {operation} failed: {source}")]
    Failed {
        sink: String,
        operation: SinkOperation,
        #[source]
        source: ContractError,
    },

    /// Sink panicked inside the call
    #[error("sink '{sink}' panicked during {operation}: {message}")]
    Panicked {
        sink: String,
        operation: SinkOperation,
        message: String,
    },

    /// Sink had not settled when the deadline elapsed
    #[error("sink '{sink}' did not finish {operation} before the deadline")]
    TimedOut {
        sink: String,
        operation: SinkOperation,
    },

    /// Caller cancelled the call before the sink settled
    #[error("sink '{sink}' {operation} was cancelled")]
    Cancelled {
        sink: String,
        operation: SinkOperation,
    },
}

impl SinkFailure {
    /// Name of the offending sink
    pub fn sink(&self) -> &str {
        match self {
            Self::Failed { sink, .. }
            | Self::Panicked { sink, .. }
            | Self::TimedOut { sink, .. }
            | Self::Cancelled { sink, .. } => sink,
        }
    }

    pub fn operation(&self) -> SinkOperation {
        match self {
            Self::Failed { operation, .. }
            | Self::Panicked { operation, .. }
            | Self::TimedOut { operation, .. }
            | Self::Cancelled { operation, .. } => *operation,
        }
    }

    /// Timeout-class failure (deadline or cancellation)
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. } | Self::Cancelled { .. })
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

/// Every sink failure from one dispatch call
#[derive(Debug)]
pub struct AggregateError {
    operation: SinkOperation,
    failures: Vec<SinkFailure>,
}

impl AggregateError {
    pub fn new(operation: SinkOperation, failures: Vec<SinkFailure>) -> Self {
        Self {
            operation,
            failures,
        }
    }

    pub fn operation(&self) -> SinkOperation {
        self.operation
    }

    pub fn failures(&self) -> &[SinkFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<SinkFailure> {
        self.failures
    }

    /// Names of all failed sinks, in registration order
    pub fn sink_names(&self) -> Vec<&str> {
        self.failures.iter().map(SinkFailure::sink).collect()
    }

    /// Whether `sink` is among the failed sinks
    pub fn contains(&self, sink: &str) -> bool {
        self.failures.iter().any(|f| f.sink() == sink)
    }

    /// Failure attributed to `sink`, if any
    pub fn failure_for(&self, sink: &str) -> Option<&SinkFailure> {
        self.failures.iter().find(|f| f.sink() == sink)
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed for {} sink(s)",
            self.operation,
            self.failures.len()
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Flush/ingest called before `start_all`
    #[error("{kind} dispatcher is not started")]
    NotStarted { kind: DispatcherKind },

    /// Register/start called after `start_all`
    #[error("{kind} dispatcher is already started")]
    AlreadyStarted { kind: DispatcherKind },

    /// Two sinks of the same kind share a name
    #[error("{kind} sink '{name}' is already registered")]
    DuplicateSink { kind: DispatcherKind, name: String },

    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// One or more sinks failed during a dispatch call
    #[error(transparent)]
    Sinks(#[from] AggregateError),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Per-sink failures (empty for lifecycle errors)
    pub fn failures(&self) -> &[SinkFailure] {
        match self {
            Self::Sinks(aggregate) => aggregate.failures(),
            _ => &[],
        }
    }

    /// Aggregate of per-sink failures, if this is one
    pub fn as_aggregate(&self) -> Option<&AggregateError> {
        match self {
            Self::Sinks(aggregate) => Some(aggregate),
            _ => None,
        }
    }
}
