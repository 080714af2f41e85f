//! Layered error definitions
//!
//! Categorized by source: config / sink lifecycle / io

use thiserror::Error;

/// Unified error type returned by sink implementations
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink could not finish its one-time setup
    #[error("sink '{sink_name}' start error: {message}")]
    SinkStart { sink_name: String, message: String },

    /// Sink could not deliver a metric batch
    #[error("sink '{sink_name}' flush error: {message}")]
    SinkFlush { sink_name: String, message: String },

    /// Sink rejected a single span
    #[error("sink '{sink_name}' ingest error: {message}")]
    SinkIngest { sink_name: String, message: String },

    /// Sink backend unreachable
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink start error
    pub fn sink_start(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkStart {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink flush error
    pub fn sink_flush(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkFlush {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink ingest error
    pub fn sink_ingest(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkIngest {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink connection error
    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_errors_carry_sink_name() {
        let err = ContractError::sink_start("backend-x", "connection refused");
        assert_eq!(
            err.to_string(),
            "sink 'backend-x' start error: connection refused"
        );

        let err = ContractError::sink_flush("statsd", "broken pipe");
        assert!(err.to_string().contains("statsd"));
        assert!(err.to_string().contains("flush"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ContractError = io.into();
        assert!(matches!(err, ContractError::Io(_)));
    }
}
