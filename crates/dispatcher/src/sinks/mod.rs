//! Sink implementations
//!
//! Contains LogSink, FileSink, and BlackholeSink. Each implements both the
//! metric and the span contract.

mod blackhole;
mod file;
mod log;

pub use self::blackhole::BlackholeSink;
pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
