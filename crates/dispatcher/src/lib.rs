//! # Dispatcher
//!
//! 指标与 span 分发模块。
//!
//! 负责：
//! - 管理 sink 生命周期（注册、启动、禁用）
//! - 并发 fan-out 到多个 sinks，隔离失败与 panic
//! - 按固定间隔驱动 flush 周期

pub mod error;
pub mod factory;
mod fanout;
pub mod handle;
pub mod metric;
pub mod metrics;
mod registry;
pub mod scheduler;
pub mod sinks;
pub mod span;

pub use error::{AggregateError, DispatcherError, DispatcherKind, SinkFailure};
pub use factory::{DispatcherBuilder, Dispatchers, create_dispatchers};
pub use handle::{SinkHandle, SinkState};
pub use metric::MetricDispatcher;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use scheduler::{CycleReport, FlushScheduler};
pub use sinks::{BlackholeSink, FileSink, FileSinkConfig, LogSink};
pub use span::SpanDispatcher;
