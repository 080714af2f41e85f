//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the fan-out layer.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Payload model
//! - Metric batches are handed out as `&[InterMetric]` views over one shared allocation
//! - Spans are handed out as `Arc<Span>`; no sink may mutate what it receives

mod config;
mod context;
mod diagnostics;
mod error;
mod metric;
mod sink;
mod span;

pub use config::*;
pub use context::FlushContext;
pub use diagnostics::{Diagnostics, SinkOperation};
pub use error::*;
pub use metric::*;
pub use sink::*;
pub use span::Span;
