//! Pipeline statistics and summary output.

use std::time::Duration;

use dispatcher::{MetricsSnapshot, SinkState};
use observability::FlushSummary;

/// Per-sink view at the end of a run
#[derive(Debug, Clone)]
pub struct SinkReport {
    pub kind: &'static str,
    pub name: String,
    pub state: SinkState,
    pub calls: MetricsSnapshot,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Flush cycle totals
    pub flush: FlushSummary,

    /// Spans handed to the span dispatcher
    pub spans_ingested: u64,

    /// Total duration of the run
    pub duration: Duration,

    pub sinks: Vec<SinkReport>,
}

impl PipelineStats {
    /// Spans per second across all producers
    pub fn span_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.spans_ingested as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!();
        print!("{}", self.flush);

        println!("\n=== Spans ===");
        println!("Ingested: {}", self.spans_ingested);
        println!("Rate: {:.2}/s", self.span_rate());
        println!("Duration: {:.2}s", self.duration.as_secs_f64());

        if !self.sinks.is_empty() {
            println!("\n=== Sinks ===");
            for sink in &self.sinks {
                println!(
                    "  [{}] {} ({}): calls={} ok={} failed={} panics={} timeouts={}",
                    sink.kind,
                    sink.name,
                    sink.state,
                    sink.calls.call_count,
                    sink.calls.success_count,
                    sink.calls.failure_count,
                    sink.calls.panic_count,
                    sink.calls.timeout_count,
                );
            }
        }

        println!();
    }
}
