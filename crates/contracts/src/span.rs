//! Span - one completed unit of tracing work

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A completed span, handed to every span sink as it arrives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub trace_id: u64,
    pub id: u64,
    #[serde(default)]
    pub parent_id: u64,

    /// Start time, nanoseconds since the Unix epoch
    pub start_timestamp: i64,
    /// End time, nanoseconds since the Unix epoch
    pub end_timestamp: i64,

    pub name: String,
    pub service: String,

    #[serde(default)]
    pub error: bool,

    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Span {
    /// Create a root span with no tags
    pub fn new(
        trace_id: u64,
        id: u64,
        name: impl Into<String>,
        service: impl Into<String>,
        start_timestamp: i64,
        end_timestamp: i64,
    ) -> Self {
        Self {
            trace_id,
            id,
            parent_id: 0,
            start_timestamp,
            end_timestamp,
            name: name.into(),
            service: service.into(),
            error: false,
            tags: HashMap::new(),
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Duration in nanoseconds (zero if the timestamps are inverted)
    pub fn duration_ns(&self) -> i64 {
        self.end_timestamp.saturating_sub(self.start_timestamp).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_never_negative() {
        let span = Span::new(1, 2, "op", "svc", 100, 350);
        assert_eq!(span.duration_ns(), 250);

        let inverted = Span::new(1, 3, "op", "svc", 500, 100);
        assert_eq!(inverted.duration_ns(), 0);
    }

    #[test]
    fn test_duration_extreme_timestamps_saturate() {
        let span = Span::new(1, 2, "op", "svc", i64::MIN, i64::MAX);
        assert_eq!(span.duration_ns(), i64::MAX);

        let inverted = Span::new(1, 2, "op", "svc", i64::MAX, i64::MIN);
        assert_eq!(inverted.duration_ns(), 0);
    }

    #[test]
    fn test_tags() {
        let span = Span::new(1, 2, "op", "svc", 0, 1).with_tag("http.status", "200");
        assert_eq!(span.tags.get("http.status").map(String::as_str), Some("200"));
    }
}
