//! FlushContext - cancellation token plus optional deadline
//!
//! Threaded explicitly through every metric flush. Sinks honour it cooperatively
//! by racing their own work against [`FlushContext::done`].

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-call cancellation scope for a metric flush
#[derive(Debug, Clone)]
pub struct FlushContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl FlushContext {
    /// Context with no deadline that is only done once cancelled
    pub fn new() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// Context tied to an existing token (e.g. a process shutdown token)
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_at(Instant::now() + timeout)
    }

    /// Tighten the deadline; an earlier existing deadline wins
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derive a context that is cancelled with the parent but can also be
    /// cancelled on its own without affecting the parent
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Signal everyone holding this context (and its children) to stop
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the deadline has passed
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.is_expired()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` if unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Resolves when the context is cancelled or its deadline elapses
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

impl Default for FlushContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_resolves_done() {
        let ctx = FlushContext::with_timeout(Duration::from_millis(20));
        assert!(!ctx.is_done());

        tokio::time::timeout(Duration::from_secs(2), ctx.done())
            .await
            .expect("deadline should resolve done()");
        assert!(ctx.is_expired());
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_child_cancel_does_not_cancel_parent() {
        let parent = FlushContext::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let child2 = parent.child();
        parent.cancel();
        assert!(child2.is_cancelled());
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = FlushContext::new()
            .deadline_at(now + Duration::from_secs(5))
            .deadline_at(now + Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
        assert!(FlushContext::new().remaining().is_none());
    }
}
