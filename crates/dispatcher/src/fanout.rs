//! Concurrent fan-out with per-sink failure isolation
//!
//! One task per sink, joined in registration order. A panic inside a sink is
//! caught by the task boundary; a sink still running when the context is done
//! is abandoned (detached, never aborted) and reported as timed out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use contracts::{ContractError, Diagnostics, FlushContext, SinkOperation};
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::Instrument;

use crate::error::SinkFailure;
use crate::handle::SinkHandle;

/// Result of one sink's call
pub(crate) type Outcome = Result<(), SinkFailure>;

/// Invoke `call` for every handle concurrently and collect the outcomes
///
/// Outcomes are returned in the same order as `handles`. With `ctx`, waiting is
/// bounded by `ctx.done()`; without it, every task is awaited to completion.
pub(crate) async fn fan_out<'a, S, F, Fut>(
    handles: impl IntoIterator<Item = &'a SinkHandle<S>>,
    operation: SinkOperation,
    ctx: Option<&FlushContext>,
    diagnostics: &Diagnostics,
    call: F,
) -> Vec<Outcome>
where
    S: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<S>) -> Fut,
    Fut: Future<Output = Result<(), ContractError>> + Send + 'static,
{
    let tasks: Vec<_> = handles
        .into_iter()
        .map(|handle| {
            handle.metrics().inc_call_count();
            let fut = call(Arc::clone(handle.sink()));
            let task = tokio::spawn(
                async move {
                    let begun = Instant::now();
                    let result = fut.await;
                    (result, begun.elapsed())
                }
                .in_current_span(),
            );
            (handle, task)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(tasks.len());
    for (handle, mut task) in tasks {
        let settled = match ctx {
            Some(ctx) => {
                tokio::select! {
                    biased;
                    joined = &mut task => Some(joined),
                    _ = ctx.done() => None,
                }
            }
            None => Some(task.await),
        };

        let outcome = settle(handle.name(), operation, ctx, settled);
        match &outcome {
            Ok(elapsed) => {
                handle.metrics().inc_success_count();
                diagnostics.record_success(handle.name(), operation, *elapsed);
            }
            Err(failure) => {
                handle.metrics().record_failure(failure);
                diagnostics.record_failure(handle.name(), operation, &failure.to_string());
            }
        }
        outcomes.push(outcome.map(|_| ()));
    }
    outcomes
}

/// Map a joined (or abandoned) task onto an attributed outcome
fn settle(
    sink: &str,
    operation: SinkOperation,
    ctx: Option<&FlushContext>,
    settled: Option<Result<(Result<(), ContractError>, Duration), JoinError>>,
) -> Result<Duration, SinkFailure> {
    match settled {
        Some(Ok((Ok(()), elapsed))) => Ok(elapsed),
        Some(Ok((Err(source), _))) => Err(SinkFailure::Failed {
            sink: sink.to_string(),
            operation,
            source,
        }),
        Some(Err(join_error)) if join_error.is_panic() => Err(SinkFailure::Panicked {
            sink: sink.to_string(),
            operation,
            message: panic_message(join_error),
        }),
        // Task cancelled by runtime shutdown
        Some(Err(_)) => Err(SinkFailure::Cancelled {
            sink: sink.to_string(),
            operation,
        }),
        None if ctx.is_some_and(FlushContext::is_cancelled) => Err(SinkFailure::Cancelled {
            sink: sink.to_string(),
            operation,
        }),
        None => Err(SinkFailure::TimedOut {
            sink: sink.to_string(),
            operation,
        }),
    }
}

fn panic_message(join_error: JoinError) -> String {
    let payload = join_error.into_panic();
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Split outcomes into the failures only
pub(crate) fn failures(outcomes: Vec<Outcome>) -> Vec<SinkFailure> {
    outcomes.into_iter().filter_map(Result::err).collect()
}
