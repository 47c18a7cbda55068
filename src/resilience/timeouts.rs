//! Attempt deadline enforcement.
//!
//! # Responsibilities
//! - Race an attempt against its deadline and its cancellation token
//! - Drop the attempt future (and any pending timer) as soon as one side wins
//!
//! # Design Decisions
//! - Uses Tokio's timer facilities
//! - Timeout and cancellation are reported separately from completion, so
//!   callers never mistake them for producer errors

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Result of racing one attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum AttemptRace<R> {
    /// The attempt settled before the deadline.
    Completed(R),
    /// The deadline elapsed first.
    TimedOut,
    /// The token was cancelled first.
    Cancelled,
}

/// Run `attempt` until it settles, `timeout` elapses, or `token` is cancelled.
pub async fn race_attempt<F>(token: &CancellationToken, timeout: Duration, attempt: F) -> AttemptRace<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => AttemptRace::Cancelled,
        result = attempt => AttemptRace::Completed(result),
        _ = tokio::time::sleep(timeout) => AttemptRace::TimedOut,
    }
}

/// Sleep for `delay` unless `token` is cancelled first. Returns `false` on cancellation.
pub async fn cancellable_sleep(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
