//! Fetch sequence behaviour: success, retry, timeout, supersession, reset.

use std::time::Duration;

use async_resource_cache::{
    CancelReason, FetchOptions, FetchOutcome, Phase, ResourceCache, RetryPolicy,
};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

mod common;
use common::{Calls, Recorder};

#[tokio::test(start_paused = true)]
async fn test_success_sets_data_and_fires_callback_once() {
    let cache = ResourceCache::new();
    let calls = Calls::new();
    let successes = Recorder::<u32>::new();
    let errors = Recorder::<String>::new();

    let s = successes.clone();
    let e = errors.clone();
    let handle = cache.run(
        common::flaky(calls.clone(), 0, 7u32),
        FetchOptions::new()
            .on_success(move |v| s.push(*v))
            .on_error(move |err| e.push(err.to_string())),
    );

    assert!(handle.is_loading(), "mount enters loading synchronously");
    assert_eq!(handle.state().phase(), Phase::Loading);

    let state = handle.settled().await;
    assert_eq!(state.data, Some(7));
    assert!(state.error.is_none());
    assert!(!state.loading);
    assert_eq!(state.phase(), Phase::Success);

    assert_eq!(calls.count(), 1);
    assert_eq!(successes.values(), vec![7]);
    assert_eq!(errors.len(), 0);
    assert!(cache.is_empty(), "caching is off by default");
}

#[tokio::test(start_paused = true)]
async fn test_rejecting_producer_retried_until_exhausted() {
    let cache = ResourceCache::new();
    let calls = Calls::new();
    let errors = Recorder::<u32>::new();
    let e = errors.clone();

    let handle = cache.run(
        common::failing(calls.clone()),
        FetchOptions::new()
            .fetch_on_mount(false)
            .retry(RetryPolicy::fixed(3, Duration::from_millis(1_000)))
            .on_error(move |err| e.push(err.attempts())),
    );

    let started = Instant::now();
    let outcome = handle.execute().await;
    let elapsed = started.elapsed();

    assert_eq!(calls.count(), 3);
    assert!(elapsed >= Duration::from_millis(2_000), "two delays between three attempts");
    assert!(elapsed < Duration::from_millis(3_000));
    assert_eq!(errors.values(), vec![3]);

    let error = outcome.error().cloned().expect("failed outcome");
    assert!(common::is_producer_error(&error, 3));
    assert_eq!(error.to_string(), "producer failed after 3 attempt(s): boom #3");

    let state = handle.state();
    assert!(!state.loading);
    assert!(state.data.is_none());
    assert_eq!(state.phase(), Phase::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_error_stays_clear_between_retries() {
    let cache = ResourceCache::new();
    let calls = Calls::new();
    let handle = cache.run(
        common::failing(calls.clone()),
        FetchOptions::new().retry(RetryPolicy::fixed(2, Duration::from_millis(500))),
    );

    // First attempt has failed, the retry delay is pending.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.count(), 1);
    let mid = handle.state();
    assert!(mid.loading);
    assert!(mid.error.is_none());

    let end = handle.settled().await;
    assert_eq!(calls.count(), 2);
    assert!(end.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_silent_and_not_retried() {
    let cache = ResourceCache::new();
    let calls = Calls::new();
    let successes = Recorder::<u32>::new();
    let errors = Recorder::<String>::new();
    let s = successes.clone();
    let e = errors.clone();
    let seen_token = std::sync::Arc::new(std::sync::Mutex::new(None::<CancellationToken>));
    let t = seen_token.clone();
    let c = calls.clone();

    let handle = cache.run(
        move |token: CancellationToken| {
            c.hit();
            *t.lock().unwrap() = Some(token);
            std::future::pending::<Result<u32, std::io::Error>>()
        },
        FetchOptions::new()
            .timeout(Duration::from_millis(1_000))
            .retry(RetryPolicy::fixed(3, Duration::from_millis(10)))
            .on_success(move |v| s.push(*v))
            .on_error(move |err| e.push(err.to_string())),
    );

    let started = Instant::now();
    let state = handle.settled().await;
    assert!(started.elapsed() >= Duration::from_millis(1_000));

    assert!(!state.loading);
    assert!(state.error.is_none());
    assert!(state.data.is_none());
    assert_eq!(state.phase(), Phase::Idle);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(calls.count(), 1, "timeouts are never retried");
    assert_eq!(successes.len(), 0);
    assert_eq!(errors.len(), 0);

    let token = seen_token.lock().unwrap().clone().unwrap();
    assert!(token.is_cancelled(), "producer observes the cancellation");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_outcome_reported_to_awaiting_caller() {
    let cache = ResourceCache::new();
    let handle = cache.run(
        |_| std::future::pending::<Result<u32, std::io::Error>>(),
        FetchOptions::new()
            .fetch_on_mount(false)
            .timeout(Duration::from_millis(250)),
    );

    let outcome = handle.execute().await;
    assert_eq!(outcome.cancel_reason(), Some(CancelReason::TimedOut));
}

#[tokio::test(start_paused = true)]
async fn test_refetch_supersedes_pending_attempt() {
    let cache = ResourceCache::new();
    let calls = Calls::new();
    let successes = Recorder::<&'static str>::new();
    let errors = Recorder::<String>::new();
    let s = successes.clone();
    let e = errors.clone();

    let (first_tx, first_rx) = oneshot::channel::<Result<&'static str, std::io::Error>>();
    let first_rx = std::sync::Arc::new(std::sync::Mutex::new(Some(first_rx)));
    let c = calls.clone();

    let handle = cache.run(
        move |_token| {
            let n = c.hit();
            let pending = first_rx.lock().unwrap().take();
            async move {
                match pending {
                    Some(rx) if n == 1 => rx.await.unwrap_or(Ok("dropped")),
                    _ => Ok("second"),
                }
            }
        },
        FetchOptions::new()
            .on_success(move |v| s.push(*v))
            .on_error(move |err| e.push(err.to_string())),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.count(), 1);
    assert!(handle.is_loading());

    let outcome = handle.refetch().await;
    assert!(matches!(outcome, FetchOutcome::Fresh("second")));

    // The stale attempt resolves late; nothing must change.
    let _ = first_tx.send(Ok("first"));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let state = handle.state();
    assert_eq!(state.data, Some("second"));
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(successes.values(), vec!["second"]);
    assert_eq!(errors.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_failure_never_surfaces() {
    let cache = ResourceCache::new();
    let calls = Calls::new();
    let errors = Recorder::<String>::new();
    let e = errors.clone();
    let c = calls.clone();

    let handle = cache.run(
        move |_token| {
            let n = c.hit();
            async move {
                if n == 1 {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Err(std::io::Error::new(std::io::ErrorKind::Other, "stale failure"))
                } else {
                    Ok(n)
                }
            }
        },
        FetchOptions::new().on_error(move |err| e.push(err.to_string())),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    let outcome = handle.execute().await;
    assert!(matches!(outcome, FetchOutcome::Fresh(2)));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.data(), Some(2));
    assert!(handle.error().is_none());
    assert_eq!(errors.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_supersession_during_retry_delay() {
    let cache = ResourceCache::new();
    let calls = Calls::new();
    let c = calls.clone();

    let handle = cache.run(
        move |_token| {
            let n = c.hit();
            async move {
                if n == 1 {
                    Err(std::io::Error::new(std::io::ErrorKind::Other, "first"))
                } else {
                    Ok(n)
                }
            }
        },
        FetchOptions::new().retry(RetryPolicy::fixed(3, Duration::from_secs(10))),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.count(), 1, "first attempt failed, waiting to retry");

    let outcome = handle.refetch().await;
    assert!(matches!(outcome, FetchOutcome::Fresh(2)));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(calls.count(), 2, "cancelled retry timer never fires");
}

#[tokio::test(start_paused = true)]
async fn test_reset_clears_state_without_cancelling() {
    let cache = ResourceCache::new();
    let calls = Calls::new();
    let handle = cache.run(common::flaky(calls.clone(), 0, 11u32), FetchOptions::new());
    handle.settled().await;
    assert_eq!(handle.data(), Some(11));

    handle.reset();
    let state = handle.state();
    assert!(state.data.is_none());
    assert!(state.error.is_none());
    assert!(!state.loading);
    assert_eq!(state.phase(), Phase::Idle);

    // An in-flight attempt survives reset and still commits.
    let slow = cache.run(
        common::slow(calls.clone(), Duration::from_millis(200)),
        FetchOptions::new(),
    );
    slow.reset();
    assert!(!slow.is_loading());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(slow.data(), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_retry_then_success_scenario() {
    #[derive(Debug, Clone, PartialEq)]
    struct User {
        id: u32,
    }

    let cache = ResourceCache::new();
    let calls = Calls::new();
    let successes = Recorder::<User>::new();
    let s = successes.clone();

    let handle = cache.run(
        common::flaky(calls.clone(), 1, User { id: 42 }),
        FetchOptions::new()
            .cached("user:42")
            .timeout(Duration::from_millis(1_000))
            .retry(RetryPolicy::fixed(2, Duration::from_millis(100)))
            .on_success(move |u: &User| s.push(u.clone())),
    );

    let state = handle.settled().await;
    assert_eq!(state.data, Some(User { id: 42 }));
    assert!(!state.loading);
    assert!(state.error.is_none());

    assert_eq!(calls.count(), 2);
    assert_eq!(successes.values(), vec![User { id: 42 }]);
    assert_eq!(cache.get::<User>("user:42"), Some(User { id: 42 }));
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_observe_loading_transition() {
    let cache = ResourceCache::new();
    let calls = Calls::new();
    let handle = cache.run(
        common::slow(calls.clone(), Duration::from_millis(50)),
        FetchOptions::new().fetch_on_mount(false),
    );
    let mut rx = handle.subscribe();
    assert!(!rx.borrow_and_update().loading);

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            seen.push(state.loading);
            if !state.loading {
                break;
            }
        }
        seen
    });

    handle.execute().await;
    let seen = observer.await.unwrap();
    assert_eq!(seen.first(), Some(&true));
    assert_eq!(seen.last(), Some(&false));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_callback_matches_data_under_refetch_race() {
    let cache = ResourceCache::new();

    for _ in 0..500 {
        let calls = Calls::new();
        let successes = Recorder::<u32>::new();
        let s = successes.clone();
        let c = calls.clone();

        let handle = cache.run(
            move |_token| {
                let n = c.hit();
                async move {
                    if n == 1 {
                        tokio::task::yield_now().await;
                    }
                    Ok::<_, std::io::Error>(n)
                }
            },
            FetchOptions::new().on_success(move |v| s.push(*v)),
        );

        let outcome = handle.refetch().await;
        assert!(outcome.is_success());

        let data = handle.data();
        assert_eq!(successes.values().last().copied(), data);
        assert_eq!(outcome.into_value(), data);
    }
}
