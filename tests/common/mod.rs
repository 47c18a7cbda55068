//! Shared producers and probes for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_resource_cache::fetch::BoxError;
use async_resource_cache::FetchError;
use tokio_util::sync::CancellationToken;

/// Future returned by the immediate producers below.
pub type Ready<T> = std::future::Ready<Result<T, BoxError>>;

/// Error returned by scripted producers.
#[derive(Debug)]
pub struct Boom(pub u32);

impl std::fmt::Display for Boom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "boom #{}", self.0)
    }
}

impl std::error::Error for Boom {}

/// Counts producer invocations.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicU32>);

impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call and return its 1-based number.
    pub fn hit(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Records callback arguments.
#[derive(Clone)]
pub struct Recorder<T>(Arc<Mutex<Vec<T>>>);

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn push(&self, value: T) {
        self.0.lock().unwrap().push(value);
    }

    pub fn values(&self) -> Vec<T> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Producer that fails the first `failures` calls, then yields `value`.
pub fn flaky<T>(
    calls: Calls,
    failures: u32,
    value: T,
) -> impl Fn(CancellationToken) -> Ready<T> + Send + Sync + 'static
where
    T: Clone + Send + Sync + 'static,
{
    move |_token| {
        let n = calls.hit();
        let result = if n <= failures {
            Err(Box::new(Boom(n)) as BoxError)
        } else {
            Ok(value.clone())
        };
        std::future::ready(result)
    }
}

/// Producer that always fails.
pub fn failing(calls: Calls) -> impl Fn(CancellationToken) -> Ready<u32> + Send + Sync + 'static {
    move |_token| {
        let n = calls.hit();
        std::future::ready(Err(Box::new(Boom(n)) as BoxError))
    }
}

/// Producer that sleeps `delay` and then yields the call number.
pub fn slow(
    calls: Calls,
    delay: Duration,
) -> impl Fn(CancellationToken) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<u32, BoxError>> + Send>>
       + Send
       + Sync
       + 'static {
    move |_token| {
        let n = calls.hit();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(n)
        })
    }
}

pub fn is_producer_error(error: &FetchError, attempts: u32) -> bool {
    matches!(error, FetchError::Producer { attempts: a, .. } if *a == attempts)
}
