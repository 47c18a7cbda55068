//! Live fetch handles.
//!
//! # Fetch sequence
//! ```text
//! execute / mount:  cache probe ──hit──▶ deliver cached value (silent)
//!                        │ miss
//! refetch: reset() ──────┤
//!                        ▼
//!                  supersede previous attempt (cancel token, bump generation)
//!                        ▼
//!              ┌──▶ loading = true, error = None
//!              │         ▼
//!              │   race producer / timeout / cancellation
//!              │         ├─ Ok      → cache, data, on_success
//!              │         ├─ timeout → loading = false (silent)
//!              │         └─ Err     → attempts left?
//!              └── wait delay ◀─yes──┘   no → error, on_error
//! ```
//!
//! Every state mutation is checked against the handle's current generation
//! under the same lock that supersession takes, so a stale attempt can never
//! write state or fire callbacks once a newer one has started. Terminal commits
//! and their callbacks additionally run under a per-handle delivery lock, so
//! consumers see callbacks in commit order and the last one matches `data`.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cache::ResourceCache;
use crate::fetch::error::{BoxError, CancelReason, FetchError};
use crate::fetch::options::FetchOptions;
use crate::fetch::producer::Producer;
use crate::fetch::state::{FetchOutcome, RequestState};
use crate::observability::metrics;
use crate::resilience::timeouts::cancellable_sleep;
use crate::resilience::{race_attempt, AttemptRace};

/// Identifies the sequence allowed to mutate a handle's state.
struct Ticket {
    generation: u64,
    token: CancellationToken,
}

struct Active {
    generation: u64,
    token: CancellationToken,
    closed: bool,
}

impl Active {
    /// Cancel whatever is in flight and issue a ticket for a new sequence.
    fn supersede(&mut self) -> Ticket {
        self.token.cancel();
        self.generation += 1;
        self.token = CancellationToken::new();
        Ticket {
            generation: self.generation,
            token: self.token.clone(),
        }
    }

    fn check(&self, ticket: &Ticket) -> Result<(), CancelReason> {
        if self.closed {
            Err(CancelReason::TornDown)
        } else if self.generation != ticket.generation {
            Err(CancelReason::Superseded)
        } else {
            Ok(())
        }
    }
}

struct Shared<T> {
    id: Uuid,
    producer: Box<dyn Producer<T>>,
    options: FetchOptions<T>,
    cache: ResourceCache,
    state: watch::Sender<RequestState<T>>,
    active: Mutex<Active>,
    delivery: Mutex<()>,
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn lock_active(&self) -> MutexGuard<'_, Active> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the state only if `ticket` still owns the handle.
    fn commit(
        &self,
        ticket: &Ticket,
        f: impl FnOnce(&mut RequestState<T>),
    ) -> Result<(), CancelReason> {
        let active = self.lock_active();
        active.check(ticket)?;
        self.state.send_modify(f);
        Ok(())
    }

    /// Commit a terminal state and fire its callback as one step.
    ///
    /// The callback is skipped if a newer sequence started after the commit;
    /// that sequence's own delivery waits for this one to finish.
    fn deliver(
        &self,
        ticket: &Ticket,
        f: impl FnOnce(&mut RequestState<T>),
        notify: impl FnOnce(),
    ) -> Result<(), CancelReason> {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        self.commit(ticket, f)?;
        if self.lock_active().check(ticket).is_ok() {
            notify();
        }
        Ok(())
    }

    fn cancel_reason(&self, ticket: &Ticket) -> CancelReason {
        self.lock_active()
            .check(ticket)
            .err()
            .unwrap_or(CancelReason::Superseded)
    }

    /// Deliver a live cache entry, if any. Cache hits do not fire `on_success`.
    fn deliver_cached(&self) -> Option<T> {
        let key = self.options.cache_slot()?;
        let value = self.cache.get::<T>(key)?;

        let mut active = self.lock_active();
        // An older in-flight attempt must not overwrite the cached delivery.
        active.supersede();
        self.state.send_modify(|state| {
            state.data = Some(value.clone());
            state.loading = false;
            state.error = None;
        });
        drop(active);

        tracing::debug!(handle = %self.id, key, "Served from cache");
        Some(value)
    }

    /// Start a new sequence: cancel the previous one and enter loading.
    fn begin(&self) -> Ticket {
        let mut active = self.lock_active();
        let ticket = active.supersede();
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        ticket
    }

    fn finish(&self, outcome: FetchOutcome<T>, started: Instant) -> FetchOutcome<T> {
        let label = match &outcome {
            FetchOutcome::Fresh(_) | FetchOutcome::Cached(_) => "success",
            FetchOutcome::Failed(_) => "failure",
            FetchOutcome::Cancelled(reason) => reason.as_str(),
        };
        metrics::record_fetch_outcome(label, started.elapsed());
        outcome
    }

    async fn drive(self: Arc<Self>, ticket: Ticket) -> FetchOutcome<T> {
        let started = Instant::now();
        let retry = self.options.retry;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if attempt > 1 {
                if let Err(reason) = self.commit(&ticket, |state| {
                    state.loading = true;
                    state.error = None;
                }) {
                    return self.finish(FetchOutcome::Cancelled(reason), started);
                }
            }

            metrics::record_fetch_attempt();
            tracing::debug!(handle = %self.id, attempt, max_attempts = retry.max_attempts, "Invoking producer");

            let attempt_token = ticket.token.child_token();
            let producer = &self.producer;
            let produce_token = attempt_token.clone();
            let call = AssertUnwindSafe(async move { producer.produce(produce_token).await }).catch_unwind();

            let failure = match race_attempt(&ticket.token, self.options.timeout, call).await {
                AttemptRace::Completed(Ok(Ok(value))) => {
                    let committed = self.deliver(
                        &ticket,
                        |state| {
                            if let Some(key) = self.options.cache_slot() {
                                self.cache.insert(key, value.clone());
                            }
                            state.data = Some(value.clone());
                            state.loading = false;
                            state.error = None;
                        },
                        || {
                            if let Some(on_success) = &self.options.on_success {
                                on_success(&value);
                            }
                        },
                    );
                    if let Err(reason) = committed {
                        tracing::debug!(handle = %self.id, %reason, "Discarding stale result");
                        return self.finish(FetchOutcome::Cancelled(reason), started);
                    }

                    tracing::debug!(handle = %self.id, attempt, "Fetch succeeded");
                    return self.finish(FetchOutcome::Fresh(value), started);
                }
                AttemptRace::Completed(Ok(Err(source))) => FetchError::producer(attempt, source),
                AttemptRace::Completed(Err(panic)) => FetchError::Panicked {
                    attempts: attempt,
                    message: panic_message(panic.as_ref()),
                },
                AttemptRace::TimedOut => {
                    attempt_token.cancel();
                    let reason = match self.commit(&ticket, |state| state.loading = false) {
                        Ok(()) => {
                            tracing::warn!(
                                handle = %self.id,
                                attempt,
                                timeout = ?self.options.timeout,
                                "Attempt timed out"
                            );
                            CancelReason::TimedOut
                        }
                        Err(reason) => reason,
                    };
                    return self.finish(FetchOutcome::Cancelled(reason), started);
                }
                AttemptRace::Cancelled => {
                    let reason = self.cancel_reason(&ticket);
                    tracing::debug!(handle = %self.id, %reason, "Attempt cancelled");
                    return self.finish(FetchOutcome::Cancelled(reason), started);
                }
            };

            if retry.should_retry(attempt) {
                let delay = retry.delay_for(attempt);
                tracing::warn!(
                    handle = %self.id,
                    attempt,
                    delay = ?delay,
                    error = %failure,
                    "Attempt failed, retrying"
                );
                if !cancellable_sleep(&ticket.token, delay).await {
                    let reason = self.cancel_reason(&ticket);
                    return self.finish(FetchOutcome::Cancelled(reason), started);
                }
                continue;
            }

            let committed = self.deliver(
                &ticket,
                |state| {
                    state.error = Some(failure.clone());
                    state.loading = false;
                },
                || {
                    if let Some(on_error) = &self.options.on_error {
                        on_error(&failure);
                    }
                },
            );
            if let Err(reason) = committed {
                return self.finish(FetchOutcome::Cancelled(reason), started);
            }

            tracing::warn!(handle = %self.id, attempts = attempt, error = %failure, "Fetch failed");
            return self.finish(FetchOutcome::Failed(failure), started);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A live view of one resource: its state plus `refetch`/`reset` controls.
///
/// Dropping the handle cancels any in-flight attempt and discards its result.
/// Fetch sequences run as Tokio tasks, so handles must be used inside a runtime.
pub struct ResourceHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<T>>,
}

impl<T> ResourceHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an idle handle. Nothing runs until `execute` or `refetch`.
    pub fn new<P>(cache: ResourceCache, producer: P, options: FetchOptions<T>) -> Self
    where
        P: Producer<T>,
    {
        let (state, _) = watch::channel(RequestState::default());
        let id = Uuid::new_v4();
        tracing::trace!(handle = %id, key = ?options.cache_key, "Handle created");

        Self {
            shared: Arc::new(Shared {
                id,
                producer: Box::new(producer),
                options,
                cache,
                state,
                active: Mutex::new(Active {
                    generation: 0,
                    token: CancellationToken::new(),
                    closed: false,
                }),
                delivery: Mutex::new(()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn options(&self) -> &FetchOptions<T> {
        &self.shared.options
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RequestState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.shared.state.borrow().data.clone()
    }

    pub fn error(&self) -> Option<FetchError> {
        self.shared.state.borrow().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().loading
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.shared.state.subscribe()
    }

    /// Wait until no attempt is loading and return the state at that point.
    pub async fn settled(&self) -> RequestState<T> {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.loading).await {
            Ok(state) => (*state).clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Run the full fetch sequence, probing the cache first.
    pub async fn execute(&self) -> FetchOutcome<T> {
        if let Some(value) = self.shared.deliver_cached() {
            return FetchOutcome::Cached(value);
        }
        let ticket = self.shared.begin();
        self.join(self.spawn(ticket)).await
    }

    /// Clear state and fetch live, bypassing the cache probe.
    pub async fn refetch(&self) -> FetchOutcome<T> {
        self.reset();
        let ticket = self.shared.begin();
        self.join(self.spawn(ticket)).await
    }

    /// Clear data and error, stop loading, and evict the cache key.
    ///
    /// An in-flight attempt is not cancelled; the next `execute`/`refetch`
    /// supersedes it.
    pub fn reset(&self) {
        self.shared.state.send_modify(RequestState::clear);
        if let Some(key) = &self.shared.options.cache_key {
            self.shared.cache.invalidate(key);
        }
        tracing::debug!(handle = %self.shared.id, "Handle reset");
    }

    /// Start the sequence without waiting for it.
    fn mount(&self) {
        if self.shared.deliver_cached().is_none() {
            let ticket = self.shared.begin();
            self.spawn(ticket);
        }
    }

    fn spawn(&self, ticket: Ticket) -> JoinHandle<FetchOutcome<T>> {
        tokio::spawn(Arc::clone(&self.shared).drive(ticket))
    }

    async fn join(&self, task: JoinHandle<FetchOutcome<T>>) -> FetchOutcome<T> {
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(handle = %self.shared.id, error = %e, "Fetch task aborted");
                FetchOutcome::Cancelled(CancelReason::TornDown)
            }
        }
    }
}

impl<T> Drop for ResourceHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        let mut active = self.shared.lock_active();
        active.closed = true;
        active.token.cancel();
    }
}

impl<T> std::fmt::Debug for ResourceHandle<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.shared.id)
            .field("state", &*self.shared.state.borrow())
            .finish()
    }
}

impl ResourceCache {
    /// Create a handle for `producer` and, unless `fetch_on_mount` is off,
    /// start fetching immediately.
    ///
    /// On a cache hit the returned handle already holds the data; otherwise it
    /// is already loading.
    pub fn run<T, F, Fut, E>(&self, producer: F, options: FetchOptions<T>) -> ResourceHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.run_with(producer, options)
    }

    /// Like [`ResourceCache::run`] for any [`Producer`] implementation.
    pub fn run_with<T, P>(&self, producer: P, options: FetchOptions<T>) -> ResourceHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        P: Producer<T>,
    {
        let fetch_on_mount = options.fetch_on_mount;
        let handle = ResourceHandle::new(self.clone(), producer, options);
        if fetch_on_mount {
            handle.mount();
        }
        handle
    }
}
