//! Async resource fetching with timeout, retry, supersession, and caching.
//!
//! # Responsibilities
//! - Track per-handle `data` / `loading` / `error` state
//! - Cancel superseded attempts so only the latest one writes state
//! - Enforce a per-attempt timeout (silent) and bounded retries (surfaced)
//! - Read and populate the shared [`ResourceCache`](crate::cache::ResourceCache)
//!
//! # State Transitions
//! ```text
//! Idle → Loading: execute / refetch / mount
//! Loading → Success: producer resolved
//! Loading → Failed: producer rejected and attempts exhausted
//! Loading → Idle: timeout or supersession (no callback)
//! Success | Failed → Idle: reset / refetch
//! ```

pub mod error;
pub mod handle;
pub mod options;
pub mod producer;
pub mod state;

pub use error::{BoxError, CancelReason, FetchError};
pub use handle::ResourceHandle;
pub use options::{ErrorCallback, FetchOptions, SuccessCallback, DEFAULT_TIMEOUT};
pub use producer::Producer;
pub use state::{FetchOutcome, Phase, RequestState};
