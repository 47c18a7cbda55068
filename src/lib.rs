//! Async resource cache.
//!
//! Fetch values from caller-supplied async producers with a per-attempt
//! timeout, bounded retry, cancellation of superseded requests, and an
//! optional TTL cache shared across handles.
//!
//! ```no_run
//! use async_resource_cache::{FetchOptions, ResourceCache, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let cache = ResourceCache::new();
//! let handle = cache.run(
//!     |_token| async { Ok::<_, std::io::Error>(42u32) },
//!     FetchOptions::new()
//!         .cached("answer")
//!         .timeout(Duration::from_secs(1))
//!         .retry(RetryPolicy::fixed(2, Duration::from_millis(100))),
//! );
//! let state = handle.settled().await;
//! assert_eq!(state.data, Some(42));
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod fetch;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use cache::ResourceCache;
pub use config::Config;
pub use fetch::{CancelReason, FetchError, FetchOptions, FetchOutcome, Phase, RequestState, ResourceHandle};
pub use lifecycle::Shutdown;
pub use resilience::RetryPolicy;
