//! Resilience primitives for fetch attempts.
//!
//! # Data Flow
//! ```text
//! Fetch attempt:
//!     → timeouts.rs (race producer against deadline and cancellation token)
//!     → On failure: retries.rs (attempts left? how long to wait?)
//!         → backoff.rs (exponential delay with jitter, when configured)
//! ```
//!
//! # Design Decisions
//! - A timeout cancels the attempt; it is not a failure and is never retried
//! - Retry delays are cancellable, so superseded sequences release their timers

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{Backoff, RetryPolicy};
pub use timeouts::{race_attempt, AttemptRace};
