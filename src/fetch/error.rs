//! Fetch failure and cancellation types.

use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by producers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Terminal failure of a fetch sequence, surfaced through `RequestState::error`
/// and the `on_error` callback once retries are exhausted.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The producer returned an error on its last permitted attempt.
    #[error("producer failed after {attempts} attempt(s): {source}")]
    Producer {
        attempts: u32,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The producer panicked on its last permitted attempt.
    #[error("producer panicked after {attempts} attempt(s): {message}")]
    Panicked { attempts: u32, message: String },
}

impl FetchError {
    pub(crate) fn producer(attempts: u32, source: BoxError) -> Self {
        FetchError::Producer {
            attempts,
            source: Arc::from(source),
        }
    }

    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Producer { attempts, .. } | FetchError::Panicked { attempts, .. } => *attempts,
        }
    }
}

/// Why an attempt ended without a terminal result. Never surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The attempt did not settle within the configured timeout.
    TimedOut,
    /// A newer fetch on the same handle took over.
    Superseded,
    /// The handle was dropped.
    TornDown,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::TimedOut => "timeout",
            CancelReason::Superseded => "superseded",
            CancelReason::TornDown => "torn_down",
        }
    }
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
