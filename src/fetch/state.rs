//! Observable request state and fetch outcomes.

use crate::fetch::error::{CancelReason, FetchError};

/// Current state of a handle.
#[derive(Debug, Clone)]
pub struct RequestState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<FetchError>,
}

/// Coarse lifecycle phase derived from a [`RequestState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Success,
    Failed,
}

impl<T> RequestState<T> {
    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Failed
        } else if self.data.is_some() {
            Phase::Success
        } else {
            Phase::Idle
        }
    }

    pub(crate) fn clear(&mut self) {
        self.data = None;
        self.loading = false;
        self.error = None;
    }
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Result of one awaited fetch sequence.
#[derive(Debug, Clone)]
pub enum FetchOutcome<T> {
    /// Produced by a live producer call.
    Fresh(T),
    /// Delivered from the cache without calling the producer.
    Cached(T),
    /// Retries exhausted.
    Failed(FetchError),
    /// Ended silently (timeout, supersession, or teardown).
    Cancelled(CancelReason),
}

impl<T> FetchOutcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FetchOutcome::Fresh(v) | FetchOutcome::Cached(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            FetchOutcome::Fresh(v) | FetchOutcome::Cached(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.value().is_some()
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            FetchOutcome::Cancelled(reason) => Some(*reason),
            _ => None,
        }
    }
}
