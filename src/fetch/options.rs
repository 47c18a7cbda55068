//! Per-handle fetch options.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::fetch::error::FetchError;
use crate::resilience::RetryPolicy;

/// Default attempt timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&FetchError) + Send + Sync>;

/// How a handle fetches, retries, and caches.
pub struct FetchOptions<T> {
    /// Cache key, globally unique per logical resource.
    pub cache_key: Option<String>,
    /// Consult and populate the cache (requires `cache_key`).
    pub enable_cache: bool,
    /// Per-attempt deadline.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Start fetching as soon as the handle is created.
    pub fetch_on_mount: bool,
    pub(crate) on_success: Option<SuccessCallback<T>>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl<T> FetchOptions<T> {
    pub fn new() -> Self {
        Self {
            cache_key: None,
            enable_cache: false,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            fetch_on_mount: true,
            on_success: None,
            on_error: None,
        }
    }

    /// Options seeded from the `[fetch]` and `[retry]` config sections.
    pub fn from_config(config: &Config) -> Self {
        Self {
            enable_cache: config.fetch.enable_cache,
            timeout: Duration::from_millis(config.fetch.timeout_ms),
            retry: RetryPolicy::from_config(&config.retry),
            fetch_on_mount: config.fetch.fetch_on_mount,
            ..Self::new()
        }
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    /// Shorthand for `cache_key(key).enable_cache(true)`.
    pub fn cached(self, key: impl Into<String>) -> Self {
        self.cache_key(key).enable_cache(true)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn fetch_on_mount(mut self, enabled: bool) -> Self {
        self.fetch_on_mount = enabled;
        self
    }

    /// Callbacks run on the fetch task in commit order. They must not block
    /// waiting on another fetch of the same handle.
    pub fn on_success(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&FetchError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Key to probe and populate, if caching is active.
    pub(crate) fn cache_slot(&self) -> Option<&str> {
        if self.enable_cache {
            self.cache_key.as_deref()
        } else {
            None
        }
    }
}

impl<T> Default for FetchOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FetchOptions<T> {
    fn clone(&self) -> Self {
        Self {
            cache_key: self.cache_key.clone(),
            enable_cache: self.enable_cache,
            timeout: self.timeout,
            retry: self.retry,
            fetch_on_mount: self.fetch_on_mount,
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T> std::fmt::Debug for FetchOptions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOptions")
            .field("cache_key", &self.cache_key)
            .field("enable_cache", &self.enable_cache)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("fetch_on_mount", &self.fetch_on_mount)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
