//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the resource cache.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Defaults applied to every fetch handle.
    pub fetch: FetchConfig,

    /// Retry configuration.
    pub retry: RetryConfig,

    /// Cache storage settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Per-handle fetch defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempt timeout in milliseconds.
    pub timeout_ms: u64,

    /// Start the fetch sequence as soon as a handle is created.
    pub fetch_on_mount: bool,

    /// Consult and populate the cache when a cache key is supplied.
    pub enable_cache: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            fetch_on_mount: true,
            enable_cache: false,
        }
    }
}

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Wait `delay_ms` before every retry.
    #[default]
    Fixed,
    /// Double the delay per retry (with jitter), capped at `max_delay_ms`.
    Exponential,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,

    /// Delay before each retry in milliseconds.
    pub delay_ms: u64,

    /// Delay strategy.
    pub backoff: BackoffKind,

    /// Upper bound for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay_ms: 1_000,
            backoff: BackoffKind::Fixed,
            max_delay_ms: 30_000,
        }
    }
}

/// Cache storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry time-to-live in milliseconds.
    pub ttl_ms: u64,

    /// Interval of the background purge task in seconds (0 = lazy eviction only).
    pub purge_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 300_000,
            purge_interval_secs: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
