//! TTL-bounded key/value store backing fetch handles.

use dashmap::DashMap;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::observability::metrics;

/// Default entry lifetime (five minutes).
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// A cached value and the instant it was stored.
struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > ttl
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
}

/// Snapshot of cache activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries evicted because they outlived the TTL.
    pub expired: u64,
}

enum Probe<T> {
    Hit(T),
    Miss,
    Expired,
}

/// Shared cache keyed by caller-chosen strings.
///
/// Cloning is cheap; clones share the same storage.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<DashMap<String, CacheEntry>>,
    counters: Arc<Counters>,
    ttl: Duration,
}

impl ResourceCache {
    /// Create an empty cache with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            counters: Arc::new(Counters::default()),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_ttl(Duration::from_millis(config.ttl_ms))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry.
    ///
    /// Expired entries are evicted and reported as absent. An entry stored
    /// with a different value type is also reported as absent.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        let probe = match self.inner.get(key) {
            None => Probe::Miss,
            Some(entry) if entry.is_expired(self.ttl, now) => Probe::Expired,
            Some(entry) => match entry.value.downcast_ref::<T>() {
                Some(value) => Probe::Hit(value.clone()),
                None => {
                    tracing::warn!(key, "Cached value has an unexpected type");
                    Probe::Miss
                }
            },
        };

        match probe {
            Probe::Hit(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup("hit");
                Some(value)
            }
            Probe::Miss => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup("miss");
                None
            }
            Probe::Expired => {
                let ttl = self.ttl;
                // A concurrent writer may have refreshed the key in between.
                if self.inner.remove_if(key, |_, e| e.is_expired(ttl, now)).is_some() {
                    self.counters.expired.fetch_add(1, Ordering::Relaxed);
                    metrics::record_cache_size(self.inner.len());
                }
                tracing::debug!(key, "Cache entry expired");
                metrics::record_cache_lookup("expired");
                None
            }
        }
    }

    /// Store a value, replacing any previous entry for `key`.
    pub fn insert<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        let entry = CacheEntry {
            value: Arc::new(value),
            stored_at: Instant::now(),
        };
        self.inner.insert(key.into(), entry);
        metrics::record_cache_size(self.inner.len());
    }

    /// Remove `key`. Returns whether an entry existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.inner.remove(key).is_some();
        if removed {
            metrics::record_cache_size(self.inner.len());
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .get(key)
            .map(|e| !e.is_expired(self.ttl, now))
            .unwrap_or(false)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let before = self.inner.len();
        self.inner.retain(|_, e| !e.is_expired(ttl, now));
        let removed = before.saturating_sub(self.inner.len());

        if removed > 0 {
            self.counters.expired.fetch_add(removed as u64, Ordering::Relaxed);
            metrics::record_cache_size(self.inner.len());
        }
        removed
    }

    pub fn clear(&self) {
        self.inner.clear();
        metrics::record_cache_size(0);
    }

    /// Number of stored entries, including ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.inner.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
