//! Process-lifetime resource cache.
//!
//! # Data Flow
//! ```text
//! ResourceHandle (fetch sequence)
//!     → store.rs probe (live entry? return it, expired? evict lazily)
//!     → producer succeeds → store.rs insert (overwrites previous entry)
//!
//! janitor.rs (optional) → purge_expired() on an interval until shutdown
//! ```
//!
//! # Design Decisions
//! - The cache is an explicit value passed to consumers, never a global
//! - Entries are type-erased so handles of different value types share one cache
//! - No locking beyond DashMap's shards: concurrent writers race, last write wins

pub mod janitor;
pub mod store;

pub use store::{CacheStats, ResourceCache, DEFAULT_TTL};
