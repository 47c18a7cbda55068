//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! cache + fetch handles produce:
//!     → logging.rs (structured log events, handle id in every event)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Metrics go through the `metrics` facade; without an installed recorder they are no-ops
//! - Log level configurable via config and overridable with RUST_LOG

pub mod logging;
pub mod metrics;
