//! Lifecycle management.
//!
//! Background tasks (the cache janitor) subscribe to [`Shutdown`] and exit
//! when it is triggered.

pub mod shutdown;

pub use shutdown::Shutdown;
