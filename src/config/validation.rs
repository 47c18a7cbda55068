//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, at least one attempt)
//! - Check cross-field constraints (backoff cap vs base delay)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{BackoffKind, Config};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("fetch.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("retry.max_attempts must be at least 1")]
    NoAttempts,

    #[error("retry.max_delay_ms ({max_delay_ms}) is below retry.delay_ms ({delay_ms})")]
    BackoffCapBelowDelay { delay_ms: u64, max_delay_ms: u64 },

    #[error("cache.ttl_ms must be greater than zero")]
    ZeroTtl,

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.fetch.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::NoAttempts);
    }

    if config.retry.backoff == BackoffKind::Exponential
        && config.retry.max_delay_ms < config.retry.delay_ms
    {
        errors.push(ValidationError::BackoffCapBelowDelay {
            delay_ms: config.retry.delay_ms,
            max_delay_ms: config.retry.max_delay_ms,
        });
    }

    if config.cache.ttl_ms == 0 {
        errors.push(ValidationError::ZeroTtl);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
