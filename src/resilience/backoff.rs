//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before retry number `retry` (1-based), doubling from `base` up to `max`.
///
/// Up to 10% jitter is added on top of the capped delay.
pub fn exponential_delay(retry: u32, base: Duration, max: Duration) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(retry - 1);
    let capped = base.saturating_mul(factor).min(max);

    let jitter_range = capped.as_millis() as u64 / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    capped + Duration::from_millis(jitter)
}
