//! Retry delay policy for failing jobs

use std::time::Duration;

/// Delay before the first retry
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Ceiling for the retry delay
pub const DEFAULT_MAX_RETRY_TIMEOUT: Duration = Duration::from_secs(4 * 60 * 60);

/// Computes how long a job waits after `retry_count` consecutive failures
///
/// Returns `min(base * 2^(retry_count - 1), max)`. The first failure waits
/// exactly `base`; the delay then doubles until it saturates at `max`. A count
/// of zero is treated like one.
pub fn retry_delay(retry_count: u32, base: Duration, max: Duration) -> Duration {
    let exponent = retry_count.saturating_sub(1);

    2u32.checked_pow(exponent)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(max, |delay| delay.min(max))
}
