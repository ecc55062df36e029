use std::time::Duration;

/// Delay before retrying an operation that already failed `retry_count` times.
///
/// First attempts run immediately; retries wait `base`, `2 * base`,
/// `4 * base`, ... never exceeding `cap`.
pub fn backoff_delay(retry_count: u32, base: Duration, cap: Duration) -> Duration {
    if retry_count == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.checked_pow(retry_count - 1).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(cap, |delay| delay.min(cap))
}
