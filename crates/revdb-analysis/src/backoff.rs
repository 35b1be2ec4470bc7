//! Exponential back-off with jitter for analysis retries.

use std::time::Duration;

const MAX_DELAY_MS: u64 = 60_000;

/// Longest server-requested wait the queue will hold a review for.
pub(crate) const MAX_RETRY_AFTER: Duration = Duration::from_millis(MAX_DELAY_MS);

/// Delay before the attempt following `attempt` (1-based).
///
/// Schedule with `base_ms = 1_000`:
///
/// | Failed attempt | Sleep before next attempt    |
/// |----------------|------------------------------|
/// | 1              | 1 000 ms × 2⁰ ± 25 % jitter  |
/// | 2              | 1 000 ms × 2¹ ± 25 % jitter  |
/// | 3              | 1 000 ms × 2² ± 25 % jitter  |
///
/// Capped at 60 s before jitter. A server-supplied `floor` (from
/// `Retry-After`) is honoured when it is longer, up to [`MAX_RETRY_AFTER`].
pub(crate) fn retry_delay(base_ms: u64, attempt: u32, floor: Option<Duration>) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let capped = base_ms.saturating_mul(1u64 << exponent).min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    let delay = Duration::from_millis(jittered_ms);
    floor.map_or(delay, |floor| delay.max(floor.min(MAX_RETRY_AFTER)))
}
