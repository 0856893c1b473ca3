use backon::ExponentialBuilder;
use std::time::Duration;

/// Default backoff for completion requests
///
/// Drives both the plain JSON endpoints and the pause between fallback
/// attempts: 500ms initial, 4s cap, factor 2, jittered.
#[must_use]
pub fn default_backoff_builder() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(4))
        .with_max_times(4)
        .with_factor(2.0)
        .with_jitter()
}

/// Whether an HTTP status should be retried on the plain JSON endpoints
///
/// Retries on 408, 409, 429 and 5xx.
#[must_use]
pub const fn is_retryable_status(code: u16) -> bool {
    matches!(code, 408 | 409 | 429 | 500..=599)
}
