use std::time::Duration;

use crate::config::RetryConfig;
use crate::types::error::StorageErrorKind;

const MAX_BACKOFF_EXPONENT: u32 = 31;

/// Delay before attempt `attempt + 1`: `initial * 2^(attempt - 1)`, capped at the maximum.
pub fn backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    let millis = config
        .initial_backoff_milliseconds
        .saturating_mul(1u64 << exponent)
        .min(config.max_backoff_milliseconds);

    Duration::from_millis(millis)
}

/// Whether a chunk that failed on attempt number `attempt` gets another one.
pub fn should_retry(config: &RetryConfig, kind: StorageErrorKind, attempt: u32) -> bool {
    kind.is_retryable() && attempt < config.max_attempts
}
