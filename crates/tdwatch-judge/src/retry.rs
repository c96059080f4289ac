//! Retry with exponential back-off and jitter for judgment calls.
//!
//! Only transport-level trouble is retried. A malformed answer is returned
//! immediately: asking again is the caller's decision, not the transport's.

use std::future::Future;
use std::time::Duration;

use crate::error::JudgeError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// Retriable: connect failures, timeouts, HTTP 429 and 5xx.
/// Not retriable: other 4xx, empty or malformed content, bad configuration.
pub(crate) fn is_retriable(err: &JudgeError) -> bool {
    match err {
        JudgeError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        JudgeError::Timeout { .. } => true,
        JudgeError::Api { status, .. } => *status == 429 || *status >= 500,
        JudgeError::EmptyResponse
        | JudgeError::Malformed { .. }
        | JudgeError::InvalidBaseUrl(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// The delay before attempt `n + 1` is `backoff_base_ms × 2^(n-1)` with ±25 %
/// jitter, capped at 30 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, JudgeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, JudgeError>>,
{
    const MAX_DELAY_MS: u64 = 30_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient judgment error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
