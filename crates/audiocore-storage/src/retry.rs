//! Bounded retry with exponential backoff and jitter for SDK calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{Result, StorageError};

/// Maximum number of attempts made for a single storage operation.
pub const MAX_ATTEMPTS: u32 = 4;

/// Base delay used to compute the exponential backoff schedule.
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on any single backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(10);

/// Run `f` up to [`MAX_ATTEMPTS`] times, retrying only when `is_retryable`
/// returns `true` for the error it produced.
///
/// Delays follow `BASE_DELAY * 2^attempt` capped at `MAX_DELAY`, with up to
/// 50% jitter added to avoid thundering-herd retries against the bucket.
pub async fn with_retry<T, E, F, Fut, R>(operation: &'static str, is_retryable: R, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<StorageError>,
    R: Fn(&StorageError) -> bool,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let storage_err = err.into();
                if attempt >= MAX_ATTEMPTS || !is_retryable(&storage_err) {
                    if attempt >= MAX_ATTEMPTS {
                        warn!(operation, attempt, "storage operation exhausted retries");
                        return Err(StorageError::RetriesExhausted {
                            operation,
                            attempts: attempt,
                        });
                    }
                    return Err(storage_err);
                }
                let delay = backoff_delay(attempt);
                warn!(operation, attempt, delay_ms = delay.as_millis() as u64, "retrying storage operation");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_DELAY.saturating_mul(1u32 << attempt.min(10));
    let capped = exp.min(MAX_DELAY);
    let jitter_fraction: f64 = rand::thread_rng().gen_range(0.0..0.5);
    capped.mul_f64(1.0 + jitter_fraction).min(MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_retry(
            "test_op",
            |_| true,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<u32, StorageError>(42) }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_immediately_on_non_retryable_error() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_retry(
            "test_op",
            |_| false,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, StorageError>(StorageError::NotFound { key: "k".into() }) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_for_persistently_retryable_error() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_retry(
            "test_op",
            |_| true,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<u32, StorageError>(StorageError::Download {
                        key: "k".into(),
                        source: "boom".into(),
                    })
                }
            },
        )
        .await;
        assert!(matches!(result, Err(StorageError::RetriesExhausted { attempts, .. }) if attempts == MAX_ATTEMPTS));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }
}
