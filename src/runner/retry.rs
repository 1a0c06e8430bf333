use crate::config::RetryConfig;
use crate::error::{FailureClass, StageError};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::warn;

/// Run one collaborator call under the centralized attempt policy:
/// per-attempt timeout, classification-driven retries with jittered
/// exponential backoff, and a wall-clock deadline across all attempts.
///
/// Transient failures retry up to `max_attempts`, malformed output gets
/// exactly one retry, permanent failures return immediately. Returns
/// the final result plus the number of attempts made.
pub(crate) async fn run_with_retry<T, F, Fut>(
    retry: &RetryConfig,
    attempt_timeout: Duration,
    deadline: Instant,
    mut call: F,
) -> (Result<T, StageError>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StageError>>,
{
    let mut attempts = 0u32;
    let mut backoff_ms = retry.backoff_base_ms;
    let mut malformed_retry_used = false;

    loop {
        let now = Instant::now();
        if now >= deadline {
            let err = StageError::transient(format!(
                "stage budget exhausted after {} attempts",
                attempts
            ));
            return (Err(err), attempts);
        }

        attempts += 1;
        let per_attempt = attempt_timeout.min(deadline - now);

        let err = match timeout(per_attempt, call()).await {
            Ok(Ok(value)) => return (Ok(value), attempts),
            Ok(Err(e)) => e,
            Err(_) => {
                StageError::transient(format!("attempt timed out after {:?}", per_attempt))
            }
        };

        match err.class {
            FailureClass::Permanent => {
                warn!("Attempt {} failed permanently: {}", attempts, err);
                return (Err(err), attempts);
            }
            FailureClass::Malformed => {
                // One retry only, no backoff: a fresh call either parses
                // or the failure is final.
                if malformed_retry_used {
                    warn!("Output still malformed after retry: {}", err);
                    return (Err(err), attempts);
                }
                malformed_retry_used = true;
                warn!(
                    "Attempt {} produced malformed output: {}. Retrying once...",
                    attempts, err
                );
            }
            FailureClass::Transient => {
                if attempts >= retry.max_attempts {
                    warn!("All {} attempts failed: {}", attempts, err);
                    return (Err(err), attempts);
                }

                // Jittered backoff: base * 2^attempt + random(0..base)
                let jitter = rand::random::<u64>() % retry.backoff_base_ms.max(1);
                let delay = Duration::from_millis(
                    backoff_ms.saturating_add(jitter).min(retry.backoff_cap_ms),
                );
                warn!(
                    "Attempt {} failed: {}. Retrying in {:?}...",
                    attempts, err, delay
                );

                // Never sleep past the deadline
                let remaining = deadline.saturating_duration_since(Instant::now());
                sleep(delay.min(remaining)).await;
                backoff_ms = backoff_ms.saturating_mul(2);
            }
        }
    }
}
