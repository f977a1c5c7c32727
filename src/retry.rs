// ABOUTME: Generic retry wrapper with exponential backoff
// ABOUTME: Retries only errors the caller's error type classifies as transient

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Classification hook for retryable failures. Implemented by collaborator
/// error types; anything not transient propagates immediately.
pub trait Transience {
    fn is_transient(&self) -> bool;
}

/// Invokes `operation` up to `max_attempts` times, sleeping between
/// transient failures with a delay that doubles each attempt, starting at
/// `initial_delay`. Fatal errors and the last transient error after
/// exhaustion are returned to the caller.
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut operation: F,
    max_attempts: u32,
    initial_delay: Duration,
) -> Result<T, E>
where
    E: Transience + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delay = initial_delay;
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < max_attempts => {
                warn!(
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    %error,
                    "transient failure, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(error) => {
                if error.is_transient() {
                    warn!(max_attempts, %error, "retries exhausted");
                }
                return Err(error);
            }
        }
    }
}
