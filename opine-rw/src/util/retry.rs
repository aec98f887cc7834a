//! Timeout retry logic
//!
//! Submission writes retry exactly once on timeout-class failures, after a
//! short fixed delay. Any other error, or a second timeout, propagates. The
//! policy is deliberately not a backoff loop: the respondent is waiting on
//! the submit button, and the whole batch is retried atomically or not at
//! all.

use std::time::Duration;

use opine_common::{Error, Result};

/// Run `operation`; on an [`Error::Timeout`] retry it once after `delay_ms`.
///
/// Classification is by error variant, never by message text.
pub async fn retry_once_on_timeout<F, Fut, T>(
    operation_name: &str,
    delay_ms: u64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    match operation().await {
        Ok(result) => Ok(result),
        Err(err) if err.is_timeout() => {
            tracing::warn!(
                operation = operation_name,
                delay_ms,
                error = %err,
                "Operation timed out, retrying once after delay"
            );
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            match operation().await {
                Ok(result) => {
                    tracing::info!(operation = operation_name, "Retry succeeded");
                    Ok(result)
                }
                Err(retry_err) => {
                    tracing::error!(
                        operation = operation_name,
                        error = %retry_err,
                        "Retry failed, giving up"
                    );
                    Err(retry_err)
                }
            }
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeds_first_attempt_without_delay() {
        let result = retry_once_on_timeout("test_op", 1, || async { Ok::<i32, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn timeout_then_success_retries_exactly_once() {
        let mut attempts = 0;

        let result = retry_once_on_timeout("test_op", 1, || {
            attempts += 1;
            async move {
                if attempts == 1 {
                    Err(Error::Timeout("first attempt".to_string()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn second_timeout_gives_up() {
        let mut attempts = 0;

        let result = retry_once_on_timeout("test_op", 1, || {
            attempts += 1;
            async move { Err::<i32, Error>(Error::Timeout("still down".to_string())) }
        })
        .await;

        assert!(result.unwrap_err().is_timeout());
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn non_timeout_error_fails_immediately() {
        let mut attempts = 0;

        let result = retry_once_on_timeout("test_op", 1, || {
            attempts += 1;
            async move { Err::<i32, Error>(Error::Internal("broken".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }
}
