//! Bounded, immediate retry for operations at unreliable boundaries.

use std::future::Future;

use crate::error::{SuncastError, SuncastResult};

/// Run `op` up to `attempts` times (at least once), retrying immediately
/// while `should_retry` accepts the error. The 1-based attempt number is
/// passed to `op`. The last error is returned once attempts run out or a
/// non-retryable error is seen.
pub async fn retry<T, F, Fut, P>(
    label: &str,
    attempts: u32,
    should_retry: P,
    mut op: F,
) -> SuncastResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = SuncastResult<T>>,
    P: Fn(&SuncastError) -> bool,
{
    let limit = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < limit && should_retry(&err) => {
                tracing::debug!(
                    operation = label,
                    attempt,
                    limit,
                    error = %err,
                    "Attempt failed, retrying"
                );
                attempt += 1;
            }
            Err(err) => {
                tracing::debug!(operation = label, attempt, limit, error = %err, "Giving up");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = Cell::new(0);
        let result = retry("test", 3, SuncastError::is_transient, |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 3 {
                    Err(SuncastError::transient("http://x", "reset"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let calls = Cell::new(0);
        let result: SuncastResult<()> = retry("test", 3, |_| true, |attempt| {
            calls.set(calls.get() + 1);
            async move { Err(SuncastError::archive(format!("attempt {attempt}"))) }
        })
        .await;
        assert_eq!(calls.get(), 3);
        assert_eq!(result.unwrap_err().to_string(), "Archive error: attempt 3");
    }

    #[tokio::test]
    async fn test_stops_on_non_retryable_error() {
        let calls = Cell::new(0);
        let result: SuncastResult<()> = retry("test", 3, SuncastError::is_transient, |_| {
            calls.set(calls.get() + 1);
            async { Err(SuncastError::network("http://x", "404")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let result = retry("test", 0, |_| true, |_| {
            calls.set(calls.get() + 1);
            async { Ok::<_, SuncastError>(()) }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.get(), 1);
    }
}
