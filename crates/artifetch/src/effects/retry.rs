use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use super::cancel::CancelToken;
use crate::plan::retry_delay;

#[derive(Debug)]
pub(crate) enum RetryError<E> {
    Cancelled,
    Failed { attempts: u32, error: E },
}

/// Run `op` up to `attempts` times, backing off exponentially between
/// attempts whose error `should_retry` accepts.
pub(crate) async fn with_retry<T, E, F, Fut>(
    attempts: u32,
    backoff: Duration,
    cancel: &CancelToken,
    label: &str,
    should_retry: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let Some(result) = cancel.run(op(attempt)).await else {
            return Err(RetryError::Cancelled);
        };
        match result {
            Ok(value) => return Ok(value),
            Err(error) if attempt < attempts && should_retry(&error) => {
                let delay = retry_delay(attempt - 1, backoff);
                tracing::warn!(
                    item = label,
                    attempt,
                    of = attempts,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "attempt failed, retrying"
                );
                if cancel.run(tokio::time::sleep(delay)).await.is_none() {
                    return Err(RetryError::Cancelled);
                }
            }
            Err(error) => return Err(RetryError::Failed { attempts: attempt, error }),
        }
    }
}
