//! Linear back-off retry for edge-function calls.
//!
//! [`retry_linear`] wraps one stage call. After the n-th failed attempt it
//! sleeps `n × delay_ms` before trying again, with no jitter, up to the
//! stage's attempt bound. Only transient failures are retried.

use std::future::Future;
use std::time::Duration;

use crate::error::PipelineError;

/// Returns `true` for errors that are worth another attempt.
///
/// **Retriable:** timeouts, connection failures, HTTP 429 and 5xx.
///
/// **Not retriable:** `{"error": ...}` bodies, undecodable JSON, template
/// errors, invalid requests, and other 4xx statuses.
pub(crate) fn is_retriable(err: &PipelineError) -> bool {
    match err {
        PipelineError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        PipelineError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
        PipelineError::Remote { .. }
        | PipelineError::Deserialize { .. }
        | PipelineError::Template { .. }
        | PipelineError::Catalog(_)
        | PipelineError::InvalidRequest(_)
        | PipelineError::Stage { .. } => false,
    }
}

/// Runs `operation` up to `max_attempts` times in total.
///
/// | Failed attempt | Sleep before next attempt |
/// |----------------|---------------------------|
/// | 1              | 1 × `delay_ms`            |
/// | 2              | 2 × `delay_ms`            |
/// | 3              | 3 × `delay_ms`            |
///
/// A `max_attempts` of zero is treated as one. Non-retriable errors are
/// returned immediately.
pub(crate) async fn retry_linear<T, F, Fut>(
    max_attempts: u32,
    delay_ms: u64,
    mut operation: F,
) -> Result<T, PipelineError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_attempts {
                    return Err(err);
                }
                let wait_ms = delay_ms.saturating_mul(u64::from(attempt));
                tracing::warn!(
                    attempt,
                    max_attempts,
                    wait_ms,
                    error = %err,
                    "transient function error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                attempt += 1;
            }
        }
    }
}
