//! Timing and outcome logging around remote calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

/// Await `fut`, logging its duration and whether it failed.
pub async fn with_logging<T, E, Fut>(operation: &str, fut: Fut) -> Result<T, E>
where
    E: Display,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let result = fut.await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => tracing::debug!(operation, elapsed_ms, "remote call succeeded"),
        Err(e) => tracing::warn!(operation, elapsed_ms, error = %e, "remote call failed"),
    }
    result
}
