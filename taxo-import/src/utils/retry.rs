//! Single-retry wrapper for term persistence
//!
//! **Algorithm:**
//! 1. Attempt operation
//! 2. On success, return result
//! 3. On any error: log WARN, sleep `delay`, attempt once more
//! 4. A second failure is logged at ERROR and returned to the caller
//!
//! The retry is local to one write. It never restarts the batch.

use std::future::Future;
use std::time::Duration;
use taxo_common::Result;

/// Run `operation`, retrying exactly once after `delay` on failure
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "create term")
/// * `delay` - Fixed delay before the retry
/// * `operation` - Closure producing the write future; called at most twice
pub async fn retry_once<F, Fut, T>(operation_name: &str, delay: Duration, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match operation().await {
        Ok(result) => Ok(result),
        Err(first) => {
            tracing::warn!(
                operation = operation_name,
                error = %first,
                lock = first.is_lock_error(),
                retry_in_ms = delay.as_millis() as u64,
                "Write failed, retrying once"
            );

            tokio::time::sleep(delay).await;

            match operation().await {
                Ok(result) => {
                    tracing::debug!(operation = operation_name, "Write succeeded on retry");
                    Ok(result)
                }
                Err(second) => {
                    tracing::error!(
                        operation = operation_name,
                        error = %second,
                        "Write failed after retry"
                    );
                    Err(second)
                }
            }
        }
    }
}
