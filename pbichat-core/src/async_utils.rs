//! Async helpers
//!
//! The pipeline bounds every external call; a timed-out call is reported
//! as that call's failure and is never retried automatically.

use crate::error::{ErrorContext, PbichatError, PbichatResult};
use tokio::time::{timeout, Duration};

/// Timeout wrapper for async operations
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> PbichatResult<T>
where
    F: std::future::Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(PbichatError::Timeout {
            operation: operation_name.to_string(),
            duration_ms: timeout_ms,
            context: ErrorContext::new("async_utils")
                .with_operation("timeout")
                .with_metadata("timeout_ms", &timeout_ms.to_string())
                .with_suggestion("Increase timeout duration")
                .with_suggestion("Check network connectivity"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fast_operation_completes() {
        let result = with_timeout(async { 42 }, 1000, "fast_op").await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn slow_operation_times_out() {
        let result = with_timeout(
            tokio::time::sleep(Duration::from_millis(200)),
            10,
            "slow_op",
        )
        .await;

        match result {
            Err(PbichatError::Timeout { operation, .. }) => assert_eq!(operation, "slow_op"),
            other => panic!("expected timeout error, got {:?}", other.is_ok()),
        }
    }
}
