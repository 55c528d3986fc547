//! Timeout utilities for page operations

use crate::driver::DriverError;
use std::future::Future;
use std::time::Duration;

/// Wraps a page operation with a hard timeout
///
/// # Arguments
///
/// * `operation` - The driver future to run
/// * `limit` - How long to wait before giving up
/// * `operation_name` - Name used in the timeout error
///
/// # Returns
///
/// * `Ok(T)` - The operation completed in time
/// * `Err(DriverError)` - The operation failed, or `DriverError::Timeout`
pub async fn with_page_timeout<F, T>(
    operation: F,
    limit: Duration,
    operation_name: &str,
) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout {
            operation: operation_name.to_string(),
            ms: limit.as_millis() as u64,
        }),
    }
}
