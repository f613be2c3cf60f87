use std::future::Future;
use std::time::Duration;

use storage::repository::StorageError;

/// Storage calls that do not settle within this window fail with `StorageError::Timeout`.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) async fn bounded<T>(
    limit: Duration,
    op: &'static str,
    fut: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, StorageError> {
    if let Ok(res) = tokio::time::timeout(limit, fut).await {
        res
    } else {
        tracing::warn!(op, timeout = ?limit, "storage call timed out");
        Err(StorageError::Timeout)
    }
}
