use std::sync::Arc;

use kindred_db::Database;
use tracing::error;

use crate::CompanionError;

/// Runs a blocking storage call off the async runtime.
pub(crate) async fn run<F, T>(db: &Arc<Database>, f: F) -> Result<T, CompanionError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            CompanionError::Storage(anyhow::anyhow!("storage task failed: {}", e))
        })?
        .map_err(CompanionError::storage)
}
