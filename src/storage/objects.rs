use super::ObjectStore;
use crate::error::{AppError, Result};

/// Delete uploaded objects by storage path.
///
/// Stops at the first failure without touching the remaining paths. Not
/// transactional with the database: callers delete objects first and rows
/// second, so an interruption can orphan objects but never leaves a row
/// pointing at a deleted object.
pub async fn delete_objects(store: &dyn ObjectStore, paths: &[String]) -> Result<()> {
    if paths.is_empty() {
        return Err(AppError::EmptyInput("paths"));
    }

    for path in paths {
        store.delete_object(path).await?;
    }

    tracing::info!("Deleted {} stored objects", paths.len());

    Ok(())
}
