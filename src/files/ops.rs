//! Output directory creation and file removal.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use super::SourceError;

/// Creates `path` (and parents) if it does not exist yet. Idempotent.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the directory cannot be created.
pub async fn ensure_directory(path: &Path) -> Result<(), SourceError> {
    if tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir()) {
        debug!(path = %path.display(), "output directory exists");
        return Ok(());
    }

    info!(path = %path.display(), "creating output directory");
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| SourceError::io(path, e))
}

/// Removes the file at `path`. A missing file counts as success.
///
/// # Errors
///
/// Returns [`SourceError::Io`] for any failure other than "not found".
pub async fn delete_file(path: &Path) -> Result<(), SourceError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "file already absent");
            Ok(())
        }
        Err(e) => Err(SourceError::io(path, e)),
    }
}
