//! Filesystem primitives used by the storage scheme.
//!
//! Thin wrappers over `tokio::fs` that attach the operation and path to
//! every failure, and treat a missing file as success on deletes.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::StorageError;

/// Whether anything exists at `path`.
pub async fn exists(path: &Path) -> Result<bool, StorageError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| StorageError::io("stat", path, e))
}

/// Rename `from` to `to`. A single `rename(2)`, so never partially applied.
pub async fn rename(from: &Path, to: &Path) -> Result<(), StorageError> {
    tokio::fs::rename(from, to)
        .await
        .map_err(|e| StorageError::io("rename", from, e))
}

/// Remove the file at `path`. Returns `false` when there was nothing to remove.
pub async fn remove_if_exists(path: &Path) -> Result<bool, StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::io("unlink", path, e)),
    }
}

/// Create the parent directory of `path` and any missing ancestors.
pub async fn ensure_parent_dir(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io("mkdir", parent, e))?;
    }
    Ok(())
}

/// Move a file into place, falling back to copy + unlink when `rename`
/// cannot cross filesystems. Refuses to overwrite an existing destination.
pub async fn move_file(from: &Path, to: &Path) -> Result<(), StorageError> {
    if exists(to).await? {
        return Err(StorageError::io(
            "move",
            to,
            std::io::Error::new(ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }
    ensure_parent_dir(to).await?;

    let rename_err = match tokio::fs::rename(from, to).await {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StorageError::NotFound(from.to_path_buf()))
        }
        Err(e) => e,
    };

    tracing::debug!(
        from = %from.display(),
        to = %to.display(),
        error = %rename_err,
        "Rename failed, copying instead"
    );
    if let Err(copy_err) = tokio::fs::copy(from, to).await {
        // Do not leave a truncated copy behind.
        let _ = tokio::fs::remove_file(to).await;
        return Err(StorageError::io("copy", from, copy_err));
    }
    tokio::fs::remove_file(from)
        .await
        .map_err(|e| StorageError::io("unlink", from, e))
}
