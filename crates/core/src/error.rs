use std::path::PathBuf;

use crate::ffmpeg::FfmpegError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Errors raised while moving, deleting, or deriving files in the shadow tree.
///
/// A missing file on a best-effort delete never shows up here; the deletion
/// helpers in [`crate::fs`] swallow it.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A file that the operation needs to act on is not on disk.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A filesystem primitive failed.
    #[error("Storage operation '{op}' failed on {}: {source}", path.display())]
    Storage {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A superseded record no longer matches the `.bak` naming convention.
    ///
    /// Never repaired automatically; an operator has to look at the archive.
    #[error("Backup chain corrupted for gloss '{gloss_id}': version {version} with file '{filename}'")]
    ChainCorruption {
        gloss_id: String,
        version: i32,
        filename: String,
    },

    /// The frame extractor could not produce a poster.
    #[error("Poster generation failed for {}: {source}", video.display())]
    Generation {
        video: PathBuf,
        #[source]
        source: FfmpegError,
    },

    /// No free backup name was found within the attempt bound.
    #[error("No free backup name for '{filename}' after {attempts} attempts")]
    BackupExhausted { filename: String, attempts: u32 },

    /// The metadata collaborator failed.
    #[error("Metadata persistence failed: {0}")]
    Persistence(#[source] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StorageError {
    /// Wrap an I/O error with the operation name and the path it touched.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            op,
            path: path.into(),
            source,
        }
    }
}
