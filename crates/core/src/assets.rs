//! Stored video records and the capabilities they share.

use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::StorageError;
use crate::fs;
use crate::poster;
use crate::storage::MediaStorage;
use crate::store::VideoStore;
use crate::types::DbId;

/// Capabilities shared by every stored video.
///
/// Implementors only provide their storage name; everything else is derived
/// from it through a [`MediaStorage`].
pub trait VideoAsset: Sync {
    /// Path of the video relative to the media root.
    fn name(&self) -> &str;

    fn path(&self, storage: &MediaStorage) -> PathBuf {
        storage.path(self.name())
    }

    fn url(&self, storage: &MediaStorage) -> String {
        storage.url(self.name())
    }

    fn mobile_url(&self, storage: &MediaStorage) -> String {
        storage.mobile_url(&self.url(storage))
    }

    fn poster_path(&self, storage: &MediaStorage) -> PathBuf {
        poster::poster_path(&self.path(storage))
    }

    /// Poster URL. Assumes the poster was generated through the path.
    fn poster_url(&self, storage: &MediaStorage) -> String {
        poster::poster_url(&self.url(storage))
    }

    /// Delete the video and its poster. Files that are already gone are fine.
    fn delete_files(
        &self,
        storage: &MediaStorage,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        let video = self.path(storage);
        let poster = self.poster_path(storage);
        async move {
            if !fs::remove_if_exists(&video).await? {
                tracing::debug!(path = %video.display(), "Video file already absent");
            }
            fs::remove_if_exists(&poster).await?;
            Ok(())
        }
    }
}

/// An unversioned video uploaded to the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Video {
    pub id: DbId,
    /// Storage name relative to the media root.
    pub videofile: String,
}

impl VideoAsset for Video {
    fn name(&self) -> &str {
        &self.videofile
    }
}

/// One version of the video for a gloss.
///
/// `version == 0` is the version shown to users; superseded versions carry
/// one `.bak` suffix per step back in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlossVideo {
    pub id: DbId,
    pub gloss_id: String,
    pub version: i32,
    /// Storage name relative to the media root.
    pub filename: String,
}

impl GlossVideo {
    pub fn is_current(&self) -> bool {
        self.version == 0
    }
}

impl VideoAsset for GlossVideo {
    fn name(&self) -> &str {
        &self.filename
    }
}

/// Delete a plain video: files first (best-effort), then its record.
pub async fn delete_video<S: VideoStore>(
    storage: &MediaStorage,
    store: &S,
    video: &Video,
) -> Result<(), StorageError> {
    video.delete_files(storage).await?;
    store
        .delete(video)
        .await
        .map_err(StorageError::Persistence)?;
    tracing::info!(id = video.id, videofile = %video.videofile, "Deleted video");
    Ok(())
}
