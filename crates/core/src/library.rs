//! Gloss-level workflows on top of the version chain.
//!
//! [`GlossVideoLibrary`] owns the per-gloss lock that [`VersionChain`]
//! requires its callers to hold, so uploads and rollbacks for the same gloss
//! never interleave.

use std::path::Path;

use crate::assets::{GlossVideo, VideoAsset};
use crate::error::{CoreError, StorageError};
use crate::fs;
use crate::locks::KeyedLocks;
use crate::naming::{numbered_name, upload_name};
use crate::poster::{FrameExtractor, PosterCache};
use crate::storage::MediaStorage;
use crate::store::GlossVideoStore;
use crate::versioning::{RevertOutcome, VersionChain};

/// Bound on the numbered-name search for a colliding upload.
const MAX_UPLOAD_NAME_ATTEMPTS: u32 = 1024;

pub struct GlossVideoLibrary<S, E> {
    storage: MediaStorage,
    store: S,
    posters: PosterCache<E>,
    glosses: KeyedLocks<String>,
}

impl<S: GlossVideoStore, E: FrameExtractor> GlossVideoLibrary<S, E> {
    pub fn new(storage: MediaStorage, store: S, extractor: E) -> Self {
        Self {
            storage,
            store,
            posters: PosterCache::new(extractor),
            glosses: KeyedLocks::new(),
        }
    }

    pub fn storage(&self) -> &MediaStorage {
        &self.storage
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn posters(&self) -> &PosterCache<E> {
        &self.posters
    }

    /// Make the file at `incoming` the current video for `gloss_id`.
    ///
    /// The previous current version is pushed back in its chain first, then
    /// the upload is moved into the shadow tree and recorded as version 0.
    /// If the upload cannot be placed, the superseded versions are put back
    /// and the gloss keeps its current video.
    pub async fn add_version(
        &self,
        gloss_id: &str,
        incoming: &Path,
        original_filename: &str,
    ) -> Result<GlossVideo, StorageError> {
        let _guard = self.glosses.lock(gloss_id.to_string()).await;

        if !fs::exists(incoming).await? {
            return Err(StorageError::NotFound(incoming.to_path_buf()));
        }

        let chain = VersionChain::new(&self.storage, &self.store);
        let current: Vec<GlossVideo> = self
            .store
            .list_for_gloss(gloss_id)
            .await
            .map_err(StorageError::Persistence)?
            .into_iter()
            .filter(GlossVideo::is_current)
            .collect();
        let name = self.free_upload_name(original_filename, &current).await?;

        let mut advanced = Vec::with_capacity(current.len());
        for previous in current {
            let mut video = previous.clone();
            if let Err(e) = chain.advance(&mut video).await {
                undo_advances(&chain, advanced).await;
                return Err(e);
            }
            advanced.push((video, previous));
        }

        match self.place_upload(gloss_id, incoming, &name).await {
            Ok(video) => {
                tracing::info!(gloss_id, filename = %video.filename, "Added gloss video");
                Ok(video)
            }
            Err(e) => {
                tracing::warn!(gloss_id, error = %e, "Upload not placed, restoring previous version");
                undo_advances(&chain, advanced).await;
                Err(e)
            }
        }
    }

    /// Storage name for an upload of `original_filename`.
    ///
    /// The plain upload name is used when it is free or held by the gloss's
    /// own current video (which is about to move aside). Otherwise a numbered
    /// variant is picked so another gloss's file is never touched.
    async fn free_upload_name(
        &self,
        original_filename: &str,
        current: &[GlossVideo],
    ) -> Result<String, StorageError> {
        let name = upload_name(self.storage.gloss_video_dir(), original_filename);
        for n in 0..MAX_UPLOAD_NAME_ATTEMPTS {
            let candidate = if n == 0 {
                name.clone()
            } else {
                numbered_name(&name, n)
            };
            let ours = current.iter().any(|v| v.filename == candidate);
            if ours || !fs::exists(&self.storage.path(&candidate)).await? {
                return Ok(candidate);
            }
        }
        Err(CoreError::Conflict(format!(
            "no free storage name for '{name}' after {MAX_UPLOAD_NAME_ATTEMPTS} attempts"
        ))
        .into())
    }

    /// Move the upload to `name` and record it as the current version. The
    /// file goes back to `incoming` if the record cannot be created.
    async fn place_upload(
        &self,
        gloss_id: &str,
        incoming: &Path,
        name: &str,
    ) -> Result<GlossVideo, StorageError> {
        if self
            .store
            .exists_with_version_zero(gloss_id)
            .await
            .map_err(StorageError::Persistence)?
        {
            return Err(CoreError::Conflict(format!(
                "gloss '{gloss_id}' still has a current video after superseding it"
            ))
            .into());
        }

        let dest = self.storage.path(name);
        fs::move_file(incoming, &dest).await?;

        match self.store.create(gloss_id, name).await {
            Ok(video) => Ok(video),
            Err(e) => {
                if let Err(undo) = fs::move_file(&dest, incoming).await {
                    tracing::error!(
                        gloss_id,
                        path = %dest.display(),
                        error = %undo,
                        "Failed to move upload back; file has no record"
                    );
                }
                Err(StorageError::Persistence(e))
            }
        }
    }

    /// Roll every version of `gloss_id` back one step, lowest version first.
    ///
    /// The current video is deleted and every other version moves down one
    /// place, so the version-1 record takes over the current name.
    pub async fn roll_back(&self, gloss_id: &str) -> Result<Vec<RevertOutcome>, StorageError> {
        let _guard = self.glosses.lock(gloss_id.to_string()).await;

        let chain = VersionChain::new(&self.storage, &self.store);
        let videos = self
            .store
            .list_for_gloss(gloss_id)
            .await
            .map_err(StorageError::Persistence)?;

        let mut outcomes = Vec::with_capacity(videos.len());
        for mut video in videos {
            outcomes.push(chain.revert(&mut video).await?);
        }
        Ok(outcomes)
    }

    /// The version-0 record for `gloss_id`, if any.
    pub async fn current(&self, gloss_id: &str) -> Result<Option<GlossVideo>, StorageError> {
        let videos = self
            .store
            .list_for_gloss(gloss_id)
            .await
            .map_err(StorageError::Persistence)?;
        Ok(videos.into_iter().find(GlossVideo::is_current))
    }

    /// Poster URL for `video`, generating the image if needed. `None` when
    /// no poster can be produced.
    pub async fn poster_url(&self, video: &GlossVideo) -> Option<String> {
        self.posters
            .ensure_or_degrade(&video.path(&self.storage))
            .await
            .map(|_| video.poster_url(&self.storage))
    }
}

/// Put superseded versions back, newest advance first. Failures are logged;
/// the caller is already returning an error.
async fn undo_advances<S: GlossVideoStore>(
    chain: &VersionChain<'_, S>,
    advanced: Vec<(GlossVideo, GlossVideo)>,
) {
    for (mut video, previous) in advanced.into_iter().rev() {
        if let Err(e) = chain.undo_advance(&mut video, &previous).await {
            tracing::error!(
                gloss_id = %previous.gloss_id,
                filename = %video.filename,
                error = %e,
                "Failed to restore superseded gloss video"
            );
        }
    }
}
