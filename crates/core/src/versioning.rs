//! Backup-chain versioning of gloss videos.
//!
//! When a gloss gets a new upload, the current file is renamed in place to
//! the first free name in the chain `name`, `name.bak`, `name.bak.bak`, ...
//! and its version number grows by the number of suffixes appended. Reverting
//! strips one suffix again; reverting version 0 deletes the video for good.
//!
//! [`VersionChain`] does no locking. Callers must serialize `advance` and
//! `revert` per gloss id; [`crate::library::GlossVideoLibrary`] does.

use std::path::Path;

use crate::assets::{GlossVideo, VideoAsset};
use crate::error::StorageError;
use crate::fs;
use crate::poster::poster_path;
use crate::storage::MediaStorage;
use crate::store::GlossVideoStore;

/// Suffix appended once per supersession.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Upper bound on the free-name search in [`VersionChain::advance`].
pub const MAX_BACKUP_ATTEMPTS: u32 = 1024;

/// What [`VersionChain::revert`] did to the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertOutcome {
    /// The record moved one step down the chain and still exists.
    Restored,
    /// The record was at version 0; its files and metadata are gone.
    Deleted,
}

/// Name a superseded file gets back when it is restored, or `None` when
/// `filename` is not a backup name.
pub fn restored_name(filename: &str) -> Option<&str> {
    let restored = filename.strip_suffix(BACKUP_SUFFIX)?;
    let basename = restored.rsplit('/').next().unwrap_or(restored);
    (!basename.is_empty()).then_some(restored)
}

/// Advances and rolls back the version chain of single gloss video records.
#[derive(Debug)]
pub struct VersionChain<'a, S> {
    storage: &'a MediaStorage,
    store: &'a S,
    max_attempts: u32,
}

impl<'a, S: GlossVideoStore> VersionChain<'a, S> {
    pub fn new(storage: &'a MediaStorage, store: &'a S) -> Self {
        Self {
            storage,
            store,
            max_attempts: MAX_BACKUP_ATTEMPTS,
        }
    }

    /// Override the free-name search bound.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Push `video` one supersession back: rename its file to the next free
    /// backup name, drop its poster, and persist the new version.
    ///
    /// `video` is only updated once every step has succeeded.
    pub async fn advance(&self, video: &mut GlossVideo) -> Result<(), StorageError> {
        if video.version < 0 {
            return Err(corrupted(video));
        }

        let old_path = video.path(self.storage);
        let mut candidate = video.filename.clone();
        let mut version = video.version;
        let mut attempts = 0u32;

        while fs::exists(&self.storage.path(&candidate)).await? {
            if attempts == self.max_attempts {
                return Err(StorageError::BackupExhausted {
                    filename: video.filename.clone(),
                    attempts,
                });
            }
            candidate.push_str(BACKUP_SUFFIX);
            version += 1;
            attempts += 1;
        }

        if attempts == 0 {
            return Err(StorageError::io(
                "rename",
                old_path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "video file is missing"),
            ));
        }

        let new_path = self.storage.path(&candidate);
        fs::rename(&old_path, &new_path).await?;

        if let Err(e) = fs::remove_if_exists(&poster_path(&old_path)).await {
            undo_rename(&new_path, &old_path).await;
            return Err(e);
        }

        let updated = GlossVideo {
            version,
            filename: candidate,
            ..video.clone()
        };
        self.persist(&updated, &new_path, &old_path).await?;

        tracing::info!(
            gloss_id = %video.gloss_id,
            from = %video.filename,
            to = %updated.filename,
            version = updated.version,
            "Advanced gloss video"
        );
        *video = updated;
        Ok(())
    }

    /// Undo an [`advance`](Self::advance) of `previous` that produced
    /// `video`, putting the file back under its old name and version.
    ///
    /// Unlike [`revert`](Self::revert) this restores the exact prior state
    /// even when the advance skipped occupied backup names.
    pub async fn undo_advance(
        &self,
        video: &mut GlossVideo,
        previous: &GlossVideo,
    ) -> Result<(), StorageError> {
        let from = video.path(self.storage);
        let to = previous.path(self.storage);
        if fs::exists(&to).await? {
            return Err(StorageError::io(
                "rename",
                to,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "previous name is occupied",
                ),
            ));
        }

        fs::rename(&from, &to).await?;
        self.persist(previous, &to, &from).await?;

        tracing::info!(
            gloss_id = %previous.gloss_id,
            from = %video.filename,
            to = %previous.filename,
            version = previous.version,
            "Undid gloss video advance"
        );
        *video = previous.clone();
        Ok(())
    }

    /// Roll `video` back one step. At version 0 this deletes the video's
    /// files and its record.
    pub async fn revert(&self, video: &mut GlossVideo) -> Result<RevertOutcome, StorageError> {
        if video.version == 0 {
            video.delete_files(self.storage).await?;
            self.store
                .delete(video)
                .await
                .map_err(StorageError::Persistence)?;
            tracing::info!(
                gloss_id = %video.gloss_id,
                filename = %video.filename,
                "Deleted gloss video via revert"
            );
            return Ok(RevertOutcome::Deleted);
        }

        let restored = match restored_name(&video.filename) {
            Some(name) if video.version > 0 => name.to_string(),
            _ => return Err(corrupted(video)),
        };

        let old_path = video.path(self.storage);
        let new_path = self.storage.path(&restored);
        if fs::exists(&new_path).await? {
            return Err(StorageError::io(
                "rename",
                new_path,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "restored name is occupied",
                ),
            ));
        }

        fs::rename(&old_path, &new_path).await?;

        if let Err(e) = fs::remove_if_exists(&poster_path(&old_path)).await {
            undo_rename(&new_path, &old_path).await;
            return Err(e);
        }

        let updated = GlossVideo {
            version: video.version - 1,
            filename: restored,
            ..video.clone()
        };
        self.persist(&updated, &new_path, &old_path).await?;

        tracing::info!(
            gloss_id = %video.gloss_id,
            from = %video.filename,
            to = %updated.filename,
            version = updated.version,
            "Reverted gloss video"
        );
        *video = updated;
        Ok(RevertOutcome::Restored)
    }

    /// Save `updated`, moving the file back from `new_path` to `old_path`
    /// if the store refuses.
    async fn persist(
        &self,
        updated: &GlossVideo,
        new_path: &Path,
        old_path: &Path,
    ) -> Result<(), StorageError> {
        if let Err(e) = self.store.save(updated).await {
            undo_rename(new_path, old_path).await;
            return Err(StorageError::Persistence(e));
        }
        Ok(())
    }
}

fn corrupted(video: &GlossVideo) -> StorageError {
    tracing::error!(
        gloss_id = %video.gloss_id,
        version = video.version,
        filename = %video.filename,
        "Backup chain corrupted"
    );
    StorageError::ChainCorruption {
        gloss_id: video.gloss_id.clone(),
        version: video.version,
        filename: video.filename.clone(),
    }
}

async fn undo_rename(from: &Path, to: &Path) {
    if let Err(e) = fs::rename(from, to).await {
        tracing::error!(
            from = %from.display(),
            to = %to.display(),
            error = %e,
            "Failed to undo rename; file and metadata disagree"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use assert_matches::assert_matches;

    use super::*;
    use crate::config::StorageConfig;
    use crate::store::{InMemoryGlossVideoStore, StoreError};

    struct Fixture {
        dir: tempfile::TempDir,
        storage: MediaStorage,
        store: InMemoryGlossVideoStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("create temp dir");
            let storage = MediaStorage::new(&StorageConfig::new(dir.path()));
            Self {
                dir,
                storage,
                store: InMemoryGlossVideoStore::default(),
            }
        }

        fn chain(&self) -> VersionChain<'_, InMemoryGlossVideoStore> {
            VersionChain::new(&self.storage, &self.store)
        }

        fn touch(&self, name: &str, contents: &[u8]) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, contents).unwrap();
            path
        }

        fn file(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }
    }

    /// Store whose writes always fail.
    #[derive(Debug, Default)]
    struct BrokenStore;

    impl GlossVideoStore for BrokenStore {
        async fn save(&self, _video: &GlossVideo) -> Result<(), StoreError> {
            Err("connection reset".into())
        }
        async fn delete(&self, _video: &GlossVideo) -> Result<(), StoreError> {
            Err("connection reset".into())
        }
        async fn exists_with_version_zero(&self, _gloss_id: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn create(&self, _gloss_id: &str, _filename: &str) -> Result<GlossVideo, StoreError> {
            Err("connection reset".into())
        }
        async fn list_for_gloss(&self, _gloss_id: &str) -> Result<Vec<GlossVideo>, StoreError> {
            Ok(Vec::new())
        }
        async fn list_current(&self) -> Result<Vec<GlossVideo>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn restored_name_strips_one_suffix() {
        assert_eq!(restored_name("x.mp4.bak"), Some("x.mp4"));
        assert_eq!(restored_name("x.mp4.bak.bak"), Some("x.mp4.bak"));
        assert_eq!(restored_name("x.mp4"), None);
        assert_eq!(restored_name("glossvideo/HE/.bak"), None);
    }

    #[tokio::test]
    async fn advance_appends_one_suffix() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v0");
        let mut video = fx.store.insert("g", 0, "x.mp4");

        fx.chain().advance(&mut video).await.unwrap();

        assert_eq!(video.filename, "x.mp4.bak");
        assert_eq!(video.version, 1);
        assert!(!fx.file("x.mp4").exists());
        assert_eq!(std::fs::read(fx.file("x.mp4.bak")).unwrap(), b"v0");
        assert_eq!(fx.store.get(video.id).unwrap(), video);
    }

    #[tokio::test]
    async fn advance_skips_occupied_backup_names() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v0");
        fx.touch("x.mp4.bak", b"older");
        let mut video = fx.store.insert("g", 0, "x.mp4");

        fx.chain().advance(&mut video).await.unwrap();

        assert_eq!(video.filename, "x.mp4.bak.bak");
        assert_eq!(video.version, 2);
        assert_eq!(std::fs::read(fx.file("x.mp4.bak")).unwrap(), b"older");
        assert_eq!(std::fs::read(fx.file("x.mp4.bak.bak")).unwrap(), b"v0");
    }

    #[tokio::test]
    async fn advance_drops_old_poster() {
        let fx = Fixture::new();
        fx.touch("glossvideo/x./x.mp4", b"v0");
        fx.touch("glossvideo/x./x.jpg", b"poster");
        let mut video = fx.store.insert("g", 0, "glossvideo/x./x.mp4");

        fx.chain().advance(&mut video).await.unwrap();

        assert!(!fx.file("glossvideo/x./x.jpg").exists());
        // Not regenerated eagerly for the new name either.
        assert!(!fx.file("glossvideo/x./x.mp4.jpg").exists());
    }

    #[tokio::test]
    async fn advance_missing_source_leaves_record_alone() {
        let fx = Fixture::new();
        let mut video = fx.store.insert("g", 0, "x.mp4");
        let before = video.clone();

        let err = fx.chain().advance(&mut video).await.unwrap_err();

        assert_matches!(
            err,
            StorageError::Storage { op: "rename", ref source, .. }
                if source.kind() == std::io::ErrorKind::NotFound
        );
        assert_eq!(video, before);
        assert_eq!(fx.store.get(video.id).unwrap(), before);
    }

    #[tokio::test]
    async fn advance_gives_up_when_every_backup_name_is_taken() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v0");
        fx.touch("x.mp4.bak", b"v1");
        fx.touch("x.mp4.bak.bak", b"v2");
        fx.touch("x.mp4.bak.bak.bak", b"v3");
        let mut video = fx.store.insert("g", 0, "x.mp4");
        let before = video.clone();

        let err = fx
            .chain()
            .with_max_attempts(3)
            .advance(&mut video)
            .await
            .unwrap_err();

        assert_matches!(
            err,
            StorageError::BackupExhausted { ref filename, attempts: 3 } if filename == "x.mp4"
        );
        assert_eq!(video, before);
        assert_eq!(fx.store.get(video.id).unwrap(), before);
        assert_eq!(std::fs::read(fx.file("x.mp4")).unwrap(), b"v0");
        assert_eq!(std::fs::read(fx.file("x.mp4.bak.bak.bak")).unwrap(), b"v3");
        assert!(!fx.file("x.mp4.bak.bak.bak.bak").exists());
    }

    #[tokio::test]
    async fn advance_uses_last_free_name_within_bound() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v0");
        fx.touch("x.mp4.bak", b"v1");
        fx.touch("x.mp4.bak.bak", b"v2");
        let mut video = fx.store.insert("g", 0, "x.mp4");

        fx.chain()
            .with_max_attempts(3)
            .advance(&mut video)
            .await
            .unwrap();

        assert_eq!(video.filename, "x.mp4.bak.bak.bak");
        assert_eq!(video.version, 3);
    }

    #[tokio::test]
    async fn advance_persistence_failure_undoes_rename() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v0");
        let mut video = GlossVideo {
            id: 1,
            gloss_id: "g".into(),
            version: 0,
            filename: "x.mp4".into(),
        };
        let before = video.clone();

        let err = VersionChain::new(&fx.storage, &BrokenStore)
            .advance(&mut video)
            .await
            .unwrap_err();

        assert_matches!(err, StorageError::Persistence(_));
        assert_eq!(video, before);
        assert!(fx.file("x.mp4").exists());
        assert!(!fx.file("x.mp4.bak").exists());
    }

    #[tokio::test]
    async fn advance_then_revert_round_trips() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v0");
        let mut video = fx.store.insert("g", 0, "x.mp4");
        let chain = fx.chain();

        chain.advance(&mut video).await.unwrap();
        let outcome = chain.revert(&mut video).await.unwrap();

        assert_eq!(outcome, RevertOutcome::Restored);
        assert_eq!(video.version, 0);
        assert_eq!(video.filename, "x.mp4");
        assert_eq!(std::fs::read(fx.file("x.mp4")).unwrap(), b"v0");
        assert_eq!(fx.store.get(video.id).unwrap(), video);
    }

    #[tokio::test]
    async fn revert_drops_poster_of_backup_name() {
        let fx = Fixture::new();
        fx.touch("x.mp4.bak", b"v1");
        fx.touch("x.mp4.jpg", b"poster");
        let mut video = fx.store.insert("g", 1, "x.mp4.bak");

        fx.chain().revert(&mut video).await.unwrap();

        assert!(!fx.file("x.mp4.jpg").exists());
        assert!(fx.file("x.mp4").exists());
    }

    #[tokio::test]
    async fn revert_at_version_zero_deletes_everything() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v0");
        fx.touch("x.jpg", b"poster");
        let mut video = fx.store.insert("g", 0, "x.mp4");

        let outcome = fx.chain().revert(&mut video).await.unwrap();

        assert_eq!(outcome, RevertOutcome::Deleted);
        assert!(fx.store.get(video.id).is_none());
        assert!(!fx.file("x.mp4").exists());
        assert!(!fx.file("x.jpg").exists());
    }

    #[tokio::test]
    async fn revert_at_version_zero_tolerates_missing_files() {
        let fx = Fixture::new();
        let mut video = fx.store.insert("g", 0, "x.mp4");

        let outcome = fx.chain().revert(&mut video).await.unwrap();

        assert_eq!(outcome, RevertOutcome::Deleted);
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn revert_detects_corrupted_chain() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v2");
        fx.touch("x.jpg", b"poster");
        let mut video = fx.store.insert("g", 2, "x.mp4");
        let before = video.clone();

        let err = fx.chain().revert(&mut video).await.unwrap_err();

        assert_matches!(
            err,
            StorageError::ChainCorruption { version: 2, ref filename, .. } if filename == "x.mp4"
        );
        assert_eq!(video, before);
        assert_eq!(std::fs::read(fx.file("x.mp4")).unwrap(), b"v2");
        assert!(fx.file("x.jpg").exists());
        assert_eq!(fx.store.get(video.id).unwrap(), before);
    }

    #[tokio::test]
    async fn negative_version_is_corruption() {
        let fx = Fixture::new();
        fx.touch("x.mp4.bak", b"v");
        let mut video = fx.store.insert("g", -1, "x.mp4.bak");

        let err = fx.chain().revert(&mut video).await.unwrap_err();
        assert_matches!(err, StorageError::ChainCorruption { .. });

        let err = fx.chain().advance(&mut video).await.unwrap_err();
        assert_matches!(err, StorageError::ChainCorruption { .. });
    }

    #[tokio::test]
    async fn revert_refuses_to_clobber_restored_name() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"current");
        fx.touch("x.mp4.bak", b"backup");
        let mut video = fx.store.insert("g", 1, "x.mp4.bak");

        let err = fx.chain().revert(&mut video).await.unwrap_err();

        assert_matches!(err, StorageError::Storage { op: "rename", .. });
        assert_eq!(std::fs::read(fx.file("x.mp4")).unwrap(), b"current");
        assert_eq!(video.version, 1);
    }

    #[tokio::test]
    async fn revert_persistence_failure_undoes_rename() {
        let fx = Fixture::new();
        fx.touch("x.mp4.bak", b"v1");
        let mut video = GlossVideo {
            id: 1,
            gloss_id: "g".into(),
            version: 1,
            filename: "x.mp4.bak".into(),
        };

        let err = VersionChain::new(&fx.storage, &BrokenStore)
            .revert(&mut video)
            .await
            .unwrap_err();

        assert_matches!(err, StorageError::Persistence(_));
        assert_eq!(video.filename, "x.mp4.bak");
        assert!(fx.file("x.mp4.bak").exists());
        assert!(!fx.file("x.mp4").exists());
    }

    #[tokio::test]
    async fn undo_advance_restores_exact_prior_state() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v0");
        fx.touch("x.mp4.bak", b"older");
        let previous = fx.store.insert("g", 0, "x.mp4");
        let mut video = previous.clone();
        let chain = fx.chain();

        chain.advance(&mut video).await.unwrap();
        assert_eq!(video.version, 2);
        chain.undo_advance(&mut video, &previous).await.unwrap();

        assert_eq!(video, previous);
        assert_eq!(fx.store.get(video.id).unwrap(), previous);
        assert_eq!(std::fs::read(fx.file("x.mp4")).unwrap(), b"v0");
        assert_eq!(std::fs::read(fx.file("x.mp4.bak")).unwrap(), b"older");
        assert!(!fx.file("x.mp4.bak.bak").exists());
    }

    #[tokio::test]
    async fn undo_advance_refuses_to_clobber() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v0");
        let previous = fx.store.insert("g", 0, "x.mp4");
        let mut video = previous.clone();
        let chain = fx.chain();
        chain.advance(&mut video).await.unwrap();
        fx.touch("x.mp4", b"newcomer");

        let err = chain.undo_advance(&mut video, &previous).await.unwrap_err();

        assert_matches!(err, StorageError::Storage { op: "rename", .. });
        assert_eq!(video.filename, "x.mp4.bak");
        assert_eq!(std::fs::read(fx.file("x.mp4")).unwrap(), b"newcomer");
    }

    #[tokio::test]
    async fn gloss_id_never_changes() {
        let fx = Fixture::new();
        fx.touch("x.mp4", b"v0");
        let mut video = fx.store.insert("gloss-17", 0, "x.mp4");
        let chain = fx.chain();

        chain.advance(&mut video).await.unwrap();
        assert_eq!(video.gloss_id, "gloss-17");
        chain.revert(&mut video).await.unwrap();
        assert_eq!(video.gloss_id, "gloss-17");
    }
}
