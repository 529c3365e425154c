//! Poster backfill sweep.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use signbank_core::assets::VideoAsset;
use signbank_core::error::StorageError;
use signbank_core::poster::{FrameExtractor, PosterCache};
use signbank_core::storage::MediaStorage;
use signbank_core::store::{GlossVideoStore, VideoStore};

/// Counts from one pass over the stored videos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Videos looked at.
    pub checked: usize,
    /// Posters extracted during this pass.
    pub generated: usize,
    /// Videos whose poster could not be produced.
    pub failed: usize,
}

/// Generates missing posters for every displayed video.
pub struct PosterSweep<E> {
    storage: MediaStorage,
    posters: PosterCache<E>,
    concurrency: usize,
}

enum Outcome {
    Present,
    Generated,
    Failed,
}

impl<E: FrameExtractor> PosterSweep<E> {
    pub fn new(storage: MediaStorage, extractor: E, concurrency: usize) -> Self {
        Self {
            storage,
            posters: PosterCache::new(extractor),
            concurrency: concurrency.max(1),
        }
    }

    pub fn posters(&self) -> &PosterCache<E> {
        &self.posters
    }

    /// Run one pass. Only listing failures abort the sweep; individual
    /// extraction failures are logged and counted.
    pub async fn run_once<G, V>(
        &self,
        gloss_videos: &G,
        videos: &V,
    ) -> Result<SweepReport, StorageError>
    where
        G: GlossVideoStore,
        V: VideoStore,
    {
        let mut paths: Vec<PathBuf> = gloss_videos
            .list_current()
            .await
            .map_err(StorageError::Persistence)?
            .iter()
            .map(|v| v.path(&self.storage))
            .collect();
        paths.extend(
            videos
                .list()
                .await
                .map_err(StorageError::Persistence)?
                .iter()
                .map(|v| v.path(&self.storage)),
        );

        let outcomes: Vec<Outcome> = stream::iter(paths.iter())
            .map(|path| self.visit(path))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = SweepReport {
            checked: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Present => {}
                Outcome::Generated => report.generated += 1,
                Outcome::Failed => report.failed += 1,
            }
        }

        tracing::info!(
            checked = report.checked,
            generated = report.generated,
            failed = report.failed,
            "Poster sweep finished"
        );
        Ok(report)
    }

    async fn visit(&self, video: &Path) -> Outcome {
        match self.posters.lookup(video).await {
            Ok(Some(_)) => return Outcome::Present,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(video = %video.display(), error = %e, "Could not check poster");
                return Outcome::Failed;
            }
        }
        match self.posters.ensure(video).await {
            Ok(_) => Outcome::Generated,
            Err(e) => {
                tracing::warn!(video = %video.display(), error = %e, "Poster generation failed");
                Outcome::Failed
            }
        }
    }
}
