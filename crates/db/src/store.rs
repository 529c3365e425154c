//! PostgreSQL implementations of the core metadata stores.

use signbank_core::assets::{GlossVideo, Video};
use signbank_core::store::{GlossVideoStore, RecordNotFound, StoreError, VideoStore};

use crate::models::gloss_video::CreateGlossVideo;
use crate::repositories::{GlossVideoRepo, VideoRepo};
use crate::DbPool;

/// [`GlossVideoStore`] over the `gloss_videos` table.
#[derive(Debug, Clone)]
pub struct PgGlossVideoStore {
    pool: DbPool,
}

impl PgGlossVideoStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl GlossVideoStore for PgGlossVideoStore {
    async fn save(&self, video: &GlossVideo) -> Result<(), StoreError> {
        GlossVideoRepo::update_version(&self.pool, video.id, video.version, &video.filename)
            .await?
            .ok_or(RecordNotFound {
                entity: "GlossVideo",
                id: video.id,
            })?;
        Ok(())
    }

    async fn delete(&self, video: &GlossVideo) -> Result<(), StoreError> {
        if !GlossVideoRepo::delete(&self.pool, video.id).await? {
            tracing::debug!(id = video.id, "Gloss video row already gone");
        }
        Ok(())
    }

    async fn exists_with_version_zero(&self, gloss_id: &str) -> Result<bool, StoreError> {
        Ok(GlossVideoRepo::exists_with_version_zero(&self.pool, gloss_id).await?)
    }

    async fn create(&self, gloss_id: &str, filename: &str) -> Result<GlossVideo, StoreError> {
        let input = CreateGlossVideo {
            gloss_id: gloss_id.to_string(),
            videofile: filename.to_string(),
        };
        Ok(GlossVideoRepo::create(&self.pool, &input).await?.into())
    }

    async fn list_for_gloss(&self, gloss_id: &str) -> Result<Vec<GlossVideo>, StoreError> {
        let rows = GlossVideoRepo::list_by_gloss(&self.pool, gloss_id).await?;
        Ok(rows.into_iter().map(GlossVideo::from).collect())
    }

    async fn list_current(&self) -> Result<Vec<GlossVideo>, StoreError> {
        let rows = GlossVideoRepo::list_current(&self.pool).await?;
        Ok(rows.into_iter().map(GlossVideo::from).collect())
    }
}

/// [`VideoStore`] over the `videos` table.
#[derive(Debug, Clone)]
pub struct PgVideoStore {
    pool: DbPool,
}

impl PgVideoStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl VideoStore for PgVideoStore {
    async fn list(&self) -> Result<Vec<Video>, StoreError> {
        let rows = VideoRepo::list(&self.pool).await?;
        Ok(rows.into_iter().map(Video::from).collect())
    }

    async fn delete(&self, video: &Video) -> Result<(), StoreError> {
        if !VideoRepo::delete(&self.pool, video.id).await? {
            tracing::debug!(id = video.id, "Video row already gone");
        }
        Ok(())
    }
}
