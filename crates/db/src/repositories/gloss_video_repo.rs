//! Repository for the `gloss_videos` table.

use signbank_core::types::DbId;
use sqlx::PgPool;

use crate::models::gloss_video::{CreateGlossVideo, GlossVideoRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, gloss_id, version, videofile, created_at, updated_at";

/// CRUD and version queries for gloss videos.
///
/// Renaming files is not this repository's job; it only records the
/// `(version, videofile)` pair the storage layer settled on.
pub struct GlossVideoRepo;

impl GlossVideoRepo {
    /// Insert a new current (version 0) gloss video.
    ///
    /// Fails with a unique violation on `uq_gloss_videos_current` if the
    /// gloss already has a current video.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGlossVideo,
    ) -> Result<GlossVideoRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO gloss_videos (gloss_id, version, videofile)
             VALUES ($1, 0, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GlossVideoRow>(&query)
            .bind(&input.gloss_id)
            .bind(&input.videofile)
            .fetch_one(pool)
            .await
    }

    /// Find a gloss video by its internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GlossVideoRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM gloss_videos WHERE id = $1");
        sqlx::query_as::<_, GlossVideoRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all versions of a gloss, ordered by version ascending.
    pub async fn list_by_gloss(
        pool: &PgPool,
        gloss_id: &str,
    ) -> Result<Vec<GlossVideoRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM gloss_videos
             WHERE gloss_id = $1
             ORDER BY version ASC, id ASC"
        );
        sqlx::query_as::<_, GlossVideoRow>(&query)
            .bind(gloss_id)
            .fetch_all(pool)
            .await
    }

    /// List the current (version 0) video of every gloss.
    pub async fn list_current(pool: &PgPool) -> Result<Vec<GlossVideoRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM gloss_videos WHERE version = 0 ORDER BY gloss_id ASC"
        );
        sqlx::query_as::<_, GlossVideoRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Record a new position in the version chain.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_version(
        pool: &PgPool,
        id: DbId,
        version: i32,
        videofile: &str,
    ) -> Result<Option<GlossVideoRow>, sqlx::Error> {
        let query = format!(
            "UPDATE gloss_videos SET version = $2, videofile = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GlossVideoRow>(&query)
            .bind(id)
            .bind(version)
            .bind(videofile)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a gloss video. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM gloss_videos WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether the gloss has a current (version 0) video.
    pub async fn exists_with_version_zero(
        pool: &PgPool,
        gloss_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM gloss_videos WHERE gloss_id = $1 AND version = 0)",
        )
        .bind(gloss_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
