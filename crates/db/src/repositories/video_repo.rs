//! Repository for the `videos` table.

use signbank_core::types::DbId;
use sqlx::PgPool;

use crate::models::video::{CreateVideo, VideoRow};

const COLUMNS: &str = "id, videofile, created_at, updated_at";

pub struct VideoRepo;

impl VideoRepo {
    /// Insert a video record.
    pub async fn create(pool: &PgPool, input: &CreateVideo) -> Result<VideoRow, sqlx::Error> {
        let query = format!("INSERT INTO videos (videofile) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, VideoRow>(&query)
            .bind(&input.videofile)
            .fetch_one(pool)
            .await
    }

    /// Find a video by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<VideoRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, VideoRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all videos, oldest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<VideoRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos ORDER BY id ASC");
        sqlx::query_as::<_, VideoRow>(&query).fetch_all(pool).await
    }

    /// Permanently delete a video record. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
