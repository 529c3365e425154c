//! Plain video entity model and DTOs.

use serde::{Deserialize, Serialize};
use signbank_core::assets::Video;
use signbank_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VideoRow {
    pub id: DbId,
    pub videofile: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a video record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVideo {
    pub videofile: String,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            id: row.id,
            videofile: row.videofile,
        }
    }
}
