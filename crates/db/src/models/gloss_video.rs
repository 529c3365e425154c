//! Gloss video entity model and DTOs.

use serde::{Deserialize, Serialize};
use signbank_core::assets::GlossVideo;
use signbank_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `gloss_videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GlossVideoRow {
    pub id: DbId,
    pub gloss_id: String,
    /// 0 is the version shown to users.
    pub version: i32,
    pub videofile: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a gloss video record. New records are always current.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGlossVideo {
    pub gloss_id: String,
    pub videofile: String,
}

impl From<GlossVideoRow> for GlossVideo {
    fn from(row: GlossVideoRow) -> Self {
        GlossVideo {
            id: row.id,
            gloss_id: row.gloss_id,
            version: row.version,
            filename: row.videofile,
        }
    }
}
