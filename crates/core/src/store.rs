//! Metadata persistence seams.
//!
//! The storage scheme never talks to a database directly. It persists
//! records through these traits; `signbank-db` implements them on
//! PostgreSQL and the in-memory versions back tests and embedded use.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use crate::assets::{GlossVideo, Video};
use crate::types::DbId;

/// Error returned by a store implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Persistence for gloss video records.
pub trait GlossVideoStore: Send + Sync {
    /// Persist the current `version` and `filename` of an existing record.
    fn save(&self, video: &GlossVideo) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove a record entirely.
    fn delete(&self, video: &GlossVideo) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Whether the gloss currently has a version-0 record.
    fn exists_with_version_zero(
        &self,
        gloss_id: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Insert a new current (version 0) record.
    fn create(
        &self,
        gloss_id: &str,
        filename: &str,
    ) -> impl Future<Output = Result<GlossVideo, StoreError>> + Send;

    /// All records for a gloss, lowest version first.
    fn list_for_gloss(
        &self,
        gloss_id: &str,
    ) -> impl Future<Output = Result<Vec<GlossVideo>, StoreError>> + Send;

    /// Every version-0 record across all glosses.
    fn list_current(&self) -> impl Future<Output = Result<Vec<GlossVideo>, StoreError>> + Send;
}

/// Persistence for plain video records.
pub trait VideoStore: Send + Sync {
    fn list(&self) -> impl Future<Output = Result<Vec<Video>, StoreError>> + Send;

    fn delete(&self, video: &Video) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Debug, thiserror::Error)]
#[error("{entity} with id {id} not found")]
pub struct RecordNotFound {
    pub entity: &'static str,
    pub id: DbId,
}

#[derive(Debug)]
struct Table<T> {
    next_id: DbId,
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            rows: Vec::new(),
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

/// Gloss video records held in memory.
#[derive(Debug, Default)]
pub struct InMemoryGlossVideoStore {
    table: Mutex<Table<GlossVideo>>,
}

impl InMemoryGlossVideoStore {
    /// Insert a record with an explicit version, bypassing `create`.
    pub fn insert(&self, gloss_id: &str, version: i32, filename: &str) -> GlossVideo {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let video = GlossVideo {
            id: table.next_id(),
            gloss_id: gloss_id.to_string(),
            version,
            filename: filename.to_string(),
        };
        table.rows.push(video.clone());
        video
    }

    pub fn get(&self, id: DbId) -> Option<GlossVideo> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.rows.iter().find(|v| v.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GlossVideoStore for InMemoryGlossVideoStore {
    async fn save(&self, video: &GlossVideo) -> Result<(), StoreError> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let row = table
            .rows
            .iter_mut()
            .find(|v| v.id == video.id)
            .ok_or(RecordNotFound {
                entity: "GlossVideo",
                id: video.id,
            })?;
        row.version = video.version;
        row.filename = video.filename.clone();
        Ok(())
    }

    async fn delete(&self, video: &GlossVideo) -> Result<(), StoreError> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.rows.retain(|v| v.id != video.id);
        Ok(())
    }

    async fn exists_with_version_zero(&self, gloss_id: &str) -> Result<bool, StoreError> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(table
            .rows
            .iter()
            .any(|v| v.gloss_id == gloss_id && v.version == 0))
    }

    async fn create(&self, gloss_id: &str, filename: &str) -> Result<GlossVideo, StoreError> {
        Ok(self.insert(gloss_id, 0, filename))
    }

    async fn list_for_gloss(&self, gloss_id: &str) -> Result<Vec<GlossVideo>, StoreError> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<GlossVideo> = table
            .rows
            .iter()
            .filter(|v| v.gloss_id == gloss_id)
            .cloned()
            .collect();
        rows.sort_by_key(|v| (v.version, v.id));
        Ok(rows)
    }

    async fn list_current(&self) -> Result<Vec<GlossVideo>, StoreError> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(table.rows.iter().filter(|v| v.is_current()).cloned().collect())
    }
}

/// Plain video records held in memory.
#[derive(Debug, Default)]
pub struct InMemoryVideoStore {
    table: Mutex<Table<Video>>,
}

impl InMemoryVideoStore {
    pub fn insert(&self, videofile: &str) -> Video {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let video = Video {
            id: table.next_id(),
            videofile: videofile.to_string(),
        };
        table.rows.push(video.clone());
        video
    }
}

impl VideoStore for InMemoryVideoStore {
    async fn list(&self) -> Result<Vec<Video>, StoreError> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(table.rows.clone())
    }

    async fn delete(&self, video: &Video) -> Result<(), StoreError> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.rows.retain(|v| v.id != video.id);
        Ok(())
    }
}
