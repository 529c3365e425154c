//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod gloss_video_repo;
pub mod video_repo;

pub use gloss_video_repo::GlossVideoRepo;
pub use video_repo::VideoRepo;
