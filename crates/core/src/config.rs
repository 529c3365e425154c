//! Storage configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// Default public URL prefix for files under the media root.
pub const DEFAULT_MEDIA_URL: &str = "/media/";

/// Default upload directory for gloss videos, relative to the media root.
pub const DEFAULT_GLOSS_VIDEO_DIRECTORY: &str = "glossvideo";

/// Default upload directory for plain videos, relative to the media root.
pub const DEFAULT_VIDEO_UPLOAD_LOCATION: &str = "upload";

/// Default frame extractor program.
pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";

/// Default timeout for a single frame extraction, in seconds.
pub const DEFAULT_FRAME_EXTRACT_TIMEOUT_SECS: u64 = 30;

/// Where videos live on disk and how they are addressed from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Base directory of the shadow tree.
    pub storage_root: PathBuf,
    /// Prefix substituted for `storage_root` to build public URLs.
    pub public_url_prefix: String,
    /// Alternate prefix for mobile client URLs.
    pub mobile_url_prefix: String,
    /// Upload directory for gloss videos, relative to `storage_root`.
    pub gloss_video_dir: String,
    /// Upload directory for plain videos, relative to `storage_root`.
    pub video_upload_dir: String,
    /// Program invoked to extract poster frames.
    pub ffmpeg_binary: String,
    /// Upper bound on a single frame extraction.
    pub frame_extract_timeout: Duration,
}

impl StorageConfig {
    /// Build a configuration with defaults for everything but the root.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            public_url_prefix: DEFAULT_MEDIA_URL.to_string(),
            mobile_url_prefix: DEFAULT_MEDIA_URL.to_string(),
            gloss_video_dir: DEFAULT_GLOSS_VIDEO_DIRECTORY.to_string(),
            video_upload_dir: DEFAULT_VIDEO_UPLOAD_LOCATION.to_string(),
            ffmpeg_binary: DEFAULT_FFMPEG_BINARY.to_string(),
            frame_extract_timeout: Duration::from_secs(DEFAULT_FRAME_EXTRACT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default            |
    /// |------------------------------|--------------------|
    /// | `MEDIA_ROOT`                 | (required)         |
    /// | `MEDIA_URL`                  | `/media/`          |
    /// | `MEDIA_MOBILE_URL`           | value of MEDIA_URL |
    /// | `GLOSS_VIDEO_DIRECTORY`      | `glossvideo`       |
    /// | `VIDEO_UPLOAD_LOCATION`      | `upload`           |
    /// | `FFMPEG_BINARY`              | `ffmpeg`           |
    /// | `FRAME_EXTRACT_TIMEOUT_SECS` | `30`               |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage_root = var("MEDIA_ROOT")
            .map(PathBuf::from)
            .ok_or_else(|| CoreError::Validation("MEDIA_ROOT must be set".into()))?;

        let public_url_prefix = var("MEDIA_URL").unwrap_or_else(|| DEFAULT_MEDIA_URL.into());
        let mobile_url_prefix = var("MEDIA_MOBILE_URL").unwrap_or_else(|| public_url_prefix.clone());

        let gloss_video_dir = var("GLOSS_VIDEO_DIRECTORY")
            .unwrap_or_else(|| DEFAULT_GLOSS_VIDEO_DIRECTORY.into());
        let video_upload_dir = var("VIDEO_UPLOAD_LOCATION")
            .unwrap_or_else(|| DEFAULT_VIDEO_UPLOAD_LOCATION.into());
        let ffmpeg_binary = var("FFMPEG_BINARY").unwrap_or_else(|| DEFAULT_FFMPEG_BINARY.into());

        let timeout_secs = match var("FRAME_EXTRACT_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                CoreError::Validation(format!(
                    "FRAME_EXTRACT_TIMEOUT_SECS must be a valid u64, got '{raw}'"
                ))
            })?,
            None => DEFAULT_FRAME_EXTRACT_TIMEOUT_SECS,
        };

        Ok(Self {
            storage_root,
            public_url_prefix,
            mobile_url_prefix,
            gloss_video_dir: gloss_video_dir.trim_matches('/').to_string(),
            video_upload_dir: video_upload_dir.trim_matches('/').to_string(),
            ffmpeg_binary,
            frame_extract_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
