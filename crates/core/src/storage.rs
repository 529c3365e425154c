//! Locating stored media on disk and on the web.

use std::path::{Path, PathBuf};

use crate::config::StorageConfig;

/// Resolves storage names (paths relative to the media root) to filesystem
/// paths and public URLs.
///
/// A path and a URL built from the same name always share the same basename.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    media_url: String,
    mobile_url: String,
    gloss_video_dir: String,
    video_upload_dir: String,
}

impl MediaStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.storage_root.clone(),
            media_url: config.public_url_prefix.clone(),
            mobile_url: config.mobile_url_prefix.clone(),
            gloss_video_dir: config.gloss_video_dir.clone(),
            video_upload_dir: config.video_upload_dir.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn gloss_video_dir(&self) -> &str {
        &self.gloss_video_dir
    }

    pub fn video_upload_dir(&self) -> &str {
        &self.video_upload_dir
    }

    /// Absolute filesystem location of a stored name.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Public URL of a stored name.
    pub fn url(&self, name: &str) -> String {
        if self.media_url.ends_with('/') || self.media_url.is_empty() {
            format!("{}{name}", self.media_url)
        } else {
            format!("{}/{name}", self.media_url)
        }
    }

    /// Rewrite a public URL to the mobile prefix. URLs outside the media
    /// prefix are returned unchanged.
    pub fn mobile_url(&self, url: &str) -> String {
        match url.strip_prefix(self.media_url.as_str()) {
            Some(rest) if !self.media_url.is_empty() => format!("{}{rest}", self.mobile_url),
            _ => url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> MediaStorage {
        let mut config = StorageConfig::new("/srv/media");
        config.public_url_prefix = "/media/".into();
        config.mobile_url_prefix = "https://m.example.org/media/".into();
        MediaStorage::new(&config)
    }

    #[test]
    fn path_is_under_root() {
        assert_eq!(
            storage().path("glossvideo/HE/HELLO.mp4"),
            PathBuf::from("/srv/media/glossvideo/HE/HELLO.mp4")
        );
    }

    #[test]
    fn url_uses_media_prefix() {
        assert_eq!(
            storage().url("glossvideo/HE/HELLO.mp4"),
            "/media/glossvideo/HE/HELLO.mp4"
        );
    }

    #[test]
    fn url_inserts_missing_separator() {
        let mut config = StorageConfig::new("/srv/media");
        config.public_url_prefix = "/media".into();
        let storage = MediaStorage::new(&config);
        assert_eq!(storage.url("a/b.mp4"), "/media/a/b.mp4");
    }

    #[test]
    fn mobile_url_swaps_prefix() {
        let storage = storage();
        let url = storage.url("glossvideo/HE/HELLO.mp4");
        assert_eq!(
            storage.mobile_url(&url),
            "https://m.example.org/media/glossvideo/HE/HELLO.mp4"
        );
    }

    #[test]
    fn mobile_url_leaves_foreign_urls_alone() {
        assert_eq!(
            storage().mobile_url("https://elsewhere.org/x.mp4"),
            "https://elsewhere.org/x.mp4"
        );
    }
}
