//! Poster images derived from videos.
//!
//! A poster is a still frame cached next to its video at the same path with
//! a `.jpg` extension. It is never authoritative: it can be deleted at any
//! time and is regenerated lazily on the next read.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::ffmpeg::FfmpegError;
use crate::fs;
use crate::locks::KeyedLocks;

/// Extension used for poster images.
pub const POSTER_EXTENSION: &str = "jpg";

/// Location of the poster for the video at `video_path`.
///
/// Only the final extension is replaced: `clip.tar.mp4` becomes
/// `clip.tar.jpg`, and a name without an extension gains one.
pub fn poster_path(video_path: &Path) -> PathBuf {
    video_path.with_extension(POSTER_EXTENSION)
}

/// Poster URL for a video URL, using the same extension rule as
/// [`poster_path`]. Never generates anything.
pub fn poster_url(video_url: &str) -> String {
    let base_start = video_url.rfind('/').map_or(0, |idx| idx + 1);
    let base = &video_url[base_start..];
    // Leading dots belong to the stem, as in `.hidden`.
    let leading_dots = base.len() - base.trim_start_matches('.').len();

    let stem_end = match base[leading_dots..].rfind('.') {
        Some(dot) => base_start + leading_dots + dot,
        None => video_url.len(),
    };
    format!("{}.{POSTER_EXTENSION}", &video_url[..stem_end])
}

/// Produces a still image from a video.
pub trait FrameExtractor: Send + Sync {
    /// Write a frame of `video` to `dest`.
    fn extract_frame(
        &self,
        video: &Path,
        dest: &Path,
    ) -> impl Future<Output = Result<(), FfmpegError>> + Send;
}

/// Generate-if-absent cache of poster images.
///
/// At most one extraction per poster path is in flight; concurrent callers
/// for the same video wait and then see the finished file.
#[derive(Debug)]
pub struct PosterCache<E> {
    extractor: E,
    in_flight: KeyedLocks<PathBuf>,
}

impl<E: FrameExtractor> PosterCache<E> {
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            in_flight: KeyedLocks::new(),
        }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Return the poster for `video`, extracting it first if it is missing.
    pub async fn ensure(&self, video: &Path) -> Result<PathBuf, StorageError> {
        let poster = poster_path(video);
        if fs::exists(&poster).await? {
            return Ok(poster);
        }

        let _guard = self.in_flight.lock(poster.clone()).await;
        // Another caller may have finished while we waited.
        if fs::exists(&poster).await? {
            return Ok(poster);
        }

        // Extract next to the poster and rename into place, so a failed or
        // killed extraction never leaves a file that looks like a cache hit.
        let partial = partial_path(&poster);
        tracing::debug!(video = %video.display(), poster = %poster.display(), "Extracting poster frame");
        if let Err(source) = self.extractor.extract_frame(video, &partial).await {
            discard_partial(&partial).await;
            return Err(StorageError::Generation {
                video: video.to_path_buf(),
                source,
            });
        }
        if let Err(e) = fs::rename(&partial, &poster).await {
            discard_partial(&partial).await;
            return Err(e);
        }
        Ok(poster)
    }

    /// Return the poster for `video` only if it already exists.
    pub async fn lookup(&self, video: &Path) -> Result<Option<PathBuf>, StorageError> {
        let poster = poster_path(video);
        Ok(fs::exists(&poster).await?.then_some(poster))
    }

    /// Read-path variant of [`ensure`](Self::ensure): failures are logged and
    /// the caller renders without a poster.
    pub async fn ensure_or_degrade(&self, video: &Path) -> Option<PathBuf> {
        match self.ensure(video).await {
            Ok(poster) => Some(poster),
            Err(e) => {
                tracing::warn!(video = %video.display(), error = %e, "Poster unavailable");
                None
            }
        }
    }
}

/// Scratch file an extraction writes to before it is renamed to `poster`.
fn partial_path(poster: &Path) -> PathBuf {
    let name = poster
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    poster.with_file_name(format!(".{name}.partial.{POSTER_EXTENSION}"))
}

async fn discard_partial(partial: &Path) {
    if let Err(e) = fs::remove_if_exists(partial).await {
        tracing::warn!(path = %partial.display(), error = %e, "Could not remove partial poster");
    }
}
