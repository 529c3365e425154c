//! FFmpeg frame extraction for poster images.
//!
//! The extractor is a black box: it takes a video path and a destination
//! path and either writes the image or fails.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use crate::config::StorageConfig;
use crate::poster::FrameExtractor;

/// Error type for FFmpeg operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("ffmpeg timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("video file not found: {0}")]
    VideoNotFound(String),
}

/// Extract the first frame of `video_path` as a JPEG at `output_path`.
///
/// The child process is killed if it outlives `timeout`.
pub async fn extract_frame(
    binary: &str,
    video_path: &Path,
    output_path: &Path,
    timeout: Duration,
) -> Result<(), FfmpegError> {
    if !tokio::fs::try_exists(video_path).await? {
        return Err(FfmpegError::VideoNotFound(
            video_path.to_string_lossy().to_string(),
        ));
    }

    let mut cmd = tokio::process::Command::new(binary);
    cmd.args(["-y", "-loglevel", "error", "-ss", "0", "-i"])
        .arg(video_path)
        .args(["-frames:v", "1", "-q:v", "2", "-f", "image2"])
        .arg(output_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let child = cmd.spawn().map_err(FfmpegError::NotFound)?;

    // On timeout the child is dropped, and `kill_on_drop` terminates it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_elapsed) => {
            remove_output(output_path).await;
            return Err(FfmpegError::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            });
        }
    };

    if !output.status.success() {
        remove_output(output_path).await;
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}

/// Drop whatever a failed run managed to write.
async fn remove_output(output_path: &Path) {
    match tokio::fs::remove_file(output_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %output_path.display(), error = %e, "Could not remove failed ffmpeg output");
        }
    }
}

/// [`FrameExtractor`] backed by the `ffmpeg` command line tool.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    binary: String,
    timeout: Duration,
}

impl FfmpegExtractor {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.ffmpeg_binary.clone(), config.frame_extract_timeout)
    }
}

impl FrameExtractor for FfmpegExtractor {
    async fn extract_frame(&self, video: &Path, dest: &Path) -> Result<(), FfmpegError> {
        extract_frame(&self.binary, video, dest, self.timeout).await
    }
}
