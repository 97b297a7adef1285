//! Player error types

use std::path::PathBuf;

use ffmpeg_next as ffmpeg;
use thiserror::Error;

/// Errors surfaced by the decoder and the playback driver.
///
/// End of stream is not an error: sources report it by returning `None`
/// from `read_frame`.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Source path does not exist
    #[error("video file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Container opened but carries no video stream
    #[error("no video stream found in {}", .0.display())]
    NoVideoStream(PathBuf),

    /// FFmpeg rejected the file or a codec/scaler operation
    #[error("ffmpeg: {0}")]
    Ffmpeg(#[from] ffmpeg::Error),

    /// Playback worker thread could not be started
    #[error("failed to spawn playback thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Playback worker exited before reporting the source as ready
    #[error("playback thread exited unexpectedly")]
    WorkerGone,
}

impl PlayerError {
    /// True when the error means the source could not be opened at all
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            PlayerError::NotFound(_) | PlayerError::NoVideoStream(_) | PlayerError::Ffmpeg(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_path() {
        let err = PlayerError::NotFound(PathBuf::from("missing.mp4"));
        assert!(err.to_string().contains("missing.mp4"));
        assert!(err.is_open_failure());
    }

    #[test]
    fn test_worker_errors_are_not_open_failures() {
        assert!(!PlayerError::WorkerGone.is_open_failure());
    }
}
