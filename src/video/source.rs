//! Frame source abstraction
//!
//! The playback driver talks to decoders through `FrameSource` so the state
//! machine does not depend on FFmpeg directly.

use image::RgbImage;

use crate::error::PlayerError;

/// Stream properties reported when a source is opened
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame rate reported by the container, if any
    pub fps: Option<f64>,
    /// Total number of frames (estimated from duration when the container
    /// does not store it)
    pub total_frames: u64,
}

impl MediaInfo {
    /// Reported frame rate, or `fallback` when the stream has none
    pub fn fps_or(&self, fallback: f64) -> f64 {
        self.fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .unwrap_or(fallback)
    }
}

/// Sequential and random-access frame reader.
///
/// Not required to be `Send`: a source is created and used on the playback
/// thread only.
pub trait FrameSource {
    /// Stream properties
    fn info(&self) -> MediaInfo;

    /// Decode the next frame as RGB.
    ///
    /// Returns `None` at end of stream or when decoding fails.
    fn read_frame(&mut self) -> Option<RgbImage>;

    /// Reposition so that the next `read_frame` yields frame `index`
    fn seek_to_frame(&mut self, index: u64) -> Result<(), PlayerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_fallback() {
        let mut info = MediaInfo {
            width: 640,
            height: 360,
            fps: Some(29.97),
            total_frames: 100,
        };
        assert_eq!(info.fps_or(60.0), 29.97);

        info.fps = None;
        assert_eq!(info.fps_or(60.0), 60.0);

        info.fps = Some(0.0);
        assert_eq!(info.fps_or(60.0), 60.0);
    }
}
