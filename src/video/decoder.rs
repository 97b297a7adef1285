//! Video decoder module
//!
//! Provides video frame decoding and frame-accurate seeking using FFmpeg.

use std::path::Path;

use image::RgbImage;
use tracing::{debug, error, info, warn};

use ffmpeg_next as ffmpeg;
use ffmpeg::format::input;
use ffmpeg::format::Pixel;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{Context as Scaler, Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;

use super::source::{FrameSource, MediaInfo};
use crate::error::PlayerError;

/// Container-level timestamps are in microseconds
const AV_TIME_BASE: f64 = 1_000_000.0;

/// Video decoder that extracts RGB frames from video files using FFmpeg
pub struct VideoDecoder {
    /// FFmpeg format context
    input_ctx: ffmpeg::format::context::Input,
    /// Video stream index
    video_stream_index: usize,
    /// Video decoder
    decoder: ffmpeg::codec::decoder::Video,
    /// Scaler for RGB24 conversion
    scaler: Scaler,
    /// Stream time base in seconds per tick
    time_base: f64,
    /// First presentation timestamp of the stream, in stream ticks
    start_pts: i64,
    /// Frames with a timestamp below this are dropped after a seek
    skip_before_pts: Option<i64>,
    /// Frame rate used to map frame indices onto timestamps
    index_fps: f64,
    /// Stream properties
    info: MediaInfo,
    /// Packet iterator state
    packet_iter_exhausted: bool,
}

impl VideoDecoder {
    /// Open a video file for decoding.
    ///
    /// `fallback_fps` stands in for the frame rate when the stream reports
    /// none, both for frame counting and for seeking.
    pub fn open(path: &Path, fallback_fps: f64) -> Result<Self, PlayerError> {
        if !path.exists() {
            return Err(PlayerError::NotFound(path.to_path_buf()));
        }

        // Initialize FFmpeg (safe to call multiple times)
        ffmpeg::init()?;

        let input_ctx = input(path)?;

        let video_stream = input_ctx
            .streams()
            .best(Type::Video)
            .ok_or_else(|| PlayerError::NoVideoStream(path.to_path_buf()))?;

        let video_stream_index = video_stream.index();

        let fps = [video_stream.avg_frame_rate(), video_stream.rate()]
            .into_iter()
            .find(|rate| rate.numerator() > 0 && rate.denominator() > 0)
            .map(|rate| rate.numerator() as f64 / rate.denominator() as f64);
        if fps.is_none() {
            warn!("{} reports no frame rate, assuming {}fps", path.display(), fallback_fps);
        }

        let index_fps = fps.unwrap_or(fallback_fps);

        let tb = video_stream.time_base();
        let time_base = if tb.denominator() != 0 {
            tb.numerator() as f64 / tb.denominator() as f64
        } else {
            0.0
        };

        // AV_NOPTS_VALUE is i64::MIN
        let start_pts = match video_stream.start_time() {
            i64::MIN => 0,
            pts => pts,
        };

        let total_frames = Self::count_frames(
            video_stream.frames(),
            video_stream.duration() as f64 * time_base,
            input_ctx.duration() as f64 / AV_TIME_BASE,
            index_fps,
        );

        let context_decoder =
            ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())?;
        let decoder = context_decoder.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();

        info!(
            "Opened video {}: {}x{} @ {:?}fps, {} frames, format: {:?}",
            path.display(),
            width,
            height,
            fps,
            total_frames,
            decoder.format()
        );

        // RGB24 at source size
        let scaler = Scaler::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            Flags::BILINEAR,
        )?;

        Ok(Self {
            input_ctx,
            video_stream_index,
            decoder,
            scaler,
            time_base,
            start_pts,
            skip_before_pts: None,
            index_fps,
            info: MediaInfo {
                width,
                height,
                fps,
                total_frames,
            },
            packet_iter_exhausted: false,
        })
    }

    /// Frame count from the container, or an estimate from the duration.
    ///
    /// Durations are in seconds; a non-positive value means unknown.
    fn count_frames(stream_frames: i64, stream_secs: f64, container_secs: f64, fps: f64) -> u64 {
        if stream_frames > 0 {
            return stream_frames as u64;
        }

        [stream_secs, container_secs]
            .into_iter()
            .find(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| (secs * fps).round() as u64)
            .unwrap_or(0)
    }

    /// Pull the next decoded frame out of FFmpeg, feeding packets as needed
    fn decode_next(&mut self) -> Option<VideoFrame> {
        // Try to receive already decoded frames first
        let mut decoded = VideoFrame::empty();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return Some(decoded);
        }

        if self.packet_iter_exhausted {
            return None;
        }

        loop {
            let packet_result = self.input_ctx.packets().next();

            match packet_result {
                Some((stream, packet)) => {
                    if stream.index() != self.video_stream_index {
                        continue;
                    }

                    if let Err(e) = self.decoder.send_packet(&packet) {
                        debug!("Dropping packet: {}", e);
                        continue;
                    }

                    let mut decoded = VideoFrame::empty();
                    if self.decoder.receive_frame(&mut decoded).is_ok() {
                        return Some(decoded);
                    }
                }
                None => {
                    // End of stream, flush decoder
                    self.packet_iter_exhausted = true;
                    let _ = self.decoder.send_eof();

                    let mut decoded = VideoFrame::empty();
                    if self.decoder.receive_frame(&mut decoded).is_ok() {
                        return Some(decoded);
                    }
                    return None;
                }
            }
        }
    }

    /// Convert FFmpeg frame to RgbImage
    fn convert_frame(&mut self, decoded: &VideoFrame) -> Option<RgbImage> {
        let mut rgb_frame = VideoFrame::empty();

        if let Err(e) = self.scaler.run(decoded, &mut rgb_frame) {
            error!("Failed to convert frame to RGB: {}", e);
            return None;
        }

        let width = self.info.width as usize;
        let height = self.info.height as usize;
        let data = rgb_frame.data(0);
        let stride = rgb_frame.stride(0);

        if stride == width * 3 {
            RgbImage::from_raw(
                self.info.width,
                self.info.height,
                data[..width * height * 3].to_vec(),
            )
        } else {
            // Strip row padding
            let mut pixels = Vec::with_capacity(width * height * 3);
            for y in 0..height {
                let row_start = y * stride;
                pixels.extend_from_slice(&data[row_start..row_start + width * 3]);
            }
            RgbImage::from_raw(self.info.width, self.info.height, pixels)
        }
    }

    /// Stream timestamp of frame `index`
    fn frame_pts(index: u64, fps: f64, time_base: f64, start_pts: i64) -> i64 {
        if time_base <= 0.0 || fps <= 0.0 {
            return start_pts;
        }
        let secs = index as f64 / fps;
        start_pts + (secs / time_base).round() as i64
    }
}

impl FrameSource for VideoDecoder {
    fn info(&self) -> MediaInfo {
        self.info
    }

    fn read_frame(&mut self) -> Option<RgbImage> {
        loop {
            let decoded = self.decode_next()?;

            if let (Some(skip_before), Some(pts)) = (self.skip_before_pts, decoded.timestamp()) {
                if pts < skip_before {
                    continue;
                }
            }
            self.skip_before_pts = None;

            return self.convert_frame(&decoded);
        }
    }

    fn seek_to_frame(&mut self, index: u64) -> Result<(), PlayerError> {
        let target_pts = Self::frame_pts(index, self.index_fps, self.time_base, self.start_pts);

        // Container seek works in AV_TIME_BASE (microseconds)
        let timestamp = (target_pts as f64 * self.time_base * AV_TIME_BASE) as i64;
        self.input_ctx.seek(timestamp, ..timestamp)?;

        self.decoder.flush();
        self.packet_iter_exhausted = false;

        // Decode forward from the keyframe, dropping frames up to half a
        // frame before the target
        let half_frame = if self.time_base > 0.0 {
            (0.5 / self.index_fps / self.time_base) as i64
        } else {
            0
        };
        self.skip_before_pts = Some(target_pts - half_frame);

        debug!("Seeked to frame {} (pts {})", index, target_pts);
        Ok(())
    }
}
