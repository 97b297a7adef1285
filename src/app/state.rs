//! Playback state machine
//!
//! Implements the Idle / Paused / Playing / Ended flow of a playback session.
//! The playback worker is the only writer of a live `PlaybackStatus`; the UI
//! reads published copies.

use crate::utils::format_progress;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PlayState {
    /// No source loaded
    #[default]
    Idle = 0,
    /// Source loaded, not advancing
    Paused = 1,
    /// Advancing one frame per tick
    Playing = 2,
    /// Reached end of stream, play rewinds
    Ended = 3,
}

impl PlayState {
    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            PlayState::Idle => "Idle",
            PlayState::Paused => "Paused",
            PlayState::Playing => "Playing",
            PlayState::Ended => "Ended",
        }
    }
}

/// What a play request did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayTransition {
    /// Nothing to do (idle or already playing)
    Ignored,
    /// Continued from the current position
    Resumed,
    /// Position was at the end and went back to frame 0
    Rewound,
}

/// Snapshot of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackStatus {
    /// Current playback state
    pub state: PlayState,
    /// Index of the next frame to decode, in `0..=total_frames`
    pub position: u64,
    /// Total frames reported by the source
    pub total_frames: u64,
    /// Frame rate used for pacing and the time label
    pub fps: f64,
}

impl PlaybackStatus {
    /// Status of a freshly opened source
    pub fn opened(total_frames: u64, fps: f64) -> Self {
        Self {
            state: PlayState::Paused,
            position: 0,
            total_frames,
            fps,
        }
    }

    /// Is currently playing
    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    /// A source is open
    pub fn is_loaded(&self) -> bool {
        self.state != PlayState::Idle
    }

    /// Position has reached the last frame
    pub fn at_end(&self) -> bool {
        self.position >= self.total_frames
    }

    /// Start or resume playback.
    ///
    /// Ended sessions, and paused sessions parked at the end, rewind to 0.
    pub fn play(&mut self) -> PlayTransition {
        match self.state {
            PlayState::Idle | PlayState::Playing => PlayTransition::Ignored,
            PlayState::Ended => {
                self.position = 0;
                self.state = PlayState::Playing;
                PlayTransition::Rewound
            }
            PlayState::Paused => {
                self.state = PlayState::Playing;
                if self.at_end() {
                    self.position = 0;
                    PlayTransition::Rewound
                } else {
                    PlayTransition::Resumed
                }
            }
        }
    }

    /// Pause playback, returns false if nothing was playing
    pub fn pause(&mut self) -> bool {
        if self.state == PlayState::Playing {
            self.state = PlayState::Paused;
            true
        } else {
            false
        }
    }

    /// Clamp a requested seek index into `0..=total_frames`
    pub fn clamp_index(&self, index: i64) -> u64 {
        u64::try_from(index).unwrap_or(0).min(self.total_frames)
    }

    /// Move the position to `index` (clamped) and return the applied index.
    ///
    /// Landing on the last frame parks a non-playing session in Ended; landing
    /// anywhere else takes an ended session back to Paused.
    pub fn seek(&mut self, index: u64) -> u64 {
        let index = index.min(self.total_frames);
        self.position = index;
        match self.state {
            PlayState::Ended if index < self.total_frames => self.state = PlayState::Paused,
            PlayState::Paused if index == self.total_frames => self.state = PlayState::Ended,
            _ => {}
        }
        index
    }

    /// Count one decoded frame, returns true when the end was reached
    pub fn advance(&mut self) -> bool {
        if self.position < self.total_frames {
            self.position += 1;
        }
        if self.at_end() {
            self.state = PlayState::Ended;
            true
        } else {
            false
        }
    }

    /// Stream exhausted or decode failed
    pub fn finish(&mut self) {
        if self.is_loaded() {
            self.state = PlayState::Ended;
        }
    }

    /// Back to Idle with position 0
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `MM:SS / MM:SS` label for the current position
    pub fn time_label(&self) -> String {
        format_progress(self.position, self.total_frames, self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_state_names() {
        assert_eq!(PlayState::Idle.display_name(), "Idle");
        assert_eq!(PlayState::Ended.display_name(), "Ended");
        assert_eq!(PlayState::Playing as u8, 2);
    }

    #[test]
    fn test_opened_is_paused_at_zero() {
        let status = PlaybackStatus::opened(120, 30.0);
        assert_eq!(status.state, PlayState::Paused);
        assert_eq!(status.position, 0);
        assert!(status.is_loaded());
        assert!(!status.is_playing());
    }

    #[test]
    fn test_play_from_idle_is_ignored() {
        let mut status = PlaybackStatus::default();
        assert_eq!(status.play(), PlayTransition::Ignored);
        assert_eq!(status.state, PlayState::Idle);
    }

    #[test]
    fn test_play_from_ended_rewinds() {
        let mut status = PlaybackStatus::opened(10, 60.0);
        status.play();
        for _ in 0..10 {
            status.advance();
        }
        assert_eq!(status.state, PlayState::Ended);
        assert_eq!(status.position, 10);

        assert_eq!(status.play(), PlayTransition::Rewound);
        assert_eq!(status.position, 0);
        assert!(status.is_playing());
    }

    #[test]
    fn test_play_from_mid_stream_resumes() {
        let mut status = PlaybackStatus::opened(10, 60.0);
        status.seek(4);
        assert_eq!(status.play(), PlayTransition::Resumed);
        assert_eq!(status.position, 4);
    }

    #[test]
    fn test_pause_only_when_playing() {
        let mut status = PlaybackStatus::opened(10, 60.0);
        assert!(!status.pause());
        status.play();
        assert!(status.pause());
        assert_eq!(status.state, PlayState::Paused);
    }

    #[test]
    fn test_clamp_index() {
        let status = PlaybackStatus::opened(100, 60.0);
        assert_eq!(status.clamp_index(-5), 0);
        assert_eq!(status.clamp_index(50), 50);
        assert_eq!(status.clamp_index(1000), 100);
    }

    #[test]
    fn test_seek_to_end_and_back() {
        let mut status = PlaybackStatus::opened(100, 60.0);
        assert_eq!(status.seek(500), 100);
        assert_eq!(status.state, PlayState::Ended);

        assert_eq!(status.seek(20), 20);
        assert_eq!(status.state, PlayState::Paused);
    }

    #[test]
    fn test_seek_while_playing_keeps_playing() {
        let mut status = PlaybackStatus::opened(100, 60.0);
        status.play();
        status.seek(100);
        assert!(status.is_playing());
        assert_eq!(status.position, 100);
    }

    #[test]
    fn test_advance_never_exceeds_total() {
        let mut status = PlaybackStatus::opened(3, 60.0);
        status.play();
        assert!(!status.advance());
        assert!(!status.advance());
        assert!(status.advance());
        assert!(status.advance());
        assert_eq!(status.position, 3);
        assert_eq!(status.state, PlayState::Ended);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut status = PlaybackStatus::opened(30, 60.0);
        status.play();
        status.advance();
        status.reset();
        assert_eq!(status.state, PlayState::Idle);
        assert_eq!(status.position, 0);
        assert!(!status.is_playing());
    }

    #[test]
    fn test_time_label() {
        let mut status = PlaybackStatus::opened(3600, 60.0);
        status.seek(60);
        assert_eq!(status.time_label(), "00:01 / 01:00");
    }
}
