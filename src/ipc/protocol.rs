//! IPC protocol definitions
//!
//! Line-delimited JSON messages for remote control over stdin/stdout.

use serde::{Deserialize, Serialize};

use crate::app::state::PlaybackStatus;

/// Playback commands shared by the GUI and remote control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    /// Start or resume playback
    Play,
    /// Pause playback
    Pause,
    /// Pause when playing, play otherwise
    Toggle,
    /// Close the source
    Stop,
    /// Seek to frame index (clamped)
    SeekTo(i64),
}

/// IPC message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum IpcMessage {
    // === Controller -> Viewer ===

    /// Open a video file
    #[serde(rename = "open")]
    Open { path: String },

    /// Control command
    #[serde(rename = "control")]
    Control(ControlCommand),

    /// Close the viewer
    #[serde(rename = "shutdown")]
    Shutdown,

    // === Viewer -> Controller ===

    /// Playback status notification
    #[serde(rename = "status_update")]
    StatusUpdate {
        state: u8,
        position: u64,
        total_frames: u64,
        time: String,
    },

    /// Viewer ready
    #[serde(rename = "ready")]
    Ready,

    /// Error occurred
    #[serde(rename = "error")]
    Error { code: i32, message: String },
}

impl IpcMessage {
    /// Create a status update message
    pub fn status_update(status: &PlaybackStatus) -> Self {
        IpcMessage::StatusUpdate {
            state: status.state as u8,
            position: status.position,
            total_frames: status.total_frames,
            time: status.time_label(),
        }
    }

    /// Create an error message
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        IpcMessage::Error {
            code,
            message: message.into(),
        }
    }

    /// Serialize to JSON string (line-delimited)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = 1;
    pub const OPEN_FAILED: i32 = 2;
}
