//! ViewerConfig data structure

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Frame rate assumed when a stream does not report one
pub const DEFAULT_FALLBACK_FPS: f64 = 60.0;

/// Viewer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Window title
    #[serde(default = "default_title")]
    pub title: String,

    /// Initial window width
    #[serde(default = "default_window_width")]
    pub window_width: f32,

    /// Initial window height
    #[serde(default = "default_window_height")]
    pub window_height: f32,

    /// Extensions offered by the open dialog (without dot)
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// Frame rate for pacing and time display when the stream has none
    #[serde(default = "default_fallback_fps")]
    pub fallback_fps: f64,

    /// Start playing as soon as a file is opened
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
}

fn default_title() -> String {
    "Video Viewer".to_string()
}

fn default_window_width() -> f32 {
    960.0
}

fn default_window_height() -> f32 {
    640.0
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "avi", "mkv"].iter().map(|ext| ext.to_string()).collect()
}

fn default_fallback_fps() -> f64 {
    DEFAULT_FALLBACK_FPS
}

fn default_autoplay() -> bool {
    true
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            video_extensions: default_video_extensions(),
            fallback_fps: default_fallback_fps(),
            autoplay: default_autoplay(),
        }
    }
}

impl ViewerConfig {
    /// Load configuration from JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ViewerConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// True if `path` has one of the configured video extensions
    pub fn is_video_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.video_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();
        assert_eq!(config.fallback_fps, 60.0);
        assert_eq!(config.video_extensions, vec!["mp4", "avi", "mkv"]);
        assert!(config.autoplay);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{"autoplay": false, "fallback_fps": 25.0}"#).unwrap();
        assert!(!config.autoplay);
        assert_eq!(config.fallback_fps, 25.0);
        assert_eq!(config.title, "Video Viewer");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"title": "Clips", "video_extensions": ["webm"]}}"#).unwrap();

        let config = ViewerConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.title, "Clips");
        assert_eq!(config.video_extensions, vec!["webm"]);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = ViewerConfig::load_from_file("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("exist.json"));
    }

    #[test]
    fn test_is_video_file() {
        let config = ViewerConfig::default();
        assert!(config.is_video_file(Path::new("movie.MKV")));
        assert!(config.is_video_file(Path::new("/tmp/a.mp4")));
        assert!(!config.is_video_file(Path::new("notes.txt")));
        assert!(!config.is_video_file(Path::new("no_extension")));
    }
}
