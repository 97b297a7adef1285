//! Time presentation
//!
//! Converts frame indices into `MM:SS` labels.

/// Format a frame count as `MM:SS` at the given frame rate.
///
/// Seconds are truncated, minutes are not capped at two digits.
/// A frame rate that is not a positive finite number yields `00:00`.
pub fn format_time(frames: u64, fps: f64) -> String {
    if !fps.is_finite() || fps <= 0.0 {
        return "00:00".to_string();
    }

    let total_seconds = (frames as f64 / fps).floor() as u64;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}", minutes, seconds)
}

/// Format the `elapsed / total` label shown next to the seek slider
pub fn format_progress(position: u64, total_frames: u64, fps: f64) -> String {
    format!(
        "{} / {}",
        format_time(position, fps),
        format_time(total_frames, fps)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_at_60fps() {
        assert_eq!(format_time(0, 60.0), "00:00");
        assert_eq!(format_time(60, 60.0), "00:01");
        assert_eq!(format_time(3600, 60.0), "01:00");
    }

    #[test]
    fn test_format_time_truncates_partial_seconds() {
        assert_eq!(format_time(59, 60.0), "00:00");
        assert_eq!(format_time(119, 60.0), "00:01");
        // 29.97fps: 1798 frames is just under a minute
        assert_eq!(format_time(1798, 29.97), "00:59");
    }

    #[test]
    fn test_format_time_long_video() {
        // 100 minutes at 25fps
        assert_eq!(format_time(150_000, 25.0), "100:00");
    }

    #[test]
    fn test_format_time_invalid_fps() {
        assert_eq!(format_time(1000, 0.0), "00:00");
        assert_eq!(format_time(1000, -1.0), "00:00");
        assert_eq!(format_time(1000, f64::NAN), "00:00");
    }

    #[test]
    fn test_format_progress() {
        assert_eq!(format_progress(90, 7200, 30.0), "00:03 / 04:00");
        assert_eq!(format_progress(0, 0, 60.0), "00:00 / 00:00");
    }
}
