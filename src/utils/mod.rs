//! Utility helpers

pub mod timecode;

pub use timecode::format_progress;
