//! Configuration module
//!
//! Viewer settings loaded from an optional JSON file.

mod viewer_config;

pub use viewer_config::*;
