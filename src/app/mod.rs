//! Application module
//!
//! Contains the egui application and the playback state machine.

pub mod state;
mod viewer_app;

pub use viewer_app::ViewerApp;
