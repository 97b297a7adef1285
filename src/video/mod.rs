//! Video module
//!
//! Decoding (FFmpeg), the playback driver and frame hand-off to the UI.
//!
//! # Usage
//!
//! ```rust,ignore
//! use video::{FrameMailbox, PlaybackDriver};
//!
//! let mailbox = Arc::new(FrameMailbox::new(None));
//! let mut driver = PlaybackDriver::new(mailbox.clone(), 60.0);
//! driver.open(Path::new("clip.mp4"))?;
//! driver.play();
//!
//! if let Some(frame) = mailbox.take() {
//!     // Upload the frame
//! }
//! ```

mod decoder;
mod driver;
mod sink;
mod source;

pub use driver::PlaybackDriver;
pub use sink::FrameMailbox;
