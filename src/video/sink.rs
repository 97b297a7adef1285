//! Frame hand-off from the playback thread to the UI

use image::RgbImage;
use parking_lot::Mutex;

/// Receives frames rendered by the playback driver.
///
/// Called from the playback thread.
pub trait FrameSink: Send + Sync {
    /// Show frame `index`
    fn present(&self, index: u64, frame: RgbImage);

    /// Drop whatever is currently shown
    fn clear(&self) {}
}

/// A frame waiting to be uploaded by the UI
#[derive(Debug, Clone)]
pub struct PresentedFrame {
    /// Frame index within the stream
    pub index: u64,
    /// RGB pixels
    pub image: RgbImage,
}

/// Single-slot mailbox holding the most recent frame.
///
/// The playback thread overwrites the slot; the UI takes it once per repaint.
/// Frames the UI never got around to are simply replaced.
#[derive(Default)]
pub struct FrameMailbox {
    latest: Mutex<Option<PresentedFrame>>,
    /// Set when the last presented frame was cleared
    cleared: Mutex<bool>,
    repaint: Option<egui::Context>,
}

impl FrameMailbox {
    /// Mailbox that asks `ctx` for a repaint whenever a frame lands
    pub fn new(repaint: Option<egui::Context>) -> Self {
        Self {
            latest: Mutex::new(None),
            cleared: Mutex::new(false),
            repaint,
        }
    }

    /// Take the pending frame, if any
    pub fn take(&self) -> Option<PresentedFrame> {
        self.latest.lock().take()
    }

    /// True once after `clear` was called
    pub fn take_cleared(&self) -> bool {
        std::mem::take(&mut *self.cleared.lock())
    }

    fn request_repaint(&self) {
        if let Some(ref ctx) = self.repaint {
            ctx.request_repaint();
        }
    }
}

impl FrameSink for FrameMailbox {
    fn present(&self, index: u64, frame: RgbImage) {
        *self.latest.lock() = Some(PresentedFrame {
            index,
            image: frame,
        });
        *self.cleared.lock() = false;
        self.request_repaint();
    }

    fn clear(&self) {
        *self.latest.lock() = None;
        *self.cleared.lock() = true;
        self.request_repaint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailbox_keeps_latest_frame() {
        let mailbox = FrameMailbox::new(None);
        mailbox.present(1, RgbImage::new(2, 2));
        mailbox.present(2, RgbImage::new(2, 2));

        let frame = mailbox.take().unwrap();
        assert_eq!(frame.index, 2);
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn test_mailbox_clear() {
        let mailbox = FrameMailbox::new(None);
        mailbox.present(5, RgbImage::new(1, 1));
        mailbox.clear();

        assert!(mailbox.take().is_none());
        assert!(mailbox.take_cleared());
        assert!(!mailbox.take_cleared());
    }
}
