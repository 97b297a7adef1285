//! Playback driver
//!
//! Owns one worker thread per open source. The worker holds the decoder,
//! runs the decode / render / advance loop while playing and applies UI
//! commands between frames. Commands arrive over a channel, so the decoder is
//! only ever touched from the worker and at most one playback loop exists per
//! session.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::decoder::VideoDecoder;
use super::sink::FrameSink;
use super::source::{FrameSource, MediaInfo};
use crate::app::state::{PlayTransition, PlaybackStatus};
use crate::config::DEFAULT_FALLBACK_FPS;
use crate::error::PlayerError;

/// Commands from the driver handle to the worker
#[derive(Debug)]
enum Command {
    Play,
    Pause,
    Toggle,
    /// Already clamped frame index
    SeekTo(u64),
    /// Reply once every earlier command has been applied
    #[cfg(test)]
    Flush(Sender<()>),
    Close,
}

/// Running worker thread for the open source
struct Worker {
    commands: Sender<Command>,
    /// Set on close so the loop skips whatever is still queued
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Handle used by the UI thread to control playback
pub struct PlaybackDriver {
    /// Latest status published by the worker
    status: Arc<RwLock<PlaybackStatus>>,
    /// Where decoded frames go
    sink: Arc<dyn FrameSink>,
    /// Frame rate assumed when the source reports none
    fallback_fps: f64,
    /// Worker for the open source, if any
    worker: Option<Worker>,
}

impl PlaybackDriver {
    /// Create an idle driver
    pub fn new(sink: Arc<dyn FrameSink>, fallback_fps: f64) -> Self {
        let fallback_fps = if fallback_fps.is_finite() && fallback_fps > 0.0 {
            fallback_fps
        } else {
            warn!("Invalid fallback fps {}, using {}", fallback_fps, DEFAULT_FALLBACK_FPS);
            DEFAULT_FALLBACK_FPS
        };

        Self {
            status: Arc::new(RwLock::new(PlaybackStatus::default())),
            sink,
            fallback_fps,
            worker: None,
        }
    }

    /// Snapshot of the current status
    pub fn status(&self) -> PlaybackStatus {
        *self.status.read()
    }

    /// A source is open
    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    /// Open a video file with FFmpeg
    pub fn open(&mut self, path: &Path) -> Result<MediaInfo, PlayerError> {
        let path = path.to_path_buf();
        let fallback_fps = self.fallback_fps;
        self.open_with(move || VideoDecoder::open(&path, fallback_fps))
    }

    /// Open a source built by `opener` on a fresh playback thread.
    ///
    /// Any previous source is closed first and its thread joined. On success
    /// the session is Paused at frame 0 with the first frame shown.
    pub fn open_with<S, F>(&mut self, opener: F) -> Result<MediaInfo, PlayerError>
    where
        S: FrameSource + 'static,
        F: FnOnce() -> Result<S, PlayerError> + Send + 'static,
    {
        self.stop();

        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));

        let status = Arc::clone(&self.status);
        let sink = Arc::clone(&self.sink);
        let fallback_fps = self.fallback_fps;
        let worker_cancelled = Arc::clone(&cancelled);

        let handle = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                let source = match opener() {
                    Ok(source) => source,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let info = source.info();
                let opened = PlaybackStatus::opened(info.total_frames, info.fps_or(fallback_fps));
                *status.write() = opened;
                let _ = ready_tx.send(Ok(info));

                PlaybackLoop::new(source, command_rx, worker_cancelled, status, sink, opened).run();
            })
            .map_err(PlayerError::Spawn)?;

        let outcome = ready_rx.recv().unwrap_or(Err(PlayerError::WorkerGone));
        match outcome {
            Ok(info) => {
                info!(
                    "Session opened: {}x{}, {} frames @ {:.2}fps",
                    info.width,
                    info.height,
                    info.total_frames,
                    info.fps_or(self.fallback_fps)
                );
                if info.total_frames == 0 {
                    warn!("Source reports no frames, playback will end immediately");
                }
                self.worker = Some(Worker {
                    commands: command_tx,
                    cancelled,
                    handle,
                });
                Ok(info)
            }
            Err(e) => {
                if handle.join().is_err() {
                    error!("Playback thread panicked while opening");
                }
                self.status.write().reset();
                Err(e)
            }
        }
    }

    /// Start or resume playback, rewinding first if the session has ended
    pub fn play(&self) {
        self.send(Command::Play);
    }

    /// Pause playback
    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    /// Pause when playing, play otherwise
    pub fn toggle(&self) {
        self.send(Command::Toggle);
    }

    /// Seek to `index`, clamped to `0..=total_frames`.
    ///
    /// Returns the clamped index, or 0 when nothing is open.
    pub fn seek(&self, index: i64) -> u64 {
        if self.worker.is_none() {
            return 0;
        }
        let target = self.status().clamp_index(index);
        self.send(Command::SeekTo(target));
        target
    }

    /// Close the source and return to Idle with position 0
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancelled.store(true, Ordering::Release);
            let _ = worker.commands.send(Command::Close);
            if worker.handle.join().is_err() {
                error!("Playback thread panicked");
            }
            info!("Session closed");
        }
        self.status.write().reset();
        self.sink.clear();
    }

    /// Block until the worker has applied every command sent so far
    #[cfg(test)]
    pub fn flush(&self) {
        let Some(ref worker) = self.worker else {
            return;
        };
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        if worker.commands.send(Command::Flush(reply_tx)).is_ok() {
            let _ = reply_rx.recv();
        }
    }

    fn send(&self, command: Command) {
        match self.worker {
            Some(ref worker) => {
                if worker.commands.send(command).is_err() {
                    warn!("Playback thread is gone, command dropped");
                }
            }
            None => debug!("No source open, ignoring {:?}", command),
        }
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decode / render / advance loop running on the playback thread
struct PlaybackLoop<S: FrameSource> {
    source: S,
    commands: Receiver<Command>,
    cancelled: Arc<AtomicBool>,
    shared: Arc<RwLock<PlaybackStatus>>,
    sink: Arc<dyn FrameSink>,
    /// Worker-local copy, the only writable one
    status: PlaybackStatus,
    frame_interval: Duration,
    next_frame_at: Instant,
}

impl<S: FrameSource> PlaybackLoop<S> {
    fn new(
        source: S,
        commands: Receiver<Command>,
        cancelled: Arc<AtomicBool>,
        shared: Arc<RwLock<PlaybackStatus>>,
        sink: Arc<dyn FrameSink>,
        status: PlaybackStatus,
    ) -> Self {
        Self {
            source,
            commands,
            cancelled,
            shared,
            sink,
            status,
            frame_interval: Duration::from_secs_f64(1.0 / status.fps),
            next_frame_at: Instant::now(),
        }
    }

    fn run(mut self) {
        if self.status.total_frames > 0 {
            self.preview(0);
        }

        loop {
            if self.status.is_playing() && Instant::now() >= self.next_frame_at {
                self.step();
            }

            let received = if self.status.is_playing() {
                match self.commands.recv_deadline(self.next_frame_at) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => None,
                }
            } else {
                self.commands.recv().ok()
            };

            let Some(command) = received else {
                break;
            };
            if self.cancelled.load(Ordering::Acquire) || !self.handle(command) {
                break;
            }
        }

        debug!("Playback loop exiting at frame {}", self.status.position);
    }

    /// Apply one command, returns false when the loop should exit
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Play => self.play(),
            Command::Pause => {
                if self.status.pause() {
                    debug!("Paused at frame {}", self.status.position);
                    self.publish();
                }
            }
            Command::Toggle => {
                if self.status.is_playing() {
                    return self.handle(Command::Pause);
                }
                self.play();
            }
            Command::SeekTo(index) => return self.seek_latest(index),
            #[cfg(test)]
            Command::Flush(reply) => {
                let _ = reply.send(());
            }
            Command::Close => return false,
        }
        true
    }

    fn play(&mut self) {
        match self.status.play() {
            PlayTransition::Ignored => return,
            PlayTransition::Resumed => {}
            PlayTransition::Rewound => {
                if let Err(e) = self.source.seek_to_frame(0) {
                    warn!("Rewind failed: {}", e);
                }
            }
        }
        debug!("Playing from frame {}", self.status.position);
        self.next_frame_at = Instant::now();
        self.publish();
    }

    /// Seek to the newest of the queued seek targets.
    ///
    /// A slider drag queues one seek per UI frame; only the last one is
    /// decoded. Returns false when a Close was found behind them.
    fn seek_latest(&mut self, index: u64) -> bool {
        let mut target = index;
        let mut skipped = 0;
        loop {
            match self.commands.try_recv() {
                Ok(Command::SeekTo(next)) => {
                    target = next;
                    skipped += 1;
                }
                Ok(Command::Close) => return false,
                Ok(other) => {
                    self.seek(target);
                    return self.handle(other);
                }
                Err(_) => break,
            }
        }
        if skipped > 0 {
            debug!("Coalesced {} queued seeks", skipped);
        }
        self.seek(target);
        true
    }

    fn seek(&mut self, index: u64) {
        let index = self.status.seek(index);
        if let Err(e) = self.source.seek_to_frame(index) {
            warn!("Seek to frame {} failed: {}", index, e);
        }

        if self.status.is_playing() {
            // Next iteration decodes and shows the target frame
            self.next_frame_at = Instant::now();
        } else if index < self.status.total_frames {
            self.preview(index);
        }
        self.publish();
    }

    /// Decode and show frame `index` without advancing
    fn preview(&mut self, index: u64) {
        if let Some(frame) = self.source.read_frame() {
            self.sink.present(index, frame);
        }
        if let Err(e) = self.source.seek_to_frame(index) {
            warn!("Seek back to frame {} failed: {}", index, e);
        }
    }

    /// One iteration of the playing loop
    fn step(&mut self) {
        if self.status.at_end() {
            self.status.finish();
            self.publish();
            return;
        }

        match self.source.read_frame() {
            Some(frame) => {
                self.sink.present(self.status.position, frame);
                if self.status.advance() {
                    info!("Playback reached the last frame ({})", self.status.position);
                }

                self.next_frame_at += self.frame_interval;
                let now = Instant::now();
                if self.next_frame_at < now {
                    // Running late, do not burst to catch up
                    self.next_frame_at = now;
                }
            }
            None => {
                info!("End of stream at frame {}", self.status.position);
                self.status.finish();
            }
        }
        self.publish();
    }

    fn publish(&self) {
        *self.shared.write() = self.status;
    }
}
