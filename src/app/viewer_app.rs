//! Main viewer application
//!
//! Implements the egui App trait: video surface, transport controls, seek
//! slider and time label. All playback work happens on the driver's thread;
//! this side only sends commands and uploads the latest frame.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use egui::{Color32, RichText, Vec2};
use tracing::{error, info, warn};

use crate::config::ViewerConfig;
use crate::ipc::{error_codes, ControlCommand, IpcMessage, IpcReceiver, IpcSender};
use crate::video::{FrameMailbox, PlaybackDriver};

use super::state::PlaybackStatus;

/// Report position over IPC every this many frames while playing
const STATUS_UPDATE_INTERVAL: u64 = 10;

/// How often to poll IPC input while nothing else repaints
const IPC_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Width of the seek slider in points
const SLIDER_WIDTH: f32 = 300.0;

/// Main viewer application
pub struct ViewerApp {
    /// Viewer settings
    config: ViewerConfig,
    /// Playback session control
    driver: PlaybackDriver,
    /// Latest frame from the playback thread
    mailbox: Arc<FrameMailbox>,

    /// Current frame texture
    frame_texture: Option<egui::TextureHandle>,
    /// Native size of the current frame
    frame_size: Vec2,
    /// Stream index of the frame on screen
    shown_frame: Option<u64>,

    /// File of the open session
    current_file: Option<PathBuf>,
    /// Last open failure, shown until the next successful open
    last_error: Option<String>,

    /// IPC receiver
    ipc_rx: Option<IpcReceiver>,
    /// IPC sender
    ipc_tx: Option<IpcSender>,
    /// Status last sent over IPC
    last_reported: Option<PlaybackStatus>,
}

impl ViewerApp {
    /// Create the viewer, opening `initial_file` if given
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: ViewerConfig,
        initial_file: Option<PathBuf>,
        ipc: Option<(IpcReceiver, IpcSender)>,
    ) -> Self {
        let mailbox = Arc::new(FrameMailbox::new(Some(cc.egui_ctx.clone())));
        let driver = PlaybackDriver::new(mailbox.clone(), config.fallback_fps);

        let (ipc_rx, ipc_tx) = match ipc {
            Some((rx, tx)) => (Some(rx), Some(tx)),
            None => (None, None),
        };

        let mut app = Self {
            config,
            driver,
            mailbox,
            frame_texture: None,
            frame_size: Vec2::ZERO,
            shown_frame: None,
            current_file: None,
            last_error: None,
            ipc_rx,
            ipc_tx,
            last_reported: None,
        };

        if let Some(path) = initial_file {
            app.open_file(&path);
        }

        app
    }

    /// Open a file, replacing the current session
    fn open_file(&mut self, path: &Path) {
        match self.driver.open(path) {
            Ok(info) => {
                self.current_file = Some(path.to_path_buf());
                self.last_error = None;
                self.frame_size = Vec2::new(info.width as f32, info.height as f32);
                if self.config.autoplay {
                    self.driver.play();
                }
            }
            Err(e) => {
                if e.is_open_failure() {
                    warn!("Cannot open {}: {}", path.display(), e);
                } else {
                    error!("Failed to start playback for {}: {}", path.display(), e);
                }
                self.current_file = None;
                self.frame_texture = None;
                self.shown_frame = None;
                self.last_error = Some(e.to_string());
                if let Some(ref tx) = self.ipc_tx {
                    tx.send(IpcMessage::error(error_codes::OPEN_FAILED, e.to_string()));
                }
            }
        }
    }

    /// Show the open dialog
    fn pick_file(&mut self) {
        let extensions: Vec<&str> = self
            .config
            .video_extensions
            .iter()
            .map(String::as_str)
            .collect();

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Video files", &extensions)
            .pick_file()
        {
            self.open_file(&path);
        }
    }

    /// Close the session
    fn stop(&mut self) {
        self.driver.stop();
        self.frame_texture = None;
        self.shown_frame = None;
        info!("Playback stopped");
    }

    fn apply_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Play => self.driver.play(),
            ControlCommand::Pause => self.driver.pause(),
            ControlCommand::Toggle => self.driver.toggle(),
            ControlCommand::Stop => self.stop(),
            ControlCommand::SeekTo(index) => {
                self.driver.seek(index);
            }
        }
    }

    /// Handle IPC messages
    fn handle_ipc_messages(&mut self, ctx: &egui::Context) {
        let messages: Vec<IpcMessage> = match self.ipc_rx {
            Some(ref rx) => std::iter::from_fn(|| rx.try_recv()).collect(),
            None => return,
        };

        for msg in messages {
            match msg {
                IpcMessage::Open { path } => self.open_file(Path::new(&path)),
                IpcMessage::Control(command) => self.apply_command(command),
                IpcMessage::Shutdown => {
                    info!("Closing viewer on IPC request");
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                other => warn!("Ignoring unexpected IPC message: {:?}", other),
            }
        }
    }

    /// Send state update via IPC
    fn send_status_update(&mut self, status: &PlaybackStatus) {
        let Some(ref tx) = self.ipc_tx else {
            return;
        };
        if should_report(self.last_reported.as_ref(), status) {
            tx.send(IpcMessage::status_update(status));
            self.last_reported = Some(*status);
        }
    }

    /// Open the first dropped file with a known video extension
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });

        if let Some(path) = dropped.iter().find(|p| self.config.is_video_file(p)) {
            self.open_file(path);
        } else if let Some(path) = dropped.first() {
            warn!("Not a video file: {}", path.display());
        }
    }

    /// Upload the newest presented frame to the GPU
    fn upload_frame(&mut self, ctx: &egui::Context) {
        if self.mailbox.take_cleared() {
            self.frame_texture = None;
            self.shown_frame = None;
        }

        let Some(frame) = self.mailbox.take() else {
            return;
        };

        let size = [frame.image.width() as usize, frame.image.height() as usize];
        let image = egui::ColorImage::from_rgb(size, frame.image.as_raw());
        self.frame_size = Vec2::new(size[0] as f32, size[1] as f32);
        self.shown_frame = Some(frame.index);

        if let Some(ref mut texture) = self.frame_texture {
            texture.set(image, egui::TextureOptions::LINEAR);
        } else {
            self.frame_texture = Some(ctx.load_texture("frame", image, egui::TextureOptions::LINEAR));
        }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui, status: &PlaybackStatus) {
        ui.horizontal(|ui| {
            if ui.button("Open Video").clicked() {
                self.pick_file();
            }

            let play_label = if status.is_playing() { "Pause" } else { "Play" };
            if ui
                .add_enabled(status.is_loaded(), egui::Button::new(play_label))
                .clicked()
            {
                self.driver.toggle();
            }

            if ui
                .add_enabled(status.is_loaded(), egui::Button::new("Stop"))
                .clicked()
            {
                self.stop();
            }

            ui.spacing_mut().slider_width = SLIDER_WIDTH;
            let mut position = status.position;
            let slider = egui::Slider::new(&mut position, 0..=status.total_frames).show_value(false);
            if ui.add_enabled(status.is_loaded(), slider).changed() {
                self.driver.seek(position as i64);
            }

            ui.label(RichText::new(status.time_label()).monospace());
        });
    }

    fn show_status_line(&self, ui: &mut egui::Ui, status: &PlaybackStatus) {
        ui.horizontal(|ui| {
            if let Some(ref err) = self.last_error {
                ui.label(RichText::new(err).color(Color32::LIGHT_RED).small());
                return;
            }

            let name = self
                .current_file
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "No video".to_string());

            let shown = self
                .shown_frame
                .map(|index| index.to_string())
                .unwrap_or_else(|| "-".to_string());

            ui.label(RichText::new(format!(
                "{} | {} | Frame: {}/{} @ {:.2}fps",
                name,
                status.state.display_name(),
                shown,
                status.total_frames,
                status.fps
            ))
            .color(Color32::GRAY)
            .small());
        });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_ipc_messages(ctx);
        self.handle_dropped_files(ctx);

        let status = self.driver.status();
        if status.is_loaded() && ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.driver.toggle();
        }

        self.upload_frame(ctx);

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            self.show_controls(ui, &status);
            ui.separator();
            self.show_status_line(ui, &status);
            ui.add_space(2.0);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    if let Some(ref texture) = self.frame_texture {
                        let size = fit_size(self.frame_size, ui.available_size());
                        ui.image(egui::load::SizedTexture::new(texture.id(), size));
                    } else {
                        ui.label(
                            RichText::new("Open a video to start")
                                .color(Color32::DARK_GRAY)
                                .heading(),
                        );
                    }
                });
            });

        self.send_status_update(&status);

        if status.is_playing() {
            ctx.request_repaint();
        } else if self.ipc_rx.is_some() {
            ctx.request_repaint_after(IPC_POLL_INTERVAL);
        }
    }
}

/// Largest size with the frame's aspect ratio that fits in `available`
fn fit_size(frame: Vec2, available: Vec2) -> Vec2 {
    if frame.x <= 0.0 || frame.y <= 0.0 {
        return Vec2::ZERO;
    }
    let scale = (available.x / frame.x).min(available.y / frame.y).max(0.0);
    frame * scale
}

/// Whether `now` differs enough from the last reported status to send
fn should_report(last: Option<&PlaybackStatus>, now: &PlaybackStatus) -> bool {
    let Some(last) = last else {
        return true;
    };

    if last.state != now.state || last.total_frames != now.total_frames {
        return true;
    }

    if now.is_playing() {
        now.position.abs_diff(last.position) >= STATUS_UPDATE_INTERVAL
    } else {
        now.position != last.position
    }
}
