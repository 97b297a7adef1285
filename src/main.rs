//! Video Viewer
//!
//! A minimal desktop video player: open a file, play, pause, stop, scrub with
//! a slider and watch elapsed / total time. Optionally remote-controlled over
//! stdin/stdout.

mod app;
mod config;
mod error;
mod ipc;
mod utils;
mod video;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use app::ViewerApp;
use config::ViewerConfig;
use ipc::start_ipc_server;

/// Video Viewer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file to open at startup
    file: Option<PathBuf>,

    /// Path to a JSON viewer configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Accept control messages on stdin and report status on stdout
    #[arg(long)]
    stdio: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging, RUST_LOG takes precedence over --debug
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Video Viewer starting...");

    let config = match &args.config {
        Some(path) => {
            info!("Loading config from: {:?}", path);
            ViewerConfig::load_from_file(path).unwrap_or_else(|e| {
                error!("Failed to load config, using defaults: {:#}", e);
                ViewerConfig::default()
            })
        }
        None => ViewerConfig::default(),
    };

    if let Some(ref file) = args.file {
        if !config.is_video_file(file) {
            warn!("{} does not have a known video extension", file.display());
        }
    }

    let ipc = if args.stdio {
        Some(start_ipc_server())
    } else {
        None
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_min_inner_size([480.0, 320.0])
            .with_drag_and_drop(true)
            .with_title(config.title.clone()),
        ..Default::default()
    };

    let app_name = config.title.clone();
    let initial_file = args.file;

    eframe::run_native(
        &app_name,
        native_options,
        Box::new(move |cc| Ok(Box::new(ViewerApp::new(cc, config, initial_file, ipc)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    info!("Video Viewer exiting");
    Ok(())
}
