#![cfg_attr(windows, windows_subsystem = "windows")]

use anyhow::anyhow;
use anyhow::Result;
use eframe::egui;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod error;
mod export;
mod layout;
mod models;
mod processor;
mod utils;

use app::ResizerApp;
use config::AppConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();

    let config_path = AppConfig::default_path();
    let config = AppConfig::load(&config_path)?;
    info!(sizes = config.sizes.len(), "starting banner resizer");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([760.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Banner Resizer",
        options,
        Box::new(move |_| Box::new(ResizerApp::new(config, config_path))),
    )
    .map_err(|e| anyhow!("Application error: {}", e))
}
