mod app;
mod backdrop;
mod calibration;
mod config;
mod diagram;
mod editor;
mod error;
mod export;
mod geometry;
mod glyphs;
mod history;
mod lengths;
mod model;
mod placement;
mod polyline;
mod telemetry;
mod zoom;

use eframe::{egui, NativeOptions};
use tracing_subscriber::EnvFilter;

use crate::{app::SchemaApp, config::Settings};

fn main() -> eframe::Result<()> {
    let loaded = Settings::load();
    let filter = match &loaded {
        Ok(settings) => settings.log_filter.clone(),
        Err(_) => Settings::default().log_filter,
    };
    init_tracing(&filter);

    let settings = loaded.unwrap_or_else(|err| {
        tracing::warn!("falling back to default settings: {err:#}");
        Settings::default()
    });

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Schema Planner")
            .with_resizable(true)
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Schema Planner",
        options,
        Box::new(|cc| Ok(Box::new(SchemaApp::new(cc, settings)))),
    )
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
