//! Volcano Explorer - differential expression dashboard
//!
//! Loads a numeric table, computes fold changes and t-test p-values,
//! and shows a volcano plot, a correlation heatmap and the result table.

mod charts;
mod config;
mod data;
mod export;
mod gui;
mod stats;

use config::AppConfig;
use eframe::egui;
use env_logger::Env;
use gui::VolcanoApp;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::load();
    log::info!(
        "Starting with fold change {} and p-value {} thresholds",
        config.thresholds.fold_change,
        config.thresholds.p_value
    );

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_min_inner_size([1000.0, 650.0])
            .with_title("Volcano Explorer"),
        ..Default::default()
    };

    eframe::run_native(
        "Volcano Explorer",
        options,
        Box::new(move |cc| Ok(Box::new(VolcanoApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI failed: {e}"))
}
