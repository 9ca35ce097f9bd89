mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use app::HpgeViewerApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    // Spectrum files passed on the command line are opened at startup.
    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "HPGe Spectrum Viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(HpgeViewerApp::with_files(&paths)))),
    )
}
