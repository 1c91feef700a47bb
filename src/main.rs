mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::DashboardApp;
use config::DashboardConfig;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::discover();
    let mut state = AppState::new(&config);
    state.load(&config.data_path);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "India Air Quality Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new(state)))),
    )
}
