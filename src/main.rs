mod app;
mod chart;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::SalaryAtlasApp;
use clap::Parser;
use config::Cli;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let cli = Cli::parse();
    let mut state = AppState::new(cli.view_options(), cli.page);
    if cli.data.exists() {
        state.load_path(&cli.data);
    } else {
        log::warn!("{} not found, starting without data", cli.data.display());
        state.status_message = Some(format!(
            "{} not found – use File → Open…",
            cli.data.display()
        ));
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Salary Atlas – French towns",
        options,
        Box::new(move |_cc| Ok(Box::new(SalaryAtlasApp::new(state)))),
    )
}
