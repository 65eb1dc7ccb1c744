use eframe::egui;

use crate::state::{AppState, Page};
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SalaryAtlasApp {
    pub state: AppState,
}

impl SalaryAtlasApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for SalaryAtlasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar and pages ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: current page ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.page {
            Page::Overview => plot::overview_map(ui, &self.state),
            Page::Distribution => plot::distribution_plot(ui, &self.state),
            Page::Violin => plot::violin_plot(ui, &self.state),
            Page::Inequality => plot::inequality_plot(ui, &self.state),
            Page::Comparison => plot::comparison_plot(ui, &self.state),
            Page::Table => table::town_table(ui, &self.state),
        });
    }
}
