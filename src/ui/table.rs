use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

const ROW_HEIGHT: f32 = 18.0;

fn cell<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "–".to_string())
}

/// Towns passing the current filters, in file order.
pub fn town_table(ui: &mut Ui, state: &AppState) {
    let Some(dataset) = &state.dataset else {
        ui.label("No dataset loaded.");
        return;
    };
    let rows = &state.chart.towns;

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .column(Column::auto().at_least(140.0))
        .column(Column::auto().at_least(120.0))
        .column(Column::auto().at_least(120.0))
        .columns(Column::auto().at_least(80.0), 3)
        .header(ROW_HEIGHT + 4.0, |mut header| {
            for title in ["Town", "Region", "Department", "Population", "Firms", "Mean salary (€/h)"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                let town = &dataset.table.towns[rows[row.index()]];
                row.col(|ui| {
                    ui.label(&town.town);
                });
                row.col(|ui| {
                    ui.label(&town.region);
                });
                row.col(|ui| {
                    ui.label(&town.department);
                });
                row.col(|ui| {
                    ui.label(cell(town.total_population));
                });
                row.col(|ui| {
                    ui.label(cell(town.total_firms));
                });
                row.col(|ui| {
                    ui.label(cell(town.mean_salary.map(|s| format!("{s:.2}"))));
                });
            });
        });
}
