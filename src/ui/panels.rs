use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::{COMPARISON_SLOTS, Choice};
use crate::data::schema::{AgeBracket, Category, Dimension, Gender};
use crate::state::{AppState, Page};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let dataset = match &state.dataset {
        Some(ds) => ds,
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };

    // Clone what we need so we can mutate state inside the panel.
    let population_bounds = dataset.population_bounds;
    let salary_bounds = dataset.salary_bounds;
    let regions: Vec<(String, String)> = dataset
        .regions()
        .map(|r| (r.to_string(), r.to_string()))
        .collect();
    let departments: Vec<(String, String)> = dataset
        .departments(&state.filters.region)
        .into_iter()
        .map(|d| (d.to_string(), d.to_string()))
        .collect();
    let towns: Vec<(usize, String)> = dataset
        .town_indices(&state.filters.region, &state.filters.department)
        .into_iter()
        .filter_map(|idx| Some((idx, dataset.town_label(idx)?)))
        .collect();
    let slot_labels: Vec<Option<String>> = state
        .filters
        .towns
        .slots
        .iter()
        .map(|slot| slot.and_then(|idx| dataset.town_label(idx)))
        .collect();

    let genders: Vec<(Gender, String)> = Gender::ALL
        .iter()
        .map(|g| (*g, g.display_name().to_string()))
        .collect();
    let categories: Vec<(Category, String)> = Category::ALL
        .iter()
        .map(|c| (*c, c.display_name().to_string()))
        .collect();
    let ages: Vec<(AgeBracket, String)> = AgeBracket::ALL
        .iter()
        .map(|a| (*a, a.display_name().to_string()))
        .collect();

    let mut changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Ranges ----
            if let Some(b) = population_bounds {
                ui.strong("Population");
                let range = &mut state.filters.population;
                changed |= ui
                    .add(egui::Slider::new(&mut range.min, b.min..=b.max).logarithmic(true).text("min"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut range.max, b.min..=b.max).logarithmic(true).text("max"))
                    .changed();
            }
            if let Some(b) = salary_bounds {
                ui.strong("Mean salary (€/h)");
                let range = &mut state.filters.salary;
                let mut moved = ui
                    .add(
                        egui::Slider::new(&mut range.min, b.min..=b.max)
                            .custom_formatter(|v, _| format!("{v:.2}"))
                            .text("min"),
                    )
                    .changed();
                moved |= ui
                    .add(
                        egui::Slider::new(&mut range.max, b.min..=b.max)
                            .custom_formatter(|v, _| format!("{v:.2}"))
                            .text("max"),
                    )
                    .changed();
                if moved {
                    range.snap_to_bounds(b);
                    changed = true;
                }
            }
            if state.filters.population.is_inverted() || state.filters.salary.is_inverted() {
                ui.label(RichText::new("min is above max: nothing selected").color(Color32::YELLOW));
            }
            ui.separator();

            // ---- Location (cascading) ----
            ui.strong("Region");
            let mut region = state.filters.region.clone();
            if choice_combo(ui, "region", &mut region, &regions) {
                state.set_region(region);
            }
            ui.strong("Department");
            let mut department = state.filters.department.clone();
            if choice_combo(ui, "department", &mut department, &departments) {
                state.set_department(department);
            }
            ui.separator();

            // ---- Segments ----
            ui.strong("Gender");
            changed |= choice_combo(ui, "gender", &mut state.filters.gender, &genders);
            ui.strong("Category");
            changed |= choice_combo(ui, "category", &mut state.filters.category, &categories);
            ui.strong("Age");
            changed |= choice_combo(ui, "age", &mut state.filters.age, &ages);
            ui.separator();

            // ---- Town comparison ----
            ui.strong(format!("Compare towns (up to {COMPARISON_SLOTS})"));
            for slot in 0..COMPARISON_SLOTS {
                let current = state.filters.towns.slots[slot];
                let mut picked: Option<Option<usize>> = None;
                egui::ComboBox::from_id_salt(("town_slot", slot))
                    .selected_text(slot_labels[slot].as_deref().unwrap_or("—"))
                    .show_ui(ui, |ui: &mut Ui| {
                        if ui.selectable_label(current.is_none(), "—").clicked() {
                            picked = Some(None);
                        }
                        for (idx, label) in &towns {
                            if ui.selectable_label(current == Some(*idx), label).clicked() {
                                picked = Some(Some(*idx));
                            }
                        }
                    });
                if let Some(town) = picked {
                    state.set_town_slot(slot, town);
                }
            }
            ui.separator();

            // ---- Display ----
            ui.strong("Breakdown");
            let current = state.view.dimension;
            let mut picked_dimension = None;
            egui::ComboBox::from_id_salt("dimension")
                .selected_text(current.display_name())
                .show_ui(ui, |ui: &mut Ui| {
                    for dim in Dimension::ALL {
                        if ui.selectable_label(current == dim, dim.display_name()).clicked() {
                            picked_dimension = Some(dim);
                        }
                    }
                });
            if let Some(dim) = picked_dimension.filter(|d| *d != current) {
                state.set_dimension(dim);
            }
            changed |= ui.checkbox(&mut state.view.hide_outliers, "Hide outliers").changed();
            changed |= ui.checkbox(&mut state.view.log_axis, "Logarithmic salary axis").changed();
            ui.separator();

            if ui.button("Reset filters").clicked() {
                state.reset_filters();
            }
        });

    if changed {
        state.refresh();
    }
}

/// Combo box over `options` with an extra "All" entry. Returns whether the
/// choice changed.
fn choice_combo<T: Clone + PartialEq>(
    ui: &mut Ui,
    id: &str,
    current: &mut Choice<T>,
    options: &[(T, String)],
) -> bool {
    let selected_text = match current.as_option() {
        None => "All".to_string(),
        Some(v) => options
            .iter()
            .find(|(o, _)| o == v)
            .map(|(_, label)| label.clone())
            .unwrap_or_default(),
    };
    let mut changed = false;
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected_text)
        .show_ui(ui, |ui: &mut Ui| {
            let is_all = current.as_option().is_none();
            if ui.selectable_label(is_all, "All").clicked() && !is_all {
                *current = Choice::All;
                changed = true;
            }
            for (value, label) in options {
                let is_selected = current.as_option() == Some(value);
                if ui.selectable_label(is_selected, label).clicked() && !is_selected {
                    *current = Choice::Only(value.clone());
                    changed = true;
                }
            }
        });
    changed
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.dataset.is_some(), egui::Button::new("Export chart data…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        for page in Page::ALL {
            if ui.selectable_label(state.page == page, page.title()).clicked() {
                state.page = page;
            }
        }

        ui.separator();

        if let Some(ds) = &state.dataset {
            let summary = &state.chart.summary;
            ui.label(format!("{} towns loaded, {} visible", ds.len(), summary.towns));
            if let Some(avg) = summary.average_salary {
                ui.label(format!("average {avg:.2} €/h"));
            }
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open town statistics")
        .add_filter("Supported files", &["csv", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export chart data")
        .add_filter("JSON", &["json"])
        .set_file_name("chart_data.json")
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.chart.export_json(&path) {
            log::error!("Failed to export {}: {e:#}", path.display());
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
