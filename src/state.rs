use std::path::Path;

use clap::ValueEnum;

use crate::chart::{ChartData, ViewOptions, render};
use crate::data::filter::{COMPARISON_SLOTS, Choice, FilterState};
use crate::data::loader::open_dataset;
use crate::data::model::Dataset;
use crate::data::schema::Dimension;

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Page {
    /// Map of towns coloured by mean salary
    Overview,
    /// Box plots per segment
    Distribution,
    /// Violin plots per segment
    Violin,
    /// Gender × category box plots
    Inequality,
    /// Grouped bars for up to three towns
    Comparison,
    /// Filtered towns as a table
    Table,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Overview,
        Page::Distribution,
        Page::Violin,
        Page::Inequality,
        Page::Comparison,
        Page::Table,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Page::Overview => "Overview",
            Page::Distribution => "Distribution",
            Page::Violin => "Violin",
            Page::Inequality => "Inequality",
            Page::Comparison => "Compare towns",
            Page::Table => "Table",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until a file loads successfully).
    pub dataset: Option<Dataset>,

    pub filters: FilterState,

    pub view: ViewOptions,

    pub page: Page,

    /// Chart data for the current filters (recomputed on every change).
    pub chart: ChartData,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ViewOptions::default(), Page::Overview)
    }
}

impl AppState {
    pub fn new(view: ViewOptions, page: Page) -> Self {
        Self {
            dataset: None,
            filters: FilterState::default(),
            chart: ChartData::empty(&view),
            view,
            page,
            status_message: None,
        }
    }

    /// Load and validate a file. On failure the previous dataset stays.
    pub fn load_path(&mut self, path: &Path) {
        match open_dataset(path) {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", path.display());
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded dataset and reset the filters to its bounds.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.filters = FilterState::for_dataset(&dataset);
        self.dataset = Some(dataset);
        self.status_message = None;
        self.refresh();
    }

    /// Recompute `chart` after a filter or view change.
    pub fn refresh(&mut self) {
        self.chart = match &self.dataset {
            Some(ds) => render(ds, &self.filters, &self.view),
            None => ChartData::empty(&self.view),
        };
    }

    pub fn reset_filters(&mut self) {
        if let Some(ds) = &self.dataset {
            self.filters = FilterState::for_dataset(ds);
        }
        self.refresh();
    }

    /// Region change cascades to the department and the town slots.
    pub fn set_region(&mut self, region: Choice<String>) {
        if let Some(ds) = &self.dataset {
            self.filters.set_region(ds, region);
            prune_town_slots(ds, &mut self.filters);
        }
        self.refresh();
    }

    pub fn set_department(&mut self, department: Choice<String>) {
        if let Some(ds) = &self.dataset {
            self.filters.department = department;
            prune_town_slots(ds, &mut self.filters);
        }
        self.refresh();
    }

    /// `town` is an index into the dataset's town table.
    pub fn set_town_slot(&mut self, slot: usize, town: Option<usize>) {
        if slot < COMPARISON_SLOTS {
            self.filters.towns.slots[slot] = town;
            self.refresh();
        }
    }

    pub fn set_dimension(&mut self, dimension: Dimension) {
        self.view.dimension = dimension;
        self.refresh();
    }
}

/// Empty the slots whose town is no longer selectable.
fn prune_town_slots(dataset: &Dataset, filters: &mut FilterState) {
    let available = dataset.town_indices(&filters.region, &filters.department);
    for slot in filters.towns.slots.iter_mut() {
        if slot.is_some_and(|idx| !available.contains(&idx)) {
            log::debug!("clearing comparison slot {slot:?}");
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::data::filter::RangeFilter;
    use crate::data::model::test_support::sample_table;

    fn loaded() -> AppState {
        let mut state = AppState::default();
        state.set_dataset(Dataset::new(sample_table()).unwrap());
        state
    }

    #[test]
    fn new_dataset_resets_filters_and_renders() {
        let mut state = loaded();
        assert_eq!(state.chart.towns.len(), 6);
        state.filters.population = RangeFilter::new(0, 1);
        state.refresh();
        assert!(state.chart.towns.is_empty());
        state.set_dataset(Dataset::new(sample_table()).unwrap());
        assert_eq!(state.chart.towns.len(), 6);
    }

    #[test]
    fn failed_load_keeps_previous_dataset() {
        let mut state = loaded();
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"Town\nBrest\n").unwrap();
        state.load_path(file.path());
        assert!(state.dataset.is_some());
        assert!(state.status_message.as_deref().unwrap().starts_with("Error"));
    }

    #[test]
    fn region_change_clears_foreign_town_slots() {
        let mut state = loaded();
        state.set_town_slot(0, Some(0));
        state.set_town_slot(1, Some(1));
        state.set_department(Choice::Only("Rhone".to_string()));
        assert_eq!(state.filters.towns.slots[0], None);
        assert_eq!(state.filters.towns.slots[1], Some(1));

        state.set_region(Choice::Only("Bretagne".to_string()));
        assert_eq!(state.filters.department, Choice::All);
        assert!(!state.filters.towns.is_active());
        assert_eq!(state.chart.towns.len(), 2);
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let mut state = loaded();
        state.set_town_slot(COMPARISON_SLOTS, Some(0));
        assert!(!state.filters.towns.is_active());
    }

    #[test]
    fn dimension_change_rebuilds_distribution() {
        let mut state = loaded();
        state.set_dimension(Dimension::Age);
        assert_eq!(state.chart.dimension, Dimension::Age);
        assert_eq!(state.chart.distribution.len(), 3);
    }
}
