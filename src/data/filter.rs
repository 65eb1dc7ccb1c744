use std::borrow::Borrow;

use super::model::{Bounds, Dataset, TownRecord, TownTable};
use super::reshape::{LongRecord, LongTable};
use super::schema::{AgeBracket, Category, Gender, SegmentKey};

// ---------------------------------------------------------------------------
// Predicate building blocks
// ---------------------------------------------------------------------------

/// A categorical selector. `All` is a distinct variant, never a string, so no
/// real value can be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Choice<T> {
    #[default]
    All,
    Only(T),
}

impl<T> Choice<T> {
    pub fn admits<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        match self {
            Choice::All => true,
            Choice::Only(v) => v.borrow() == value,
        }
    }

    /// Pass-through when the row has no value on this axis.
    pub fn admits_axis(&self, value: Option<T>) -> bool
    where
        T: PartialEq,
    {
        match (self, value) {
            (Choice::All, _) | (_, None) => true,
            (Choice::Only(v), Some(x)) => *v == x,
        }
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Choice::All => None,
            Choice::Only(v) => Some(v),
        }
    }
}

/// Inclusive numeric range: `min <= value <= max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeFilter<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> RangeFilter<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// A missing value never satisfies the range. An inverted range admits
    /// nothing.
    pub fn admits(&self, value: Option<T>) -> bool {
        match value {
            Some(v) => self.min <= v && v <= self.max,
            None => false,
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.min > self.max
    }
}

impl RangeFilter<f64> {
    /// Pull an end that sits within a thousandth of the observed span back
    /// onto the observed bound, so a slider dragged to its end keeps the
    /// extreme towns.
    pub fn snap_to_bounds(&mut self, bounds: Bounds<f64>) {
        let tolerance = (bounds.max - bounds.min).abs() * 1e-3;
        if (self.min - bounds.min).abs() <= tolerance {
            self.min = bounds.min;
        }
        if (self.max - bounds.max).abs() <= tolerance {
            self.max = bounds.max;
        }
    }
}

/// Number of towns that can be compared side by side.
pub const COMPARISON_SLOTS: usize = 3;

/// Towns picked for comparison, by index into the town table. An empty slot
/// is `None` and matches nothing, whatever the towns are called.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TownSelection {
    pub slots: [Option<usize>; COMPARISON_SLOTS],
}

impl TownSelection {
    /// Filled slots in slot order, duplicates removed.
    pub fn selected(&self) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::new();
        for &idx in self.slots.iter().flatten() {
            if !out.contains(&idx) {
                out.push(idx);
            }
        }
        out
    }

    pub fn is_active(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    pub fn admits(&self, town_index: usize) -> bool {
        !self.is_active() || self.slots.contains(&Some(town_index))
    }
}

// ---------------------------------------------------------------------------
// FilterState – every user-chosen predicate
// ---------------------------------------------------------------------------

/// The complete filter selection. Rebuilt from the controls on every change;
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub population: RangeFilter<u64>,
    /// Applies to the town's mean salary.
    pub salary: RangeFilter<f64>,
    pub region: Choice<String>,
    pub department: Choice<String>,
    pub gender: Choice<Gender>,
    pub category: Choice<Category>,
    pub age: Choice<AgeBracket>,
    pub towns: TownSelection,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            population: RangeFilter::new(0, u64::MAX),
            salary: RangeFilter::new(f64::NEG_INFINITY, f64::INFINITY),
            region: Choice::All,
            department: Choice::All,
            gender: Choice::All,
            category: Choice::All,
            age: Choice::All,
            towns: TownSelection::default(),
        }
    }
}

impl FilterState {
    /// Ranges span the dataset's observed bounds; every selector is `All`.
    pub fn for_dataset(dataset: &Dataset) -> Self {
        let mut state = Self::default();
        if let Some(b) = dataset.population_bounds {
            state.population = RangeFilter::new(b.min, b.max);
        }
        if let Some(b) = dataset.salary_bounds {
            state.salary = RangeFilter::new(b.min, b.max);
        }
        state
    }

    /// Change the region, dropping a department that does not belong to it.
    pub fn set_region(&mut self, dataset: &Dataset, region: Choice<String>) {
        if let (Choice::Only(r), Choice::Only(d)) = (&region, &self.department) {
            if !dataset.department_in_region(d, r) {
                log::debug!("department {d} not in region {r}, resetting to All");
                self.department = Choice::All;
            }
        }
        self.region = region;
    }

    fn admits_location(&self, town_index: usize, region: &str, department: &str) -> bool {
        self.region.admits(region) && self.department.admits(department) && self.towns.admits(town_index)
    }

    pub fn admits_town(&self, town_index: usize, record: &TownRecord) -> bool {
        self.population.admits(record.total_population)
            && self.salary.admits(record.mean_salary)
            && self.admits_location(town_index, &record.region, &record.department)
    }

    pub fn admits_segment(&self, key: &SegmentKey) -> bool {
        self.gender.admits_axis(key.gender)
            && self.category.admits_axis(key.category)
            && self.age.admits_axis(key.age)
    }

    pub fn admits_long(&self, record: &LongRecord) -> bool {
        self.admits_location(record.town_index, &record.region, &record.department)
            && self.admits_segment(&record.segment)
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Indices of towns that pass every active predicate, in table order.
pub fn filter_towns(table: &TownTable, filters: &FilterState) -> Vec<usize> {
    table
        .towns
        .iter()
        .enumerate()
        .filter(|(i, t)| filters.admits_town(*i, t))
        .map(|(i, _)| i)
        .collect()
}

/// Indices of long rows that pass the location, comparison and segment
/// predicates. Population and salary ranges are town-level and are applied
/// with [`filter_towns`] before reshaping.
pub fn filter_long(table: &LongTable, filters: &FilterState) -> Vec<usize> {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, r)| filters.admits_long(r))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::test_support::{sample_table, table_from, town};
    use crate::data::reshape::reshape;
    use crate::data::schema::Dimension;

    fn subset(table: &TownTable, indices: &[usize]) -> TownTable {
        TownTable::new(
            indices.iter().map(|&i| table.towns[i].clone()).collect(),
            table.measure_names().to_vec(),
        )
    }

    fn names(table: &TownTable, indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| table.towns[i].town.clone()).collect()
    }

    fn selection(slots: [Option<usize>; COMPARISON_SLOTS]) -> TownSelection {
        TownSelection { slots }
    }

    #[test]
    fn default_state_for_dataset_keeps_everything() {
        let ds = Dataset::new(sample_table()).unwrap();
        let state = FilterState::for_dataset(&ds);
        assert_eq!(filter_towns(&ds.table, &state), (0..ds.len()).collect::<Vec<_>>());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let table = sample_table();
        let state = FilterState {
            population: RangeFilter::new(139_000, 516_000),
            ..Default::default()
        };
        let kept = filter_towns(&table, &state);
        assert_eq!(names(&table, &kept), vec!["Lyon", "Villeurbanne", "Brest"]);
    }

    #[test]
    fn inverted_range_yields_nothing() {
        let table = sample_table();
        let state = FilterState {
            salary: RangeFilter::new(100.0, 10.0),
            ..Default::default()
        };
        assert!(state.salary.is_inverted());
        assert!(filter_towns(&table, &state).is_empty());
    }

    #[test]
    fn missing_value_fails_range() {
        let mut table = sample_table();
        table.towns[0].mean_salary = None;
        let state = FilterState::default();
        assert!(!filter_towns(&table, &state).contains(&0));
    }

    #[test]
    fn filtering_is_idempotent() {
        let table = sample_table();
        let state = FilterState {
            population: RangeFilter::new(1_000, 600_000),
            region: Choice::Only("Auvergne-Rhone-Alpes".to_string()),
            ..Default::default()
        };
        let once = subset(&table, &filter_towns(&table, &state));
        let twice = subset(&once, &filter_towns(&once, &state));
        assert_eq!(once, twice);
        assert_eq!(filter_towns(&table, &state), filter_towns(&table, &state));
    }

    #[test]
    fn widening_a_range_never_drops_rows() {
        let table = sample_table();
        let narrow = FilterState {
            salary: RangeFilter::new(14.0, 17.5),
            ..Default::default()
        };
        let narrow_rows = filter_towns(&table, &narrow);
        for (lo, hi) in [(13.0, 17.5), (14.0, 30.0), (0.0, 100.0)] {
            let wide = FilterState {
                salary: RangeFilter::new(lo, hi),
                ..Default::default()
            };
            let wide_rows = filter_towns(&table, &wide);
            assert!(narrow_rows.iter().all(|i| wide_rows.contains(i)));
        }
    }

    #[test]
    fn all_choice_is_pass_through() {
        let table = sample_table();
        let state = FilterState::default();
        assert_eq!(filter_towns(&table, &state).len(), table.len());

        let long = reshape(&table, &Dimension::Age.resolve(&table).unwrap());
        assert_eq!(filter_long(&long, &state).len(), long.len());
    }

    #[test]
    fn department_choice_is_exact_match() {
        let table = sample_table();
        let state = FilterState {
            department: Choice::Only("Rhone".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&table, &filter_towns(&table, &state)), vec!["Lyon", "Villeurbanne"]);
        let state = FilterState {
            department: Choice::Only("rhone".to_string()),
            ..Default::default()
        };
        assert!(filter_towns(&table, &state).is_empty());
    }

    #[test]
    fn comparison_ignores_empty_slot_even_with_town_named_none() {
        let table = sample_table();
        let state = FilterState {
            towns: selection([Some(0), Some(1), None]),
            ..Default::default()
        };
        let kept = names(&table, &filter_towns(&table, &state));
        assert_eq!(kept, vec!["Paris", "Lyon"]);

        let long = reshape(&table, &Dimension::Gender.resolve(&table).unwrap());
        let rows = filter_long(&long, &state);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|&i| table.towns[long.rows[i].town_index].town != "none"));
    }

    #[test]
    fn town_named_all_is_an_ordinary_value() {
        let table = table_from(vec![town("All", "R", "D", 10, 10.0), town("B", "R", "D", 10, 10.0)]);
        let state = FilterState {
            towns: selection([Some(0), None, None]),
            ..Default::default()
        };
        assert_eq!(names(&table, &filter_towns(&table, &state)), vec!["All"]);
    }

    #[test]
    fn homonymous_towns_are_selected_separately() {
        let table = table_from(vec![
            town("Saint-Denis", "Ile-de-France", "Seine-Saint-Denis", 113_000, 13.0),
            town("Saint-Denis", "La Reunion", "La Reunion", 153_000, 12.0),
            town("Lyon", "Auvergne-Rhone-Alpes", "Rhone", 516_000, 17.4),
        ]);
        let state = FilterState {
            towns: selection([Some(1), None, None]),
            ..Default::default()
        };
        assert_eq!(filter_towns(&table, &state), vec![1]);

        let long = reshape(&table, &Dimension::Gender.resolve(&table).unwrap());
        let rows = filter_long(&long, &state);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|&i| long.rows[i].department == "La Reunion"));
    }

    #[test]
    fn segment_choice_only_applies_to_carried_axes() {
        let table = sample_table();
        let state = FilterState {
            gender: Choice::Only(Gender::Female),
            ..Default::default()
        };
        let cross = reshape(&table, &Dimension::GenderCategory.resolve(&table).unwrap());
        let rows = filter_long(&cross, &state);
        assert_eq!(rows.len(), table.len() * 4);
        assert!(rows.iter().all(|&i| cross.rows[i].segment.gender == Some(Gender::Female)));

        let age = reshape(&table, &Dimension::Age.resolve(&table).unwrap());
        assert_eq!(filter_long(&age, &state).len(), age.len());
    }

    #[test]
    fn changing_region_resets_foreign_department() {
        let ds = Dataset::new(sample_table()).unwrap();
        let mut state = FilterState::for_dataset(&ds);
        state.department = Choice::Only("Rhone".to_string());
        state.set_region(&ds, Choice::Only("Auvergne-Rhone-Alpes".to_string()));
        assert_eq!(state.department, Choice::Only("Rhone".to_string()));
        state.set_region(&ds, Choice::Only("Bretagne".to_string()));
        assert_eq!(state.department, Choice::All);
    }

    #[test]
    fn selection_deduplicates_slots() {
        let sel = selection([Some(1), None, Some(1)]);
        assert_eq!(sel.selected(), vec![1]);
        assert!(TownSelection::default().admits(42));
    }

    #[test]
    fn salary_range_snaps_onto_observed_bounds() {
        let table = table_from(vec![
            town("Low", "R", "D", 10, 11.3),
            town("High", "R", "D", 10, 21.93),
        ]);
        let bounds = Bounds { min: 11.3, max: 21.93 };
        let mut range = RangeFilter::new(11.3004, 21.925);
        range.snap_to_bounds(bounds);
        assert_eq!(range, RangeFilter::new(11.3, 21.93));
        let state = FilterState {
            salary: range,
            ..Default::default()
        };
        assert_eq!(filter_towns(&table, &state), vec![0, 1]);

        let mut narrowed = RangeFilter::new(12.0, 20.0);
        narrowed.snap_to_bounds(bounds);
        assert_eq!(narrowed, RangeFilter::new(12.0, 20.0));
    }
}
