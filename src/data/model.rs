use std::collections::{BTreeMap, BTreeSet};

use super::filter::Choice;
use super::schema::{DatasetSchema, Dimension, ResolvedDimension, SchemaError};

// ---------------------------------------------------------------------------
// Column names of the identity part of the wide table
// ---------------------------------------------------------------------------

pub const TOWN: &str = "Town";
pub const REGION: &str = "Region";
pub const DEPARTMENT: &str = "Department";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const TOTAL_POPULATION: &str = "total_population";
pub const TOTAL_FIRMS: &str = "total_firms";
pub const MEAN_SALARY: &str = "mean_salary";

/// Columns every input file must carry. Any other column is a measure.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    TOWN,
    REGION,
    DEPARTMENT,
    LATITUDE,
    LONGITUDE,
    TOTAL_POPULATION,
    TOTAL_FIRMS,
    MEAN_SALARY,
];

// ---------------------------------------------------------------------------
// TownRecord – one row of the wide table
// ---------------------------------------------------------------------------

/// One municipality. Numeric cells that were empty or unparsable are `None`.
///
/// Town names repeat across departments; a town is identified by its
/// position in [`TownTable::towns`].
#[derive(Debug, Clone, PartialEq)]
pub struct TownRecord {
    pub town: String,
    pub region: String,
    pub department: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub total_population: Option<u64>,
    pub total_firms: Option<u64>,
    /// Currency per hour.
    pub mean_salary: Option<f64>,
    /// Values of the table's measure columns, same order as
    /// [`TownTable::measure_names`].
    pub measures: Vec<Option<f64>>,
}

impl TownRecord {
    pub fn measure(&self, idx: usize) -> Option<f64> {
        self.measures.get(idx).copied().flatten()
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

// ---------------------------------------------------------------------------
// TownTable – the wide table as loaded
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TownTable {
    pub towns: Vec<TownRecord>,
    measure_names: Vec<String>,
    measure_index: BTreeMap<String, usize>,
}

impl TownTable {
    pub fn new(towns: Vec<TownRecord>, measure_names: Vec<String>) -> Self {
        let measure_index = measure_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            towns,
            measure_names,
            measure_index,
        }
    }

    pub fn measure_names(&self) -> &[String] {
        &self.measure_names
    }

    pub fn measure_index(&self, column: &str) -> Option<usize> {
        self.measure_index.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.towns.len()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the immutable handle shared by every view
// ---------------------------------------------------------------------------

/// Inclusive observed range of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

/// Loaded table plus everything derived from it once at load time.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub table: TownTable,
    schema: DatasetSchema,
    pub population_bounds: Option<Bounds<u64>>,
    pub salary_bounds: Option<Bounds<f64>>,
    /// region → departments
    departments: BTreeMap<String, BTreeSet<String>>,
    /// (region, department) → town indices in source order
    towns: BTreeMap<(String, String), Vec<usize>>,
}

impl Dataset {
    pub fn new(table: TownTable) -> Result<Self, SchemaError> {
        let schema = DatasetSchema::validate(&table)?;

        let population_bounds = bounds(table.towns.iter().filter_map(|t| t.total_population));
        let salary_bounds = bounds(
            table
                .towns
                .iter()
                .filter_map(|t| t.mean_salary)
                .filter(|v| v.is_finite()),
        );

        let mut departments: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut towns: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
        for (idx, t) in table.towns.iter().enumerate() {
            departments
                .entry(t.region.clone())
                .or_default()
                .insert(t.department.clone());
            towns
                .entry((t.region.clone(), t.department.clone()))
                .or_default()
                .push(idx);
        }

        Ok(Self {
            table,
            schema,
            population_bounds,
            salary_bounds,
            departments,
            towns,
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn resolved(&self, dimension: Dimension) -> &ResolvedDimension {
        self.schema.resolved(dimension)
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.departments.keys().map(String::as_str)
    }

    /// Departments available under the region selector, sorted.
    pub fn departments(&self, region: &Choice<String>) -> Vec<&str> {
        let mut out: BTreeSet<&str> = BTreeSet::new();
        for (r, deps) in &self.departments {
            if region.admits(r) {
                out.extend(deps.iter().map(String::as_str));
            }
        }
        out.into_iter().collect()
    }

    pub fn department_in_region(&self, department: &str, region: &str) -> bool {
        self.departments
            .get(region)
            .is_some_and(|deps| deps.contains(department))
    }

    /// Indices of the towns available under the region and department
    /// selectors, grouped by (region, department).
    pub fn town_indices(&self, region: &Choice<String>, department: &Choice<String>) -> Vec<usize> {
        self.towns
            .iter()
            .filter(|((r, d), _)| region.admits(r) && department.admits(d))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// `Town (Department)`, unambiguous where a bare name is not.
    pub fn town_label(&self, idx: usize) -> Option<String> {
        let t = self.table.towns.get(idx)?;
        Some(format!("{} ({})", t.town, t.department))
    }
}

fn bounds<T: PartialOrd + Copy>(values: impl Iterator<Item = T>) -> Option<Bounds<T>> {
    values.fold(None, |acc, v| match acc {
        None => Some(Bounds { min: v, max: v }),
        Some(b) => Some(Bounds {
            min: if v < b.min { v } else { b.min },
            max: if v > b.max { v } else { b.max },
        }),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::data::schema::Dimension;

    pub fn all_measure_columns() -> Vec<&'static str> {
        let mut cols: Vec<&'static str> = Dimension::ALL
            .iter()
            .flat_map(|d| d.segments().into_iter().map(|(_, c)| c))
            .collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    pub fn town(name: &str, region: &str, department: &str, population: u64, salary: f64) -> TownRecord {
        TownRecord {
            town: name.to_string(),
            region: region.to_string(),
            department: department.to_string(),
            latitude: Some(46.0),
            longitude: Some(2.0),
            total_population: Some(population),
            total_firms: Some(population / 20),
            mean_salary: Some(salary),
            measures: Vec::new(),
        }
    }

    /// A table with the given towns; every measure is filled from the
    /// town's mean salary and the measure's position.
    pub fn table_from(towns: Vec<TownRecord>) -> TownTable {
        let columns = all_measure_columns();
        let towns = towns
            .into_iter()
            .map(|mut t| {
                let base = t.mean_salary.unwrap_or(10.0);
                t.measures = (0..columns.len()).map(|i| Some(base + i as f64)).collect();
                t
            })
            .collect();
        TownTable::new(towns, columns.into_iter().map(String::from).collect())
    }

    pub fn sample_table() -> TownTable {
        table_from(vec![
            town("Paris", "Ile-de-France", "Paris", 2_148_000, 21.9),
            town("Lyon", "Auvergne-Rhone-Alpes", "Rhone", 516_000, 17.4),
            town("Villeurbanne", "Auvergne-Rhone-Alpes", "Rhone", 150_000, 14.2),
            town("Annecy", "Auvergne-Rhone-Alpes", "Haute-Savoie", 130_000, 16.0),
            town("none", "Bretagne", "Finistere", 800, 11.3),
            town("Brest", "Bretagne", "Finistere", 139_000, 13.8),
        ])
    }

    pub fn table_with_measures(columns: &[&str]) -> TownTable {
        let mut t = town("Paris", "Ile-de-France", "Paris", 2_148_000, 21.9);
        t.measures = columns.iter().map(|_| Some(20.0)).collect();
        TownTable::new(vec![t], columns.iter().map(|c| c.to_string()).collect())
    }
}
