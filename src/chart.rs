//! Chart-ready data derived from the dataset and the current filters.
//!
//! Everything here is recomputed from scratch on each filter change by
//! [`render`]; nothing holds on to the previous result.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::filter::{FilterState, filter_long, filter_towns};
use crate::data::model::Dataset;
use crate::data::reshape::{LongTable, reshape_rows};
use crate::data::schema::{Dimension, SegmentKey};
use crate::data::stats::{BoxStats, Fences, box_stats, kernel_density, outlier_fences};

// ---------------------------------------------------------------------------
// View options and output types
// ---------------------------------------------------------------------------

/// Display toggles that do not change which rows are selected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewOptions {
    /// Dimension of the distribution and comparison views.
    pub dimension: Dimension,
    pub hide_outliers: bool,
    pub log_axis: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            dimension: Dimension::Category,
            hide_outliers: false,
            log_axis: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub town_index: usize,
    pub town: String,
    pub department: String,
    pub latitude: f64,
    pub longitude: f64,
    pub mean_salary: Option<f64>,
    pub total_firms: Option<u64>,
    pub total_population: Option<u64>,
}

/// Distribution of one segment's salaries across the selected towns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSeries {
    pub segment: SegmentKey,
    /// `None` when no selected town has a value for this segment.
    pub stats: Option<BoxStats>,
    /// Violin outline, `[salary, relative density]`.
    pub density: Vec<[f64; 2]>,
}

/// One compared town: a bar per segment value plus its mean salary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonGroup {
    pub town_index: usize,
    pub town: String,
    pub department: String,
    pub mean_salary: Option<f64>,
    pub bars: Vec<(SegmentKey, Option<f64>)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub towns: usize,
    pub population: u64,
    /// Unweighted average of the towns' mean salaries.
    pub average_salary: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    /// Indices into the dataset's town table.
    pub towns: Vec<usize>,
    pub summary: Summary,
    pub map: Vec<MapPoint>,
    pub dimension: Dimension,
    pub distribution: Vec<SegmentSeries>,
    /// Gender × category distribution (inequality view).
    pub inequality: Vec<SegmentSeries>,
    pub comparison: Vec<ComparisonGroup>,
    /// Salary axis range of the distribution and violin pages when outliers
    /// are hidden.
    pub distribution_axis: Option<Fences>,
    /// Same, over the gender × category series.
    pub inequality_axis: Option<Fences>,
    pub log_axis: bool,
}

impl ChartData {
    pub fn empty(options: &ViewOptions) -> Self {
        Self {
            towns: Vec::new(),
            summary: Summary::default(),
            map: Vec::new(),
            dimension: options.dimension,
            distribution: Vec::new(),
            inequality: Vec::new(),
            comparison: Vec::new(),
            distribution_axis: None,
            inequality_axis: None,
            log_axis: options.log_axis,
        }
    }

    /// Write the chart data as pretty-printed JSON.
    pub fn export_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialising chart data")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("exported chart data to {}", path.display());
        Ok(())
    }
}

impl MapPoint {
    /// Tooltip text for the overview map.
    pub fn hover_text(&self) -> String {
        let salary = self
            .mean_salary
            .map_or_else(|| "n/a".to_string(), |s| format!("{s:.2} €/h"));
        let firms = self.total_firms.map_or_else(|| "n/a".to_string(), |f| f.to_string());
        format!(
            "{} ({})\nMean salary: {salary}\nFirms: {firms}",
            self.town, self.department
        )
    }
}

/// The map point closest to `(longitude, latitude)`.
pub fn nearest_point(points: &[MapPoint], longitude: f64, latitude: f64) -> Option<&MapPoint> {
    let dist = |p: &MapPoint| (p.longitude - longitude).powi(2) + (p.latitude - latitude).powi(2);
    points.iter().min_by(|a, b| dist(*a).total_cmp(&dist(*b)))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Build every chart for the current filter state. Pure: same inputs, same
/// output. An empty selection gives empty series.
pub fn render(dataset: &Dataset, filters: &FilterState, options: &ViewOptions) -> ChartData {
    let towns = filter_towns(&dataset.table, filters);
    log::debug!("{} of {} towns pass the filters", towns.len(), dataset.len());

    let long = reshape_rows(&dataset.table, towns.iter().copied(), dataset.resolved(options.dimension));
    let distribution = segment_series(&long, filters);

    let cross = reshape_rows(
        &dataset.table,
        towns.iter().copied(),
        dataset.resolved(Dimension::GenderCategory),
    );
    log::debug!("{} long rows, {} gender × category rows", long.len(), cross.len());
    let inequality = segment_series(&cross, filters);

    let (distribution_axis, inequality_axis) = if options.hide_outliers {
        (
            axis_fences(&long, filters, options.log_axis),
            axis_fences(&cross, filters, options.log_axis),
        )
    } else {
        (None, None)
    };

    ChartData {
        summary: summarize(dataset, &towns),
        map: map_points(dataset, &towns),
        dimension: options.dimension,
        distribution,
        inequality,
        comparison: comparison_groups(dataset, filters, &towns, options.dimension),
        distribution_axis,
        inequality_axis,
        log_axis: options.log_axis,
        towns,
    }
}

/// Fences over every salary the long table's filtered rows show.
fn axis_fences(long: &LongTable, filters: &FilterState, log_axis: bool) -> Option<Fences> {
    let rows = filter_long(long, filters);
    outlier_fences(rows.iter().map(|&i| long.rows[i].salary), log_axis)
}

fn summarize(dataset: &Dataset, towns: &[usize]) -> Summary {
    let records = towns.iter().map(|&i| &dataset.table.towns[i]);
    let salaries: Vec<f64> = records.clone().filter_map(|t| t.mean_salary).collect();
    Summary {
        towns: towns.len(),
        population: records.filter_map(|t| t.total_population).sum(),
        average_salary: (!salaries.is_empty())
            .then(|| salaries.iter().sum::<f64>() / salaries.len() as f64),
    }
}

/// Towns without coordinates are left off the map.
pub fn map_points(dataset: &Dataset, towns: &[usize]) -> Vec<MapPoint> {
    towns
        .iter()
        .filter_map(|&i| {
            let t = &dataset.table.towns[i];
            let (latitude, longitude) = t.coordinates()?;
            Some(MapPoint {
                town_index: i,
                town: t.town.clone(),
                department: t.department.clone(),
                latitude,
                longitude,
                mean_salary: t.mean_salary,
                total_firms: t.total_firms,
                total_population: t.total_population,
            })
        })
        .collect()
}

/// One series per segment admitted by the segment choices, in dimension
/// order. Missing salaries are skipped.
pub fn segment_series(long: &LongTable, filters: &FilterState) -> Vec<SegmentSeries> {
    let rows = filter_long(long, filters);
    long.dimension
        .segments()
        .into_iter()
        .map(|(segment, _)| segment)
        .filter(|segment| filters.admits_segment(segment))
        .map(|segment| {
            let values: Vec<Option<f64>> = rows
                .iter()
                .map(|&i| &long.rows[i])
                .filter(|r| r.segment == segment)
                .map(|r| r.salary)
                .collect();
            SegmentSeries {
                segment,
                stats: box_stats(values.iter().copied()),
                density: kernel_density(values),
            }
        })
        .collect()
}

/// Groups for the compared towns, in slot order. A selected town that the
/// other filters exclude gets no group.
pub fn comparison_groups(
    dataset: &Dataset,
    filters: &FilterState,
    towns: &[usize],
    dimension: Dimension,
) -> Vec<ComparisonGroup> {
    let resolved = dataset.resolved(dimension);
    filters
        .towns
        .selected()
        .into_iter()
        .filter(|idx| towns.contains(idx))
        .filter_map(|idx| {
            let record = dataset.table.towns.get(idx)?;
            let long = reshape_rows(&dataset.table, [idx], resolved);
            Some(ComparisonGroup {
                town_index: idx,
                town: record.town.clone(),
                department: record.department.clone(),
                mean_salary: record.mean_salary,
                bars: long
                    .rows
                    .into_iter()
                    .filter(|r| filters.admits_segment(&r.segment))
                    .map(|r| (r.segment, r.salary))
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{Choice, RangeFilter, TownSelection};
    use crate::data::model::test_support::{sample_table, table_from, town};
    use crate::data::schema::Gender;

    fn dataset() -> Dataset {
        Dataset::new(sample_table()).unwrap()
    }

    #[test]
    fn default_render_covers_every_town() {
        let ds = dataset();
        let filters = FilterState::for_dataset(&ds);
        let chart = render(&ds, &filters, &ViewOptions::default());
        assert_eq!(chart.towns.len(), ds.len());
        assert_eq!(chart.map.len(), ds.len());
        assert_eq!(chart.distribution.len(), 4);
        assert_eq!(chart.inequality.len(), 8);
        assert!(chart.comparison.is_empty());
        assert!(chart.distribution_axis.is_none());
        assert!(chart.inequality_axis.is_none());
        for series in &chart.distribution {
            assert_eq!(series.stats.as_ref().map(|s| s.count), Some(ds.len()));
        }
    }

    #[test]
    fn render_is_deterministic() {
        let ds = dataset();
        let filters = FilterState {
            region: Choice::Only("Auvergne-Rhone-Alpes".to_string()),
            ..FilterState::for_dataset(&ds)
        };
        let options = ViewOptions {
            dimension: Dimension::Age,
            hide_outliers: true,
            log_axis: true,
        };
        assert_eq!(render(&ds, &filters, &options), render(&ds, &filters, &options));
    }

    #[test]
    fn inverted_range_renders_empty_charts() {
        let ds = dataset();
        let filters = FilterState {
            population: RangeFilter::new(100, 10),
            ..FilterState::for_dataset(&ds)
        };
        let options = ViewOptions {
            hide_outliers: true,
            ..Default::default()
        };
        let chart = render(&ds, &filters, &options);
        assert!(chart.towns.is_empty());
        assert!(chart.map.is_empty());
        assert!(chart.distribution.iter().all(|s| s.stats.is_none() && s.density.is_empty()));
        assert_eq!(chart.distribution_axis, None);
        assert_eq!(chart.inequality_axis, None);
        assert_eq!(chart.summary, Summary::default());
    }

    #[test]
    fn missing_coordinates_are_omitted_from_map() {
        let mut table = sample_table();
        table.towns[2].latitude = None;
        let ds = Dataset::new(table).unwrap();
        let chart = render(&ds, &FilterState::for_dataset(&ds), &ViewOptions::default());
        assert_eq!(chart.map.len(), ds.len() - 1);
        assert!(chart.map.iter().all(|p| p.town != "Villeurbanne"));
    }

    #[test]
    fn gender_choice_narrows_inequality_series() {
        let ds = dataset();
        let filters = FilterState {
            gender: Choice::Only(Gender::Male),
            ..FilterState::for_dataset(&ds)
        };
        let chart = render(&ds, &filters, &ViewOptions::default());
        assert_eq!(chart.inequality.len(), 4);
        assert!(chart.inequality.iter().all(|s| s.segment.gender == Some(Gender::Male)));
        // Category view carries no gender axis.
        assert_eq!(chart.distribution.len(), 4);
    }

    #[test]
    fn comparison_follows_slot_order() {
        let ds = dataset();
        let filters = FilterState {
            towns: TownSelection { slots: [Some(1), None, Some(0)] },
            ..FilterState::for_dataset(&ds)
        };
        let options = ViewOptions {
            dimension: Dimension::Gender,
            ..Default::default()
        };
        let chart = render(&ds, &filters, &options);
        let towns: Vec<&str> = chart.comparison.iter().map(|g| g.town.as_str()).collect();
        assert_eq!(towns, vec!["Lyon", "Paris"]);
        assert!(chart.comparison.iter().all(|g| g.bars.len() == 2));
        assert_eq!(chart.comparison[1].mean_salary, Some(21.9));
        assert_eq!(chart.summary.towns, 2);
    }

    #[test]
    fn excluded_town_gets_no_comparison_group() {
        let ds = dataset();
        let filters = FilterState {
            towns: TownSelection { slots: [Some(0), Some(5), None] },
            region: Choice::Only("Bretagne".to_string()),
            ..FilterState::for_dataset(&ds)
        };
        let chart = render(&ds, &filters, &ViewOptions::default());
        assert_eq!(chart.comparison.len(), 1);
        assert_eq!(chart.comparison[0].town, "Brest");
    }

    #[test]
    fn hidden_outliers_set_both_axes() {
        let ds = dataset();
        let filters = FilterState::for_dataset(&ds);
        let options = ViewOptions {
            hide_outliers: true,
            log_axis: true,
            ..Default::default()
        };
        let chart = render(&ds, &filters, &options);
        for axis in [chart.distribution_axis.unwrap(), chart.inequality_axis.unwrap()] {
            assert!(axis.lower >= 1.0);
            assert!(axis.upper > axis.lower);
        }
        assert!(chart.log_axis);
    }

    #[test]
    fn each_page_gets_its_own_outlier_axis() {
        let mut table = sample_table();
        let columns = |dim: Dimension| -> Vec<usize> {
            dim.segments()
                .iter()
                .map(|(_, c)| table.measure_index(c).unwrap())
                .collect()
        };
        let age = columns(Dimension::Age);
        let cross = columns(Dimension::GenderCategory);
        for (n, t) in table.towns.iter_mut().enumerate() {
            for &c in &age {
                t.measures[c] = Some(10.0 + n as f64 * 0.5);
            }
            for &c in &cross {
                t.measures[c] = Some(50.0 + n as f64 * 0.5);
            }
        }
        let ds = Dataset::new(table).unwrap();
        let options = ViewOptions {
            dimension: Dimension::Age,
            hide_outliers: true,
            log_axis: false,
        };
        let chart = render(&ds, &FilterState::for_dataset(&ds), &options);

        let dist = chart.distribution_axis.unwrap();
        assert!(dist.upper < 20.0);
        let ineq = chart.inequality_axis.unwrap();
        for series in &chart.inequality {
            let median = series.stats.as_ref().unwrap().median;
            assert!(ineq.lower <= median && median <= ineq.upper);
        }
    }

    #[test]
    fn homonymous_town_can_be_compared() {
        let ds = Dataset::new(table_from(vec![
            town("Saint-Denis", "Ile-de-France", "Seine-Saint-Denis", 113_000, 13.0),
            town("Saint-Denis", "La Reunion", "La Reunion", 153_000, 12.0),
            town("Lyon", "Auvergne-Rhone-Alpes", "Rhone", 516_000, 17.4),
        ]))
        .unwrap();
        let filters = FilterState {
            towns: TownSelection { slots: [Some(1), Some(0), None] },
            ..FilterState::for_dataset(&ds)
        };
        let chart = render(&ds, &filters, &ViewOptions::default());
        assert_eq!(chart.towns, vec![0, 1]);
        let groups: Vec<(usize, Option<f64>)> =
            chart.comparison.iter().map(|g| (g.town_index, g.mean_salary)).collect();
        assert_eq!(groups, vec![(1, Some(12.0)), (0, Some(13.0))]);
        assert_eq!(chart.comparison[0].department, "La Reunion");
    }

    #[test]
    fn hover_finds_nearest_town() {
        let ds = dataset();
        let mut chart = render(&ds, &FilterState::for_dataset(&ds), &ViewOptions::default());
        chart.map[1].longitude = 4.83;
        chart.map[1].latitude = 45.76;
        let hit = nearest_point(&chart.map, 4.8, 45.7).unwrap();
        assert_eq!(hit.town, "Lyon");
        let text = hit.hover_text();
        assert!(text.starts_with("Lyon (Rhone)"));
        assert!(text.contains("17.40 €/h"));
        assert!(text.contains("Firms: 25800"));
        assert!(nearest_point(&[], 0.0, 0.0).is_none());
    }

    #[test]
    fn chart_data_exports_as_json() {
        let ds = dataset();
        let chart = render(&ds, &FilterState::for_dataset(&ds), &ViewOptions::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        chart.export_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["dimension"], "category");
        assert_eq!(value["summary"]["towns"], 6);
        assert_eq!(value["map"].as_array().map(Vec::len), Some(6));
        assert_eq!(value["distribution"][0]["segment"]["category"], "worker");
    }
}
