use std::ops::RangeInclusive;

use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, MarkerShape, Plot,
    PlotBounds, PlotPoint, PlotPoints, Points, Polygon,
};

use crate::chart::{ChartData, SegmentSeries, nearest_point};
use crate::data::stats::Fences;
use crate::color::{SegmentColors, salary_ramp, town_color};
use crate::data::schema::{Category, Dimension, Gender};
use crate::state::AppState;

/// Number of colour bins on the overview map.
const MAP_BINS: usize = 5;

// ---------------------------------------------------------------------------
// Axis helpers
// ---------------------------------------------------------------------------

/// Salary values are plotted as log10 when the log axis is on.
fn to_axis(value: f64, log_axis: bool) -> f64 {
    if log_axis {
        value.max(f64::MIN_POSITIVE).log10()
    } else {
        value
    }
}

fn salary_formatter(log_axis: bool) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let v = if log_axis { 10f64.powf(mark.value) } else { mark.value };
        format!("{v:.1}")
    }
}

/// Category labels at integer positions, nothing in between.
fn label_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let rounded = mark.value.round();
        if (mark.value - rounded).abs() > 1e-6 || rounded < 0.0 {
            return String::new();
        }
        labels.get(rounded as usize).cloned().unwrap_or_default()
    }
}

/// Bounds pinning the salary axis to the outlier fences, when they are set.
fn salary_bounds(axis: Option<Fences>, log_axis: bool, x_range: (f64, f64)) -> Option<PlotBounds> {
    let f = axis?;
    let lower = to_axis(f.lower, log_axis);
    let upper = to_axis(f.upper, log_axis);
    (upper > lower).then(|| PlotBounds::from_min_max([x_range.0, lower], [x_range.1, upper]))
}

fn empty_hint(ui: &mut Ui, text: &str) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.heading(text);
    });
}

// ---------------------------------------------------------------------------
// Overview map
// ---------------------------------------------------------------------------

/// Towns on a longitude / latitude plane, coloured by mean salary.
pub fn overview_map(ui: &mut Ui, state: &AppState) {
    if state.dataset.is_none() {
        empty_hint(ui, "Open a file to view towns  (File → Open…)");
        return;
    }
    let points = &state.chart.map;

    let salaries = points.iter().filter_map(|p| p.mean_salary);
    let (lo, hi) = salaries.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let width = if hi > lo { (hi - lo) / MAP_BINS as f64 } else { 1.0 };

    let mut bins: Vec<Vec<[f64; 2]>> = vec![Vec::new(); MAP_BINS];
    let mut unknown: Vec<[f64; 2]> = Vec::new();
    for p in points {
        match p.mean_salary {
            Some(s) => {
                let bin = (((s - lo) / width) as usize).min(MAP_BINS - 1);
                bins[bin].push([p.longitude, p.latitude]);
            }
            None => unknown.push([p.longitude, p.latitude]),
        }
    }

    // Hovering a marker names the town behind it.
    let hover_points = points.clone();
    Plot::new("overview_map")
        .legend(Legend::default())
        .label_formatter(move |name: &str, value: &PlotPoint| {
            if name.is_empty() {
                return format!("lon {:.3}\nlat {:.3}", value.x, value.y);
            }
            nearest_point(&hover_points, value.x, value.y)
                .map(|p| p.hover_text())
                .unwrap_or_default()
        })
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        // Roughly square degrees at French latitudes.
        .data_aspect(1.45)
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            for (i, coords) in bins.into_iter().enumerate() {
                if coords.is_empty() {
                    continue;
                }
                let from = lo + width * i as f64;
                let name = format!("{:.1} – {:.1} €/h", from, from + width);
                let t = (i as f64 + 0.5) / MAP_BINS as f64;
                plot_ui.points(
                    Points::new(PlotPoints::from(coords))
                        .name(name)
                        .color(salary_ramp(t))
                        .shape(MarkerShape::Circle)
                        .radius(2.5),
                );
            }
            if !unknown.is_empty() {
                plot_ui.points(
                    Points::new(PlotPoints::from(unknown))
                        .name("no salary data")
                        .color(Color32::GRAY)
                        .radius(2.0),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Box plots
// ---------------------------------------------------------------------------

fn box_elem(x: f64, series: &SegmentSeries, color: Color32, width: f64, log_axis: bool) -> Option<BoxElem> {
    let s = series.stats.as_ref()?;
    let spread = BoxSpread::new(
        to_axis(s.lower_whisker, log_axis),
        to_axis(s.q1, log_axis),
        to_axis(s.median, log_axis),
        to_axis(s.q3, log_axis),
        to_axis(s.upper_whisker, log_axis),
    );
    Some(
        BoxElem::new(x, spread)
            .name(format!("{} (n = {})", series.segment, s.count))
            .box_width(width)
            .whisker_width(width * 0.6)
            .fill(color.gamma_multiply(0.4))
            .stroke(Stroke::new(1.5, color)),
    )
}

fn outlier_points(x: f64, series: &SegmentSeries, color: Color32, log_axis: bool) -> Option<Points<'_>> {
    let s = series.stats.as_ref()?;
    if s.outliers.is_empty() {
        return None;
    }
    let coords: Vec<[f64; 2]> = s.outliers.iter().map(|v| [x, to_axis(*v, log_axis)]).collect();
    Some(Points::new(PlotPoints::from(coords)).color(color).radius(1.5))
}

/// One box per segment of the selected dimension.
pub fn distribution_plot(ui: &mut Ui, state: &AppState) {
    let chart = &state.chart;
    if chart.distribution.iter().all(|s| s.stats.is_none()) {
        empty_hint(ui, "No towns match the current filters");
        return;
    }
    let colors = SegmentColors::new(chart.dimension);
    let labels: Vec<String> = chart.distribution.iter().map(|s| s.segment.to_string()).collect();
    let n = chart.distribution.len() as f64;

    Plot::new("distribution_plot")
        .legend(Legend::default())
        .x_axis_label(chart.dimension.display_name())
        .y_axis_label("Mean salary (€/h)")
        .x_axis_formatter(label_formatter(labels))
        .y_axis_formatter(salary_formatter(chart.log_axis))
        .show(ui, |plot_ui| {
            for (i, series) in chart.distribution.iter().enumerate() {
                let color = colors.color_for(&series.segment);
                let x = i as f64;
                if let Some(elem) = box_elem(x, series, color, 0.5, chart.log_axis) {
                    plot_ui.box_plot(BoxPlot::new(vec![elem]).name(series.segment.to_string()).color(color));
                }
                if let Some(points) = outlier_points(x, series, color, chart.log_axis) {
                    plot_ui.points(points);
                }
            }
            if let Some(bounds) = salary_bounds(chart.distribution_axis, chart.log_axis, (-0.5, n - 0.5)) {
                plot_ui.set_plot_bounds(bounds);
            }
        });
}

/// Gender × category boxes: categories along x, genders side by side.
pub fn inequality_plot(ui: &mut Ui, state: &AppState) {
    let chart = &state.chart;
    if chart.inequality.iter().all(|s| s.stats.is_none()) {
        empty_hint(ui, "No towns match the current filters");
        return;
    }
    let colors = SegmentColors::new(Dimension::GenderCategory);
    let labels: Vec<String> = Category::ALL.iter().map(|c| c.display_name().to_string()).collect();

    Plot::new("inequality_plot")
        .legend(Legend::default())
        .x_axis_label("Socio-professional category")
        .y_axis_label("Mean salary (€/h)")
        .x_axis_formatter(label_formatter(labels))
        .y_axis_formatter(salary_formatter(chart.log_axis))
        .show(ui, |plot_ui| {
            for series in &chart.inequality {
                let (Some(gender), Some(category)) = (series.segment.gender, series.segment.category) else {
                    continue;
                };
                let Some(cat_idx) = Category::ALL.iter().position(|c| *c == category) else {
                    continue;
                };
                let offset = match gender {
                    Gender::Male => -0.2,
                    Gender::Female => 0.2,
                };
                let x = cat_idx as f64 + offset;
                let color = colors.color_for(&series.segment);
                if let Some(elem) = box_elem(x, series, color, 0.3, chart.log_axis) {
                    plot_ui.box_plot(BoxPlot::new(vec![elem]).name(gender.display_name()).color(color));
                }
                if let Some(points) = outlier_points(x, series, color, chart.log_axis) {
                    plot_ui.points(points);
                }
            }
            let x_range = (-0.5, Category::ALL.len() as f64 - 0.5);
            if let Some(bounds) = salary_bounds(chart.inequality_axis, chart.log_axis, x_range) {
                plot_ui.set_plot_bounds(bounds);
            }
        });
}

// ---------------------------------------------------------------------------
// Violin plots
// ---------------------------------------------------------------------------

/// Mirrored density outlines per segment with the median marked.
pub fn violin_plot(ui: &mut Ui, state: &AppState) {
    let chart = &state.chart;
    if chart.distribution.iter().all(|s| s.density.is_empty()) {
        empty_hint(ui, "No towns match the current filters");
        return;
    }
    let colors = SegmentColors::new(chart.dimension);
    let labels: Vec<String> = chart.distribution.iter().map(|s| s.segment.to_string()).collect();
    let n = chart.distribution.len() as f64;
    const HALF_WIDTH: f64 = 0.4;

    Plot::new("violin_plot")
        .legend(Legend::default())
        .x_axis_label(chart.dimension.display_name())
        .y_axis_label("Mean salary (€/h)")
        .x_axis_formatter(label_formatter(labels))
        .y_axis_formatter(salary_formatter(chart.log_axis))
        .show(ui, |plot_ui| {
            for (i, series) in chart.distribution.iter().enumerate() {
                if series.density.is_empty() {
                    continue;
                }
                let x = i as f64;
                let color = colors.color_for(&series.segment);
                let right = series
                    .density
                    .iter()
                    .map(|[v, d]| [x + d * HALF_WIDTH, to_axis(*v, chart.log_axis)]);
                let left = series
                    .density
                    .iter()
                    .rev()
                    .map(|[v, d]| [x - d * HALF_WIDTH, to_axis(*v, chart.log_axis)]);
                let outline: Vec<[f64; 2]> = right.chain(left).collect();
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(outline))
                        .name(series.segment.to_string())
                        .fill_color(color.gamma_multiply(0.4))
                        .stroke(Stroke::new(1.5, color)),
                );
                if let Some(s) = &series.stats {
                    let y = to_axis(s.median, chart.log_axis);
                    plot_ui.line(
                        Line::new(PlotPoints::from(vec![[x - 0.15, y], [x + 0.15, y]]))
                            .color(Color32::WHITE)
                            .width(2.0),
                    );
                }
            }
            if let Some(bounds) = salary_bounds(chart.distribution_axis, chart.log_axis, (-0.5, n - 0.5)) {
                plot_ui.set_plot_bounds(bounds);
            }
        });
}

// ---------------------------------------------------------------------------
// Town comparison
// ---------------------------------------------------------------------------

/// Grouped bars: one group per segment (plus the mean), one bar per town.
pub fn comparison_plot(ui: &mut Ui, state: &AppState) {
    let chart = &state.chart;
    if chart.comparison.is_empty() {
        empty_hint(ui, "Pick up to three towns in the side panel to compare them");
        return;
    }

    let mut labels: Vec<String> = chart.comparison[0]
        .bars
        .iter()
        .map(|(segment, _)| segment.to_string())
        .collect();
    let mean_x = labels.len() as f64;
    labels.push("Mean".to_string());

    let towns = chart.comparison.len() as f64;
    let bar_width = 0.8 / towns;

    Plot::new("comparison_plot")
        .legend(Legend::default())
        .x_axis_label(chart.dimension.display_name())
        .y_axis_label("Mean salary (€/h)")
        .x_axis_formatter(label_formatter(labels))
        .show(ui, |plot_ui| {
            for (slot, group) in chart.comparison.iter().enumerate() {
                let town = format!("{} ({})", group.town, group.department);
                let offset = (slot as f64 - (towns - 1.0) / 2.0) * bar_width;
                let mut bars: Vec<Bar> = group
                    .bars
                    .iter()
                    .enumerate()
                    .filter_map(|(j, (segment, salary))| {
                        let value = (*salary)?;
                        Some(
                            Bar::new(j as f64 + offset, value)
                                .width(bar_width)
                                .name(format!("{town} – {segment}")),
                        )
                    })
                    .collect();
                if let Some(mean) = group.mean_salary {
                    bars.push(
                        Bar::new(mean_x + offset, mean)
                            .width(bar_width)
                            .name(format!("{town} – mean")),
                    );
                }
                plot_ui.bar_chart(BarChart::new(bars).name(&town).color(town_color(slot)));
            }
        });
}
