use serde::Serialize;

/// Multiplier applied to the interquartile range for the outlier fences.
pub const FENCE_FACTOR: f64 = 1.5;

/// Smallest lower fence allowed on a logarithmic axis.
pub const LOG_AXIS_FLOOR: f64 = 1.0;

/// Finite values only, sorted ascending.
pub fn sorted_finite(values: impl IntoIterator<Item = Option<f64>>) -> Vec<f64> {
    let mut out: Vec<f64> = values.into_iter().flatten().filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

/// Quantile of already sorted data, linear interpolation between the two
/// nearest order statistics.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// (Q1, Q3) of the present values.
pub fn quartiles(values: impl IntoIterator<Item = Option<f64>>) -> Option<(f64, f64)> {
    let sorted = sorted_finite(values);
    Some((quantile_sorted(&sorted, 0.25)?, quantile_sorted(&sorted, 0.75)?))
}

/// Axis display range that leaves extreme outliers out of view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fences {
    pub lower: f64,
    pub upper: f64,
}

/// `Q1 - 1.5 IQR` and `Q3 + 1.5 IQR`. On a log axis the lower fence is at
/// least [`LOG_AXIS_FLOOR`].
pub fn outlier_fences(values: impl IntoIterator<Item = Option<f64>>, log_axis: bool) -> Option<Fences> {
    let (q1, q3) = quartiles(values)?;
    Some(fences_from_quartiles(q1, q3, log_axis))
}

pub fn fences_from_quartiles(q1: f64, q3: f64, log_axis: bool) -> Fences {
    let iqr = q3 - q1;
    let mut lower = q1 - FENCE_FACTOR * iqr;
    if log_axis {
        lower = lower.max(LOG_AXIS_FLOOR);
    }
    Fences {
        lower,
        upper: q3 + FENCE_FACTOR * iqr,
    }
}

// ---------------------------------------------------------------------------
// Box and violin summaries
// ---------------------------------------------------------------------------

/// Tukey box: whiskers reach the most extreme values inside the fences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub mean: f64,
    pub count: usize,
    /// Values outside the fences, ascending.
    pub outliers: Vec<f64>,
}

pub fn box_stats(values: impl IntoIterator<Item = Option<f64>>) -> Option<BoxStats> {
    let sorted = sorted_finite(values);
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let median = quantile_sorted(&sorted, 0.5)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let fences = fences_from_quartiles(q1, q3, false);

    let inside = || sorted.iter().copied().filter(|v| *v >= fences.lower && *v <= fences.upper);
    let lower_whisker = inside().next().unwrap_or(q1);
    let upper_whisker = inside().last().unwrap_or(q3);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < fences.lower || *v > fences.upper)
        .collect();

    Some(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
        count: sorted.len(),
        outliers,
    })
}

/// Number of points a violin outline is evaluated on.
pub const DENSITY_POINTS: usize = 64;

/// Gaussian kernel density over the data range, Silverman bandwidth.
/// Densities are scaled so the peak is 1. Returns `[value, density]` pairs.
pub fn kernel_density(values: impl IntoIterator<Item = Option<f64>>) -> Vec<[f64; 2]> {
    let sorted = sorted_finite(values);
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    if min == max {
        return vec![[min, 1.0]];
    }

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let sd = (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    let iqr = match (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75)) {
        (Some(q1), Some(q3)) => q3 - q1,
        _ => 0.0,
    };
    let spread = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
    let bandwidth = 0.9 * spread * n.powf(-0.2);
    let bandwidth = if bandwidth > 0.0 { bandwidth } else { (max - min) / 10.0 };

    let step = (max - min) / (DENSITY_POINTS - 1) as f64;
    let mut curve: Vec<[f64; 2]> = (0..DENSITY_POINTS)
        .map(|i| {
            let x = min + step * i as f64;
            let d: f64 = sorted
                .iter()
                .map(|v| {
                    let z = (x - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum();
            [x, d]
        })
        .collect();

    let peak = curve.iter().map(|p| p[1]).fold(0.0, f64::max);
    if peak > 0.0 {
        for p in &mut curve {
            p[1] /= peak;
        }
    }
    curve
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        let (q1, q3) = quartiles(some(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0])).unwrap();
        assert!((q1 - 2.25).abs() < EPS);
        assert!((q3 - 4.75).abs() < EPS);
    }

    #[test]
    fn fences_exclude_the_outlier() {
        let f = outlier_fences(some(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]), false).unwrap();
        assert!((f.lower - -1.5).abs() < EPS);
        assert!((f.upper - 8.5).abs() < EPS);
    }

    #[test]
    fn log_axis_clamps_lower_fence() {
        let f = outlier_fences(some(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]), true).unwrap();
        assert_eq!(f.lower, LOG_AXIS_FLOOR);
        assert!((f.upper - 8.5).abs() < EPS);

        // A positive lower fence is left alone.
        let f = outlier_fences(some(&[100.0, 101.0, 102.0, 103.0]), true).unwrap();
        assert!(f.lower > LOG_AXIS_FLOOR);
    }

    #[test]
    fn input_order_and_missing_values_do_not_matter() {
        let mut values = some(&[100.0, 3.0, 5.0, 1.0, 4.0, 2.0]);
        values.push(None);
        values.push(Some(f64::NAN));
        assert_eq!(quartiles(values), Some((2.25, 4.75)));
    }

    #[test]
    fn empty_input_has_no_fences() {
        assert_eq!(outlier_fences(Vec::new(), false), None);
        assert_eq!(outlier_fences(vec![None, None], true), None);
    }

    #[test]
    fn single_value_collapses_fences() {
        let f = outlier_fences(some(&[7.0]), false).unwrap();
        assert_eq!(f, Fences { lower: 7.0, upper: 7.0 });
    }

    #[test]
    fn box_stats_put_extremes_outside_whiskers() {
        let b = box_stats(some(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0])).unwrap();
        assert_eq!(b.count, 6);
        assert!((b.median - 3.5).abs() < EPS);
        assert_eq!(b.lower_whisker, 1.0);
        assert_eq!(b.upper_whisker, 5.0);
        assert_eq!(b.outliers, vec![100.0]);
        assert!((b.mean - 115.0 / 6.0).abs() < EPS);
    }

    #[test]
    fn box_stats_skip_missing() {
        assert_eq!(box_stats(vec![None]), None);
        let b = box_stats(vec![Some(2.0), None, Some(4.0)]).unwrap();
        assert_eq!(b.count, 2);
        assert!(b.outliers.is_empty());
    }

    #[test]
    fn density_peaks_at_one_within_data_range() {
        let curve = kernel_density(some(&[10.0, 11.0, 11.5, 12.0, 20.0]));
        assert_eq!(curve.len(), DENSITY_POINTS);
        assert_eq!(curve[0][0], 10.0);
        assert!((curve[DENSITY_POINTS - 1][0] - 20.0).abs() < EPS);
        let peak = curve.iter().map(|p| p[1]).fold(0.0, f64::max);
        assert!((peak - 1.0).abs() < EPS);
        assert!(curve.iter().all(|p| p[1] > 0.0));
    }

    #[test]
    fn density_of_constant_data_is_a_point() {
        assert_eq!(kernel_density(some(&[3.0, 3.0])), vec![[3.0, 1.0]]);
        assert!(kernel_density(Vec::new()).is_empty());
    }
}
