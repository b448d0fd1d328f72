//! Descriptive statistics over a slab of records.
//!
//! Every read computes a [`Range`] alongside its records: the moments,
//! order statistics, and deviations of the valid (non-NaN) values. The
//! quantiles interpolate linearly between order statistics, matching the
//! usual scientific-library definition.

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::request::ReadRequest;

/// Statistics for one read's time range.
///
/// `num_recs` counts the valid values that entered the computation, not
/// the slab length; tombstoned and gated records are excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    /// Window start copied from the request
    pub start_time: i64,
    /// Window end copied from the request
    pub end_time: i64,
    /// Number of valid (non-NaN) values
    pub num_recs: u64,
    /// Median (50th percentile)
    pub median: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Sum of values
    pub sum: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Median absolute deviation from the median
    pub mad: f64,
    /// Sample standard deviation (n - 1 divisor)
    pub stddev: f64,
    /// Mean absolute deviation from the mean
    pub absdev: f64,
    /// Sample variance
    pub variance: f64,
    /// Skewness
    pub skew: f64,
    /// Excess kurtosis
    pub kurtosis: f64,
    /// 95th percentile
    pub pct95: f64,
    /// 75th percentile
    pub pct75: f64,
    /// 50th percentile
    pub pct50: f64,
    /// 25th percentile
    pub pct25: f64,
}

/// Selector for [`get_statistic`]. The discriminants are stable for
/// language bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    /// Median value
    Median,
    /// Arithmetic mean
    Mean,
    /// Sum of values
    Sum,
    /// Smallest value
    Min,
    /// Largest value
    Max,
    /// Median absolute deviation
    Mad,
    /// Sample standard deviation
    Stddev,
    /// Mean absolute deviation
    Absdev,
    /// 95th percentile
    Pct95,
    /// 75th percentile
    Pct75,
    /// 50th percentile
    Pct50,
    /// 25th percentile
    Pct25,
}

/// Fetch one statistic out of a computed range.
pub fn get_statistic(range: &Range, kind: Statistic) -> f64 {
    match kind {
        Statistic::Median => range.median,
        Statistic::Mean => range.mean,
        Statistic::Sum => range.sum,
        Statistic::Min => range.min,
        Statistic::Max => range.max,
        Statistic::Mad => range.mad,
        Statistic::Stddev => range.stddev,
        Statistic::Absdev => range.absdev,
        Statistic::Pct95 => range.pct95,
        Statistic::Pct75 => range.pct75,
        Statistic::Pct50 => range.pct50,
        Statistic::Pct25 => range.pct25,
    }
}

/// Compute the range statistics for a finished slab.
pub(crate) fn compute(records: &[Record], request: &ReadRequest) -> Range {
    let mut values: Vec<f64> = records
        .iter()
        .map(|r| r.value)
        .filter(|v| !v.is_nan())
        .collect();

    let mut range = Range {
        start_time: request.start,
        end_time: request.end,
        num_recs: values.len() as u64,
        ..Range::default()
    };

    if values.is_empty() {
        range.median = f64::NAN;
        range.mean = f64::NAN;
        range.min = f64::NAN;
        range.max = f64::NAN;
        range.mad = f64::NAN;
        range.stddev = f64::NAN;
        range.absdev = f64::NAN;
        range.variance = f64::NAN;
        range.skew = f64::NAN;
        range.kurtosis = f64::NAN;
        range.pct95 = f64::NAN;
        range.pct75 = f64::NAN;
        range.pct50 = f64::NAN;
        range.pct25 = f64::NAN;
        return range;
    }

    let n = values.len() as f64;

    range.sum = values.iter().sum();
    range.mean = range.sum / n;
    range.min = values.iter().copied().fold(f64::INFINITY, f64::min);
    range.max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    range.variance = if values.len() > 1 {
        values.iter().map(|v| (v - range.mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    range.stddev = range.variance.sqrt();
    range.absdev = values.iter().map(|v| (v - range.mean).abs()).sum::<f64>() / n;

    if range.stddev > 0.0 {
        range.skew = values
            .iter()
            .map(|v| ((v - range.mean) / range.stddev).powi(3))
            .sum::<f64>()
            / n;
        range.kurtosis = values
            .iter()
            .map(|v| ((v - range.mean) / range.stddev).powi(4))
            .sum::<f64>()
            / n
            - 3.0;
    }

    values.sort_by(f64::total_cmp);
    range.pct25 = quantile_sorted(&values, 0.25);
    range.pct50 = quantile_sorted(&values, 0.50);
    range.pct75 = quantile_sorted(&values, 0.75);
    range.pct95 = quantile_sorted(&values, 0.95);
    range.median = range.pct50;

    // MAD last: this rewrite destroys the sorted ordering, so every
    // quantile above must already be in hand.
    for value in values.iter_mut() {
        *value = (*value - range.median).abs();
    }
    values.sort_by(f64::total_cmp);
    range.mad = quantile_sorted(&values, 0.50);

    range
}

/// Quantile of pre-sorted data by linear interpolation between the two
/// nearest order statistics.
fn quantile_sorted(sorted: &[f64], fraction: f64) -> f64 {
    let index = (sorted.len() - 1) as f64 * fraction;
    let lower = index.floor() as usize;
    let delta = index - lower as f64;
    if lower + 1 < sorted.len() {
        (1.0 - delta) * sorted[lower] + delta * sorted[lower + 1]
    } else {
        sorted[lower]
    }
}
