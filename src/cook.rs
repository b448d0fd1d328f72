//! Cooking: the raw-to-presentable record transformations.
//!
//! Applied in a fixed order when a request asks for cooked data:
//! counter differencing, unit rate scaling, min/max gating, then step
//! averaging. Count trimming runs last, for cooked and raw reads alike.

use crate::header::{DataType, Header};
use crate::record::Record;
use crate::request::ReadRequest;

/// Seconds per supported rate-unit frequency.
fn frequency_seconds(freq: &str) -> Option<i64> {
    match freq {
        "sec" | "second" => Some(1),
        "min" => Some(60),
        "hour" => Some(3600),
        "day" => Some(86_400),
        "week" => Some(604_800),
        "month" => Some(2_592_000),
        "quarter" => Some(7_776_000),
        "year" => Some(31_536_000),
        _ => None,
    }
}

/// Parse a unit string into its rate scale factor in seconds.
///
/// Recognized forms, case-insensitive: `per <freq>`, `per <N> <freq>`, and
/// `<x> per <freq>`. Anything else (including "absolute") is not a rate.
pub(crate) fn rate_factor(units: &str) -> Option<i64> {
    let lower = units.to_ascii_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();

    let (multiplier, freq) = match tokens.as_slice() {
        ["per", freq] => (1, *freq),
        ["per", n, freq] => (n.parse::<i64>().ok()?, *freq),
        [_, "per", freq] => (1, *freq),
        _ => return None,
    };

    let factor = multiplier * frequency_seconds(freq)?;
    if factor == 0 {
        return None;
    }
    Some(factor)
}

/// Run the cooking pipeline over a raw slab.
pub(crate) fn cook(header: &Header, mut records: Vec<Record>, request: &ReadRequest) -> Vec<Record> {
    let factor = rate_factor(&header.units);

    // Counter differencing: each value becomes its delta from the raw
    // predecessor. A descending counter (wrap) or a missing neighbor
    // yields NaN.
    if header.kind == DataType::Counter && !records.is_empty() {
        let mut prev_raw = records[0].value;
        for record in records.iter_mut().skip(1) {
            let raw = record.value;
            let delta = raw - prev_raw;
            record.value = if raw.is_finite() && prev_raw.is_finite() && delta >= 0.0 {
                delta
            } else {
                f64::NAN
            };
            prev_raw = raw;
        }
    }

    // Rate scaling: divide by the sample spacing, scale to the unit
    // frequency. Record 0 only exists to anchor record 1 and is dropped.
    if let Some(factor) = factor {
        for i in 1..records.len() {
            let dt = records[i].time - records[i - 1].time;
            if dt > 0 {
                records[i].value = factor as f64 * records[i].value / dt as f64;
            }
        }
        if !records.is_empty() {
            records.remove(0);
        }
    }

    // Min/max gating: finite values outside the configured band become
    // NaN. Both bounds zero means gating is off.
    if header.gating_enabled() {
        for record in records.iter_mut() {
            if record.value.is_finite()
                && (record.value < header.min_value || record.value > header.max_value)
            {
                record.value = f64::NAN;
            }
        }
    }

    if request.step > 1 {
        records = step_average(&records, request.step as usize);
    }

    records
}

/// Condense every `step` consecutive records into one, averaging times and
/// values. NaN values count as zero; a trailing partial window averages
/// over its own length.
fn step_average(records: &[Record], step: usize) -> Vec<Record> {
    records
        .chunks(step)
        .map(|window| {
            let len = window.len() as i64;
            let time_sum: i64 = window.iter().map(|r| r.time).sum();
            let value_sum: f64 = window
                .iter()
                .map(|r| if r.value.is_nan() { 0.0 } else { r.value })
                .sum();
            Record::new(time_sum / len, value_sum / len as f64)
        })
        .collect()
}

/// Apply the request's count to a finished slab: positive counts keep the
/// last `count` records, negative the first `|count|`. Slabs shorter than
/// the count pass through whole.
pub(crate) fn trim_count(records: Vec<Record>, count: i64) -> Vec<Record> {
    if count == 0 {
        return records;
    }
    let n = count.unsigned_abs() as usize;
    if records.len() < n {
        return records;
    }
    if count > 0 {
        records[records.len() - n..].to_vec()
    } else {
        records[..n].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::DataType;

    const T0: i64 = 1190860353;

    fn header(kind: DataType, units: &str, min: f64, max: f64) -> Header {
        Header::generate("cook", "", 100, kind, units, min, max, 1)
    }

    fn request() -> ReadRequest {
        ReadRequest::default()
    }

    #[test]
    fn test_rate_factor_forms() {
        assert_eq!(rate_factor("per sec"), Some(1));
        assert_eq!(rate_factor("per second"), Some(1));
        assert_eq!(rate_factor("Per Min"), Some(60));
        assert_eq!(rate_factor("per 5 min"), Some(300));
        assert_eq!(rate_factor("requests per sec"), Some(1));
        assert_eq!(rate_factor("bytes per hour"), Some(3600));
        assert_eq!(rate_factor("per day"), Some(86_400));
        assert_eq!(rate_factor("per week"), Some(604_800));
        assert_eq!(rate_factor("per month"), Some(2_592_000));
        assert_eq!(rate_factor("per quarter"), Some(7_776_000));
        assert_eq!(rate_factor("per year"), Some(31_536_000));
    }

    #[test]
    fn test_rate_factor_rejects_non_rates() {
        assert_eq!(rate_factor("absolute"), None);
        assert_eq!(rate_factor("percent"), None);
        assert_eq!(rate_factor(""), None);
        assert_eq!(rate_factor("per fortnight"), None);
        assert_eq!(rate_factor("per 0 sec"), None);
        assert_eq!(rate_factor("one two per sec"), None);
    }

    #[test]
    fn test_gauge_without_units_is_identity() {
        let header = header(DataType::Gauge, "absolute", 0.0, 0.0);
        let records = vec![Record::new(T0, 1.0), Record::new(T0 + 1, 2.0)];
        let cooked = cook(&header, records.clone(), &request());
        assert_eq!(cooked, records);
    }

    #[test]
    fn test_counter_differencing() {
        let header = header(DataType::Counter, "absolute", 0.0, 0.0);
        let records = vec![
            Record::new(T0, 100.0),
            Record::new(T0 + 1, 110.0),
            Record::new(T0 + 2, 125.0),
        ];
        let cooked = cook(&header, records, &request());
        // No rate units, so record 0 survives with its raw value.
        assert_eq!(cooked.len(), 3);
        assert_eq!(cooked[0].value, 100.0);
        assert_eq!(cooked[1].value, 10.0);
        assert_eq!(cooked[2].value, 15.0);
    }

    #[test]
    fn test_counter_wrap_becomes_nan() {
        let header = header(DataType::Counter, "requests per sec", 0.0, 0.0);
        let records = vec![
            Record::new(T0, 2f64.powi(32)),
            Record::new(T0 + 6, 10.0),
            Record::new(T0 + 7, 12.0),
        ];
        let cooked = cook(&header, records, &request());
        assert_eq!(cooked.len(), 2);
        assert!(cooked[0].value.is_nan());
        assert_eq!(cooked[1].value, 2.0);
    }

    #[test]
    fn test_rate_scaling_divides_by_spacing() {
        let header = header(DataType::Counter, "per min", 0.0, 0.0);
        let records = vec![
            Record::new(T0, 0.0),
            Record::new(T0 + 30, 60.0),
            Record::new(T0 + 90, 30.0),
        ];
        let cooked = cook(&header, records, &request());
        assert_eq!(cooked.len(), 2);
        // 60 in 30s => 120/min; then a drop of 30 over 60s => wrap? no:
        // 30 - 60 < 0 => NaN.
        assert_eq!(cooked[0].value, 120.0);
        assert!(cooked[1].value.is_nan());
    }

    #[test]
    fn test_rate_scaling_applies_to_gauges_too() {
        let header = header(DataType::Gauge, "per sec", 0.0, 0.0);
        let records = vec![Record::new(T0, 4.0), Record::new(T0 + 2, 4.0)];
        let cooked = cook(&header, records, &request());
        assert_eq!(cooked.len(), 1);
        assert_eq!(cooked[0].value, 2.0);
    }

    #[test]
    fn test_gating() {
        let header = header(DataType::Gauge, "absolute", 1.0, 10.0);
        let records = vec![
            Record::new(T0, 0.5),
            Record::new(T0 + 1, 5.0),
            Record::new(T0 + 2, 50.0),
            Record::new(T0 + 3, f64::NAN),
        ];
        let cooked = cook(&header, records, &request());
        assert!(cooked[0].value.is_nan());
        assert_eq!(cooked[1].value, 5.0);
        assert!(cooked[2].value.is_nan());
        assert!(cooked[3].value.is_nan());
    }

    #[test]
    fn test_step_average() {
        let records: Vec<Record> = (0..20).map(|i| Record::new(T0 + i, i as f64)).collect();
        let header = header(DataType::Gauge, "absolute", 0.0, 0.0);
        let request = ReadRequest {
            step: 5,
            ..ReadRequest::default()
        };
        let cooked = cook(&header, records, &request);
        assert_eq!(cooked.len(), 4);
        assert_eq!(cooked[0], Record::new(T0 + 2, 2.0));
        assert_eq!(cooked[1], Record::new(T0 + 7, 7.0));
        assert_eq!(cooked[2], Record::new(T0 + 12, 12.0));
        assert_eq!(cooked[3], Record::new(T0 + 17, 17.0));
    }

    #[test]
    fn test_step_average_partial_window() {
        let records: Vec<Record> = (0..7).map(|i| Record::new(T0 + i, 1.0)).collect();
        let averaged = step_average(&records, 5);
        assert_eq!(averaged.len(), 2);
        // Trailing window of two records averages over two.
        assert_eq!(averaged[1].value, 1.0);
        assert_eq!(averaged[1].time, T0 + 5); // (T0+5 + T0+6) / 2
    }

    #[test]
    fn test_step_average_nan_counts_as_zero() {
        let records = vec![
            Record::new(T0, 4.0),
            Record::new(T0 + 1, f64::NAN),
            Record::new(T0 + 2, 2.0),
        ];
        let averaged = step_average(&records, 3);
        assert_eq!(averaged.len(), 1);
        assert_eq!(averaged[0].value, 2.0);
    }

    #[test]
    fn test_trim_count() {
        let records: Vec<Record> = (0..10).map(|i| Record::new(T0 + i, i as f64)).collect();

        let last = trim_count(records.clone(), 4);
        assert_eq!(last.first().map(|r| r.value), Some(6.0));
        assert_eq!(last.len(), 4);

        let first = trim_count(records.clone(), -4);
        assert_eq!(first.last().map(|r| r.value), Some(3.0));
        assert_eq!(first.len(), 4);

        assert_eq!(trim_count(records.clone(), 0).len(), 10);
        // Short slabs pass through untouched.
        assert_eq!(trim_count(records, 25).len(), 10);
    }
}
