//! Hourly resampling of sub-hourly series
//!
//! Samples are grouped by the hour their timestamp falls in and each observed
//! hour becomes one sample holding the arithmetic mean. Hours with no samples
//! are skipped, never filled.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Timelike};

use crate::types::{CanonicalSample, CanonicalSeries, HourlySeries};

/// One hour of a resampled series
#[derive(Debug, Clone, PartialEq)]
pub struct HourBucket {
    /// Start of the hour
    pub hour: NaiveDateTime,
    pub mean: f64,
    pub count: usize,
    /// Location of the first sample in the hour
    pub location: Option<String>,
}

fn hour_floor(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(ts)
}

/// Group a series into hour buckets, ascending by hour
///
/// `bucket.mean * bucket.count as f64` equals the sum of the prices in the
/// bucket (up to floating-point rounding).
pub fn hourly_buckets(series: &CanonicalSeries) -> Vec<HourBucket> {
    let mut groups: BTreeMap<NaiveDateTime, (f64, usize, Option<String>)> = BTreeMap::new();

    for sample in &series.samples {
        let entry = groups
            .entry(hour_floor(sample.timestamp))
            .or_insert_with(|| (0.0, 0, sample.location.clone()));
        entry.0 += sample.price;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(hour, (sum, count, location))| HourBucket {
            hour,
            mean: sum / count as f64,
            count,
            location,
        })
        .collect()
}

/// Resample a series to one sample per observed hour
///
/// ```
/// use ercot_prices::resample::resample_hourly;
/// use ercot_prices::types::{CanonicalSample, CanonicalSeries};
/// use chrono::NaiveDate;
///
/// let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let samples = [10.0, 20.0, 30.0, 40.0]
///     .iter()
///     .enumerate()
///     .map(|(i, price)| CanonicalSample {
///         timestamp: day.and_hms_opt(0, 15 * i as u32, 0).unwrap(),
///         price: *price,
///         location: None,
///     })
///     .collect();
/// let series = CanonicalSeries { price_field: "LMP".into(), location_field: None, samples };
///
/// let hourly = resample_hourly(&series);
/// assert_eq!(hourly.len(), 1);
/// assert_eq!(hourly.samples[0].price, 25.0);
/// ```
pub fn resample_hourly(series: &CanonicalSeries) -> HourlySeries {
    let samples = hourly_buckets(series)
        .into_iter()
        .map(|bucket| CanonicalSample {
            timestamp: bucket.hour,
            price: bucket.mean,
            location: bucket.location,
        })
        .collect();

    CanonicalSeries {
        price_field: series.price_field.clone(),
        location_field: series.location_field.clone(),
        samples,
    }
}
