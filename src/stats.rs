//! Summary statistics for a price series
//!
//! Computes count, mean, median, extremes, an equal-width histogram and an
//! hour-of-day table, optionally restricted to solar hours. An empty selection
//! is reported as [`SummaryOutcome::EmptySummary`] rather than an error.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::Serialize;

use crate::types::CanonicalSeries;

/// Histogram bins used when the caller has no preference
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// Upper bound on requested histogram bins
pub const MAX_HISTOGRAM_BINS: usize = 1000;

/// First and last clock hour counted as solar (06:00 through 17:59)
pub const SOLAR_FIRST_HOUR: u32 = 6;
pub const SOLAR_LAST_HOUR: u32 = 17;

/// Which samples enter the statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HourFilter {
    #[default]
    AllHours,
    /// Clock hours 6 to 17 inclusive (hour-ending 7 to 18)
    SolarHours,
}

impl HourFilter {
    pub fn accepts(self, hour: u32) -> bool {
        match self {
            HourFilter::AllHours => true,
            HourFilter::SolarHours => (SOLAR_FIRST_HOUR..=SOLAR_LAST_HOUR).contains(&hour),
        }
    }
}

/// One histogram bin, `[lower, upper)` except the last which includes `upper`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Mean price for one clock hour of the day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyAverage {
    pub hour: u32,
    pub mean: f64,
    pub count: usize,
}

/// Statistics for a non-empty selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub filter: HourFilter,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
    pub histogram: Vec<HistogramBin>,
    pub hourly: Vec<HourlyAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SummaryOutcome {
    Summary(Summary),
    /// The filter left no samples
    EmptySummary { filter: HourFilter },
}

impl SummaryOutcome {
    pub fn summary(&self) -> Option<&Summary> {
        match self {
            SummaryOutcome::Summary(summary) => Some(summary),
            SummaryOutcome::EmptySummary { .. } => None,
        }
    }
}

/// Summarize a series
///
/// # Arguments
///
/// * `series` - Canonical or hourly series
/// * `hour_filter` - Restrict to solar hours or keep everything
/// * `histogram_bins` - Number of equal-width bins; `0` is treated as `1`,
///   requests above [`MAX_HISTOGRAM_BINS`] are capped
///
/// # Examples
///
/// ```
/// use ercot_prices::stats::{summarize, HourFilter, SummaryOutcome, DEFAULT_HISTOGRAM_BINS};
/// use ercot_prices::types::CanonicalSeries;
///
/// let empty = CanonicalSeries::empty("LMP");
/// assert!(matches!(
///     summarize(&empty, HourFilter::AllHours, DEFAULT_HISTOGRAM_BINS),
///     SummaryOutcome::EmptySummary { .. }
/// ));
/// ```
pub fn summarize(series: &CanonicalSeries, hour_filter: HourFilter, histogram_bins: usize) -> SummaryOutcome {
    let selected: Vec<(u32, f64)> = series
        .samples
        .iter()
        .map(|s| (s.timestamp.hour(), s.price))
        .filter(|(hour, _)| hour_filter.accepts(*hour))
        .collect();

    if selected.is_empty() {
        return SummaryOutcome::EmptySummary { filter: hour_filter };
    }

    let mut sorted: Vec<f64> = selected.iter().map(|(_, p)| *p).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    };
    let min = sorted[0];
    let max = sorted[count - 1];

    SummaryOutcome::Summary(Summary {
        filter: hour_filter,
        count,
        mean,
        median,
        max,
        min,
        histogram: histogram(&sorted, min, max, histogram_bins),
        hourly: hour_of_day(&selected),
    })
}

fn histogram(prices: &[f64], min: f64, max: f64, bins: usize) -> Vec<HistogramBin> {
    // A non-finite span (prices near f64::MAX of opposite sign) has no usable width
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: prices.len(),
        }];
    }

    let bins = bins.clamp(1, MAX_HISTOGRAM_BINS);
    let width = span / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for price in prices {
        let index = (((price - min) / width) as usize).min(bins - 1);
        out[index].count += 1;
    }
    out
}

fn hour_of_day(selected: &[(u32, f64)]) -> Vec<HourlyAverage> {
    let mut by_hour: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for (hour, price) in selected {
        let entry = by_hour.entry(*hour).or_insert((0.0, 0));
        entry.0 += price;
        entry.1 += 1;
    }

    by_hour
        .into_iter()
        .map(|(hour, (sum, count))| HourlyAverage {
            hour,
            mean: sum / count as f64,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CanonicalSample;
    use chrono::NaiveDate;

    fn hourly_series(prices: &[f64]) -> CanonicalSeries {
        let day = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        CanonicalSeries {
            price_field: "LMP".to_string(),
            location_field: None,
            samples: prices
                .iter()
                .enumerate()
                .map(|(i, p)| CanonicalSample {
                    timestamp: day.and_hms_opt(i as u32 % 24, 0, 0).unwrap()
                        + chrono::Duration::days(i as i64 / 24),
                    price: *p,
                    location: None,
                })
                .collect(),
        }
    }

    fn unwrap_summary(outcome: SummaryOutcome) -> Summary {
        match outcome {
            SummaryOutcome::Summary(summary) => summary,
            other => panic!("expected summary, got {:?}", other),
        }
    }

    #[test]
    fn test_basic_statistics() {
        let summary = unwrap_summary(summarize(
            &hourly_series(&[5.0, 1.0, 9.0, 3.0]),
            HourFilter::AllHours,
            DEFAULT_HISTOGRAM_BINS,
        ));
        assert_eq!(summary.count, 4);
        assert!((summary.mean - 4.5).abs() < 1e-9);
        assert!((summary.median - 4.0).abs() < 1e-9);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 9.0);
    }

    #[test]
    fn test_median_odd_count() {
        let summary = unwrap_summary(summarize(&hourly_series(&[7.0, -2.0, 3.0]), HourFilter::AllHours, 5));
        assert_eq!(summary.median, 3.0);
    }

    #[test]
    fn test_solar_filter_keeps_twelve_of_twenty_four() {
        let prices: Vec<f64> = (0..24).map(f64::from).collect();
        let summary = unwrap_summary(summarize(&hourly_series(&prices), HourFilter::SolarHours, 4));

        assert_eq!(summary.count, 12);
        assert_eq!(summary.min, 6.0);
        assert_eq!(summary.max, 17.0);
        assert_eq!(summary.hourly.first().map(|h| h.hour), Some(6));
        assert_eq!(summary.hourly.last().map(|h| h.hour), Some(17));
        assert_eq!(summary.filter, HourFilter::SolarHours);
    }

    #[test]
    fn test_empty_selection() {
        assert_eq!(
            summarize(&CanonicalSeries::empty("LMP"), HourFilter::AllHours, 20),
            SummaryOutcome::EmptySummary { filter: HourFilter::AllHours }
        );

        // Night-only samples under the solar filter
        let night = hourly_series(&[1.0, 2.0, 3.0]);
        assert!(summarize(&night, HourFilter::SolarHours, 20).summary().is_none());
    }

    #[test]
    fn test_histogram_counts_every_sample() {
        let prices: Vec<f64> = (0..24).map(|i| f64::from(i) * 2.5 - 10.0).collect();
        let summary = unwrap_summary(summarize(&hourly_series(&prices), HourFilter::AllHours, 20));

        assert_eq!(summary.histogram.len(), 20);
        assert_eq!(summary.histogram.iter().map(|b| b.count).sum::<usize>(), 24);
        assert_eq!(summary.histogram[0].lower, -10.0);
        assert_eq!(summary.histogram[19].upper, 47.5);
        assert_eq!(summary.histogram[19].count, 2);
    }

    #[test]
    fn test_histogram_zero_bins_and_constant_series() {
        let summary = unwrap_summary(summarize(&hourly_series(&[1.0, 2.0]), HourFilter::AllHours, 0));
        assert_eq!(summary.histogram.len(), 1);
        assert_eq!(summary.histogram[0].count, 2);

        let summary = unwrap_summary(summarize(&hourly_series(&[4.0, 4.0, 4.0]), HourFilter::AllHours, 20));
        assert_eq!(
            summary.histogram,
            vec![HistogramBin { lower: 4.0, upper: 4.0, count: 3 }]
        );
    }

    #[test]
    fn test_histogram_bin_request_is_capped() {
        let prices: Vec<f64> = (0..24).map(f64::from).collect();
        let summary = unwrap_summary(summarize(&hourly_series(&prices), HourFilter::AllHours, usize::MAX));

        assert_eq!(summary.histogram.len(), MAX_HISTOGRAM_BINS);
        assert_eq!(summary.histogram.iter().map(|b| b.count).sum::<usize>(), 24);
        assert_eq!(summary.histogram.last().map(|b| b.upper), Some(23.0));
    }

    #[test]
    fn test_histogram_overflowing_span_falls_back_to_one_bin() {
        let summary = unwrap_summary(summarize(&hourly_series(&[-1e308, 0.0, 1e308]), HourFilter::AllHours, 20));

        assert_eq!(
            summary.histogram,
            vec![HistogramBin { lower: -1e308, upper: 1e308, count: 3 }]
        );
    }

    #[test]
    fn test_hour_of_day_table_over_two_days() {
        let prices: Vec<f64> = (0..48).map(|i| if i < 24 { 10.0 } else { 30.0 }).collect();
        let summary = unwrap_summary(summarize(&hourly_series(&prices), HourFilter::AllHours, 20));

        assert_eq!(summary.hourly.len(), 24);
        assert!(summary.hourly.iter().all(|h| h.count == 2 && (h.mean - 20.0).abs() < 1e-9));
    }

    #[test]
    fn test_summary_serializes() {
        let outcome = summarize(&hourly_series(&[1.0]), HourFilter::AllHours, 1);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "summary");
        assert_eq!(json["count"], 1);
    }
}
