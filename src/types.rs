//! Data structures for the price pipeline
//!
//! `RawRecord` is what the report fetcher produces; `CanonicalSample` and
//! `CanonicalSeries` are what the normalizer, resampler and statistics engine
//! exchange.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

/// One report row keyed by field name
///
/// Values are kept as raw JSON (ERCOT mixes strings and numbers depending on
/// the report). Shape varies by report type.
pub type RawRecord = BTreeMap<String, Value>;

/// Field name used for the timestamp column of canonical output
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Timestamp format used when a canonical series is turned back into records
/// or exported to CSV
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One normalized price observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalSample {
    /// Start of the interval in market-local wall-clock time
    ///
    /// Hour-ending labels are already shifted: HE 01:00 → 00:00, HE 24:00 → 23:00.
    pub timestamp: NaiveDateTime,

    /// Price in $/MWh (always finite)
    pub price: f64,

    /// Bus or settlement point name, when the report carries one
    pub location: Option<String>,
}

/// Ordered, de-duplicated price series
///
/// Samples are sorted non-decreasing by timestamp and no two samples share a
/// timestamp. The series remembers which input columns it came from so it can
/// be exported (and re-normalized) under the same names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalSeries {
    /// Name of the price column in the source report (e.g. "LMP")
    pub price_field: String,

    /// Name of the location column kept from the source, if any
    pub location_field: Option<String>,

    /// Samples in ascending timestamp order
    pub samples: Vec<CanonicalSample>,
}

/// A `CanonicalSeries` with exactly one sample per observed hour
pub type HourlySeries = CanonicalSeries;

impl CanonicalSeries {
    /// Create an empty series for a price column
    pub fn empty(price_field: &str) -> Self {
        Self {
            price_field: price_field.to_string(),
            location_field: None,
            samples: Vec::new(),
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the series has no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate over prices in timestamp order
    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.price)
    }

    /// First and last timestamp, if any
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }

    /// Convert back into raw records with a full-timestamp column
    ///
    /// The output uses the `timestamp` field, the original price field name and
    /// the original location field name, so feeding it to
    /// [`crate::normalizer::normalize`] yields the same series.
    pub fn to_records(&self) -> Vec<RawRecord> {
        self.samples
            .iter()
            .map(|sample| {
                let mut record = RawRecord::new();
                record.insert(
                    TIMESTAMP_FIELD.to_string(),
                    Value::String(sample.timestamp.format(TIMESTAMP_FORMAT).to_string()),
                );
                record.insert(self.price_field.clone(), Value::from(sample.price));
                if let (Some(field), Some(location)) = (&self.location_field, &sample.location) {
                    record.insert(field.clone(), Value::String(location.clone()));
                }
                record
            })
            .collect()
    }
}
