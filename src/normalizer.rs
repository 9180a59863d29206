//! Schema normalizer
//!
//! Turns the raw rows of any of the four price reports into one
//! [`CanonicalSeries`]. The report layout is recognized once per record set,
//! from the union of field names, and then every row goes through the same
//! branch:
//!
//! 1. a full timestamp column (`timestamp` or `SCEDTimestamp`) is parsed as is
//! 2. otherwise `deliveryDate` + `hourEnding` (`"HH:MM"`) is shifted back one hour
//! 3. otherwise `deliveryDate` + `deliveryHour` (integer) is shifted the same way,
//!    plus `(deliveryInterval - 1) × 15` minutes when the interval column exists
//! 4. anything else is an [`NormalizationError::UnrecognizedSchema`]
//!
//! Rows whose timestamp or price can't be parsed are dropped and counted.
//! Survivors are stable-sorted by timestamp and duplicate timestamps collapse
//! to the first row seen.
//!
//! # DST fall-back
//!
//! Timestamps are naive market-local time, so the repeated hour on the
//! fall-back day (rows flagged by `DSTFlag` = `Y` or `repeatHourFlag` = `true`)
//! lands on the same timestamp as the first pass through that hour. The
//! repeated rows are collapsed like any other duplicate and a warning names
//! how many flagged rows were involved.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::error::{NormalizationError, ParseError};
use crate::reports::{ReportDescriptor, TimestampEncoding};
use crate::transformations::{
    hour_ending_to_start, parse_delivery_date, parse_delivery_hour, parse_delivery_interval,
    parse_full_timestamp, parse_hour_ending, parse_price,
};
use crate::types::{CanonicalSample, CanonicalSeries, RawRecord, TIMESTAMP_FIELD};

/// Columns holding a complete timestamp, in preference order
pub const FULL_TIMESTAMP_FIELDS: [&str; 2] = [TIMESTAMP_FIELD, "SCEDTimestamp"];

/// Location columns, in preference order
pub const LOCATION_FIELDS: [&str; 3] = ["busName", "settlementPoint", "electricalBus"];

pub const DELIVERY_DATE_FIELD: &str = "deliveryDate";
pub const HOUR_ENDING_FIELD: &str = "hourEnding";
pub const DELIVERY_HOUR_FIELD: &str = "deliveryHour";
pub const DELIVERY_INTERVAL_FIELD: &str = "deliveryInterval";

/// Columns marking the repeated hour of the DST fall-back day
pub const REPEATED_HOUR_FIELDS: [&str; 2] = ["DSTFlag", "repeatHourFlag"];

/// Where a record set keeps its timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampSource {
    /// One column with the complete timestamp
    Full { field: String },

    /// `deliveryDate` plus an `"HH:MM"` hour-ending label
    HourEnding,

    /// `deliveryDate` plus an integer hour, optionally split into 15-minute intervals
    DeliveryHour { with_interval: bool },
}

impl TimestampSource {
    /// Classify a record set by the union of its field names
    ///
    /// # Returns
    /// - `Ok(TimestampSource)` - first matching rule wins
    /// - `Err(NormalizationError::UnrecognizedSchema)` - lists the sorted field names
    pub fn classify(fields: &BTreeSet<&str>) -> Result<Self, NormalizationError> {
        if let Some(field) = FULL_TIMESTAMP_FIELDS.iter().find(|f| fields.contains(*f)) {
            return Ok(TimestampSource::Full {
                field: field.to_string(),
            });
        }

        if fields.contains(DELIVERY_DATE_FIELD) {
            if fields.contains(HOUR_ENDING_FIELD) {
                return Ok(TimestampSource::HourEnding);
            }
            if fields.contains(DELIVERY_HOUR_FIELD) {
                return Ok(TimestampSource::DeliveryHour {
                    with_interval: fields.contains(DELIVERY_INTERVAL_FIELD),
                });
            }
        }

        Err(NormalizationError::UnrecognizedSchema {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        })
    }

    /// Encoding tag for this source
    pub fn encoding(&self) -> TimestampEncoding {
        match self {
            TimestampSource::Full { .. } => TimestampEncoding::FullTimestamp,
            TimestampSource::HourEnding => TimestampEncoding::DeliveryDateHourEnding,
            TimestampSource::DeliveryHour { .. } => TimestampEncoding::DeliveryDateHour,
        }
    }

    /// Compute the interval-start timestamp of one row
    pub fn timestamp(&self, record: &RawRecord) -> Result<NaiveDateTime, ParseError> {
        match self {
            TimestampSource::Full { field } => parse_full_timestamp(require(record, field)?),
            TimestampSource::HourEnding => {
                let date = parse_delivery_date(require(record, DELIVERY_DATE_FIELD)?)?;
                let hour = parse_hour_ending(require(record, HOUR_ENDING_FIELD)?)?;
                hour_ending_to_start(date, hour)
            }
            TimestampSource::DeliveryHour { with_interval } => {
                let date = parse_delivery_date(require(record, DELIVERY_DATE_FIELD)?)?;
                let hour = parse_delivery_hour(require(record, DELIVERY_HOUR_FIELD)?)?;
                let start = hour_ending_to_start(date, hour)?;
                if *with_interval {
                    Ok(start + parse_delivery_interval(require(record, DELIVERY_INTERVAL_FIELD)?)?)
                } else {
                    Ok(start)
                }
            }
        }
    }
}

fn require<'a>(record: &'a RawRecord, field: &str) -> Result<&'a serde_json::Value, ParseError> {
    record
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ParseError::MissingField(field.to_string()))
}

/// True when a row belongs to the repeated hour of the DST fall-back day
pub fn is_repeated_hour(record: &RawRecord) -> bool {
    REPEATED_HOUR_FIELDS
        .iter()
        .filter_map(|field| record.get(*field))
        .any(|value| match value {
            serde_json::Value::Bool(flag) => *flag,
            serde_json::Value::String(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("y") || s.eq_ignore_ascii_case("true")
            }
            _ => false,
        })
}

/// Union of field names across all records
fn field_union(records: &[RawRecord]) -> BTreeSet<&str> {
    records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect()
}

/// Normalize raw report rows into a canonical series
///
/// # Arguments
///
/// * `records` - Rows as produced by the report fetcher (or by
///   [`CanonicalSeries::to_records`])
/// * `price_field` - Name of the price column (e.g. `"LMP"`)
///
/// # Returns
///
/// * `Ok(CanonicalSeries)` - sorted, de-duplicated; empty for empty input
/// * `Err(NormalizationError::UnrecognizedSchema)` - no known timestamp encoding
///
/// # Examples
///
/// ```
/// use ercot_prices::normalizer::normalize;
/// use ercot_prices::types::RawRecord;
/// use serde_json::json;
///
/// let rows: Vec<RawRecord> = vec![
///     serde_json::from_value(json!({"deliveryDate": "2024-01-01", "hourEnding": "01:00", "LMP": "20.5"})).unwrap(),
///     serde_json::from_value(json!({"deliveryDate": "2024-01-01", "hourEnding": "02:00", "LMP": "abc"})).unwrap(),
/// ];
///
/// let series = normalize(&rows, "LMP").unwrap();
/// assert_eq!(series.len(), 1);
/// assert_eq!(series.samples[0].timestamp.to_string(), "2024-01-01 00:00:00");
/// assert_eq!(series.samples[0].price, 20.5);
/// ```
pub fn normalize(records: &[RawRecord], price_field: &str) -> Result<CanonicalSeries, NormalizationError> {
    if records.is_empty() {
        return Ok(CanonicalSeries::empty(price_field));
    }

    let fields = field_union(records);
    let source = TimestampSource::classify(&fields)?;
    let location_field = LOCATION_FIELDS
        .iter()
        .find(|f| fields.contains(*f))
        .map(|f| f.to_string());

    debug!(?source, location_field = ?location_field, rows = records.len(), "Normalizing records");

    let mut samples = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    let mut repeated_hour_rows = 0usize;

    for (index, record) in records.iter().enumerate() {
        let parsed = source.timestamp(record).and_then(|timestamp| {
            let price = parse_price(require(record, price_field)?)?;
            Ok((timestamp, price))
        });

        match parsed {
            Ok((timestamp, price)) => {
                let location = location_field
                    .as_deref()
                    .and_then(|field| record.get(field))
                    .and_then(|value| match value {
                        serde_json::Value::String(s) => Some(s.clone()),
                        serde_json::Value::Null => None,
                        other => Some(other.to_string()),
                    });
                if is_repeated_hour(record) {
                    repeated_hour_rows += 1;
                }
                samples.push(CanonicalSample {
                    timestamp,
                    price,
                    location,
                });
            }
            Err(err) => {
                dropped += 1;
                debug!(row = index, error = %err, "Dropping row");
            }
        }
    }

    if dropped > 0 {
        warn!(dropped, kept = samples.len(), "Dropped rows that failed to parse");
    }

    // Vec::sort_by_key is stable, so the first row wins among equal timestamps
    samples.sort_by_key(|s| s.timestamp);
    let before = samples.len();
    samples.dedup_by_key(|s| s.timestamp);
    let duplicates = before - samples.len();
    if duplicates > 0 && repeated_hour_rows > 0 {
        warn!(
            duplicates,
            repeated_hour_rows,
            "Collapsed DST repeated-hour rows onto the first pass of that hour"
        );
    } else if duplicates > 0 {
        debug!(duplicates, "Collapsed duplicate timestamps");
    }

    Ok(CanonicalSeries {
        price_field: price_field.to_string(),
        location_field,
        samples,
    })
}

/// Normalize rows from a known report
///
/// Same as [`normalize`] with the report's price field. Logs a warning when the
/// detected encoding differs from the one the report is documented to use.
pub fn normalize_report(
    records: &[RawRecord],
    report: &ReportDescriptor,
) -> Result<CanonicalSeries, NormalizationError> {
    if !records.is_empty() {
        let fields = field_union(records);
        if let Ok(source) = TimestampSource::classify(&fields) {
            if source.encoding() != report.encoding {
                warn!(
                    report = report.id,
                    expected = ?report.encoding,
                    detected = ?source.encoding(),
                    "Report timestamp encoding differs from its descriptor"
                );
            }
        }
    }

    normalize(records, report.price_field)
}
