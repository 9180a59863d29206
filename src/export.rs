//! CSV export of price series
//!
//! Output format:
//!
//! ```text
//! timestamp,LMP,busName
//! 2024-01-01 00:00:00,20.5,AMOCO_PUN1
//! ```
//!
//! One row per sample, comma-separated UTF-8, no index column. The location
//! column is written only when the series carries one.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use serde_json::Value;
use tracing::info;

use crate::error::ExportError;
use crate::reports::{DateRange, ReportDescriptor};
use crate::types::{CanonicalSeries, RawRecord, TIMESTAMP_FIELD, TIMESTAMP_FORMAT};

/// Write a series as CSV
pub fn write_csv<W: Write>(series: &CanonicalSeries, writer: W) -> Result<(), ExportError> {
    let mut csv = WriterBuilder::new().has_headers(false).from_writer(writer);

    let mut header = vec![TIMESTAMP_FIELD, series.price_field.as_str()];
    if let Some(location_field) = &series.location_field {
        header.push(location_field.as_str());
    }
    csv.write_record(&header)?;

    for sample in &series.samples {
        let timestamp = sample.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let price = sample.price.to_string();
        if series.location_field.is_some() {
            let location = sample.location.as_deref().unwrap_or("");
            csv.write_record([timestamp.as_str(), price.as_str(), location])?;
        } else {
            csv.write_record([timestamp.as_str(), price.as_str()])?;
        }
    }

    csv.flush()?;
    Ok(())
}

/// File name for an export: `{location}_{report-id}_{start}_to_{end}.csv`
///
/// Path separators and whitespace in the location become `_`.
///
/// ```
/// # use ercot_prices::export::export_filename;
/// # use ercot_prices::reports::{DateRange, DAM_SPP};
/// let range = DateRange::parse("2024-01-01", "2024-01-07").unwrap();
/// assert_eq!(
///     export_filename("HB HOUSTON", &DAM_SPP, &range),
///     "HB_HOUSTON_dam-spp_2024-01-01_to_2024-01-07.csv"
/// );
/// ```
pub fn export_filename(location: &str, report: &ReportDescriptor, range: &DateRange) -> String {
    let location: String = location
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_whitespace() { '_' } else { c })
        .collect();

    format!("{}_{}_{}_to_{}.csv", location, report.id, range.start, range.end)
}

/// Write a series into `dir` under its export file name
///
/// # Returns
/// Path of the written file
pub fn write_csv_file(
    series: &CanonicalSeries,
    dir: &Path,
    location: &str,
    report: &ReportDescriptor,
    range: &DateRange,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(location, report, range));
    write_csv(series, File::create(&path)?)?;

    info!(path = %path.display(), rows = series.len(), "Wrote CSV export");
    Ok(path)
}

/// Read an exported CSV back into raw records
///
/// Every value is kept as a string; the result can be fed to
/// [`crate::normalizer::normalize`].
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawRecord>, ExportError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();

    let mut records = Vec::new();
    for result in csv.records() {
        let row = result?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect();
        records.push(record);
    }
    Ok(records)
}
