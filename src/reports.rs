//! Report descriptors and query building
//!
//! ERCOT publishes the four price reports this crate understands under
//! different endpoints with different column layouts:
//!
//! | Report  | Endpoint                           | Timestamp columns                 | Resolution |
//! |---------|------------------------------------|-----------------------------------|------------|
//! | DAM LMP | `np4-183-cd/dam_hourly_lmp`        | `deliveryDate` + `hourEnding`     | hourly     |
//! | DAM SPP | `np4-190-cd/dam_stlmnt_pnt_prices` | `deliveryDate` + `hourEnding`     | hourly     |
//! | RTM LMP | `np6-787-cd/lmp_electrical_bus`    | `SCEDTimestamp`                   | ~5 minutes |
//! | RTM SPP | `np6-905-cd/spp_node_zone_hub`     | `deliveryDate` + `deliveryHour`   | 15 minutes |
//!
//! Each report is described by a static [`ReportDescriptor`]; everything the
//! fetcher needs to build a query comes from it.
//!
//! # Example
//!
//! ```rust
//! use ercot_prices::reports::*;
//!
//! let report = ReportKind::DamSpp.descriptor();
//! let range = DateRange::parse("2024-01-01", "2024-01-02").unwrap();
//! let params = build_query_params(report, "HB_HOUSTON", &range, 5000, 1);
//!
//! assert!(params.contains(&("settlementPoint".to_string(), "HB_HOUSTON".to_string())));
//! assert!(params.contains(&("deliveryDateFrom".to_string(), "2024-01-01".to_string())));
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::QueryError;

// ============================================================================
// Data Structures
// ============================================================================

/// The four supported price reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportKind {
    /// Day-ahead LMP by bus
    DamLmp,
    /// Day-ahead settlement point prices
    DamSpp,
    /// Real-time LMP by electrical bus (SCED interval)
    RtmLmp,
    /// Real-time settlement point prices (15-minute)
    RtmSpp,
}

/// How a report encodes the time of each row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimestampEncoding {
    /// A single full timestamp column
    FullTimestamp,
    /// Delivery date plus an hour-ending label such as `"01:00"`
    DeliveryDateHourEnding,
    /// Delivery date plus an integer hour-ending column
    DeliveryDateHour,
}

/// Native time resolution of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    Hourly,
    SubHourly,
}

/// How the date-range query parameters are formatted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateParamStyle {
    /// `YYYY-MM-DD` on both ends
    Date,
    /// `YYYY-MM-DDT00:00:00` to `YYYY-MM-DDT23:59:59` (inclusive end day)
    Timestamp,
}

/// Immutable description of one report type
#[derive(Debug, PartialEq, Eq)]
pub struct ReportDescriptor {
    pub kind: ReportKind,

    /// Short identifier used on the command line and in export file names
    pub id: &'static str,

    /// Human-readable name
    pub label: &'static str,

    /// Endpoint path relative to the public reports base URL
    pub endpoint: &'static str,

    /// Column holding the price
    pub price_field: &'static str,

    /// Column used both as the location query filter and as the location column
    pub location_field: &'static str,

    /// Timestamp encoding the report is documented to use
    pub encoding: TimestampEncoding,

    pub resolution: Resolution,

    /// Query parameter names for the start and end of the date range
    pub date_from_param: &'static str,
    pub date_to_param: &'static str,
    pub date_style: DateParamStyle,
}

pub static DAM_LMP: ReportDescriptor = ReportDescriptor {
    kind: ReportKind::DamLmp,
    id: "dam-lmp",
    label: "DAM LMP by bus",
    endpoint: "np4-183-cd/dam_hourly_lmp",
    price_field: "LMP",
    location_field: "busName",
    encoding: TimestampEncoding::DeliveryDateHourEnding,
    resolution: Resolution::Hourly,
    date_from_param: "deliveryDateFrom",
    date_to_param: "deliveryDateTo",
    date_style: DateParamStyle::Date,
};

pub static DAM_SPP: ReportDescriptor = ReportDescriptor {
    kind: ReportKind::DamSpp,
    id: "dam-spp",
    label: "DAM settlement point prices",
    endpoint: "np4-190-cd/dam_stlmnt_pnt_prices",
    price_field: "settlementPointPrice",
    location_field: "settlementPoint",
    encoding: TimestampEncoding::DeliveryDateHourEnding,
    resolution: Resolution::Hourly,
    date_from_param: "deliveryDateFrom",
    date_to_param: "deliveryDateTo",
    date_style: DateParamStyle::Date,
};

pub static RTM_LMP: ReportDescriptor = ReportDescriptor {
    kind: ReportKind::RtmLmp,
    id: "rtm-lmp",
    label: "RTM LMP by electrical bus",
    endpoint: "np6-787-cd/lmp_electrical_bus",
    price_field: "LMP",
    location_field: "electricalBus",
    encoding: TimestampEncoding::FullTimestamp,
    resolution: Resolution::SubHourly,
    date_from_param: "SCEDTimestampFrom",
    date_to_param: "SCEDTimestampTo",
    date_style: DateParamStyle::Timestamp,
};

pub static RTM_SPP: ReportDescriptor = ReportDescriptor {
    kind: ReportKind::RtmSpp,
    id: "rtm-spp",
    label: "RTM settlement point prices",
    endpoint: "np6-905-cd/spp_node_zone_hub",
    price_field: "settlementPointPrice",
    location_field: "settlementPoint",
    encoding: TimestampEncoding::DeliveryDateHour,
    resolution: Resolution::SubHourly,
    date_from_param: "deliveryDateFrom",
    date_to_param: "deliveryDateTo",
    date_style: DateParamStyle::Date,
};

/// All report descriptors, in display order
pub static ALL_REPORTS: [&ReportDescriptor; 4] = [&DAM_LMP, &DAM_SPP, &RTM_LMP, &RTM_SPP];

impl ReportKind {
    /// Static descriptor for this report
    pub fn descriptor(self) -> &'static ReportDescriptor {
        match self {
            ReportKind::DamLmp => &DAM_LMP,
            ReportKind::DamSpp => &DAM_SPP,
            ReportKind::RtmLmp => &RTM_LMP,
            ReportKind::RtmSpp => &RTM_SPP,
        }
    }
}

impl FromStr for ReportKind {
    type Err = QueryError;

    /// Parse a report identifier (`dam-lmp`, `dam-spp`, `rtm-lmp`, `rtm-spp`)
    ///
    /// Case-insensitive; underscores are accepted in place of dashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ALL_REPORTS
            .iter()
            .find(|report| report.id == normalized)
            .map(|report| report.kind)
            .ok_or_else(|| QueryError::UnknownReport(s.to_string()))
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().id)
    }
}

impl ReportDescriptor {
    /// True when the report is finer than hourly and should be resampled
    pub fn is_sub_hourly(&self) -> bool {
        self.resolution == Resolution::SubHourly
    }
}

/// Inclusive calendar date range for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, QueryError> {
        if start > end {
            return Err(QueryError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse and validate a `YYYY-MM-DD` pair
    ///
    /// # Examples
    ///
    /// ```
    /// # use ercot_prices::reports::DateRange;
    /// // Valid range
    /// assert!(DateRange::parse("2024-10-24", "2024-10-25").is_ok());
    ///
    /// // Same day is a one-day range
    /// assert!(DateRange::parse("2024-10-24", "2024-10-24").is_ok());
    ///
    /// // Invalid: start after end
    /// assert!(DateRange::parse("2024-10-25", "2024-10-24").is_err());
    ///
    /// // Invalid format
    /// assert!(DateRange::parse("invalid", "2024-10-24").is_err());
    /// ```
    pub fn parse(start: &str, end: &str) -> Result<Self, QueryError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Number of calendar days covered (inclusive)
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| QueryError::InvalidDate(s.to_string()))
}

// ============================================================================
// Query Building
// ============================================================================

/// Build the full endpoint URL for a report
///
/// Trailing slashes on `base_url` are ignored.
///
/// ```
/// # use ercot_prices::reports::{build_report_url, DAM_LMP};
/// let url = build_report_url("https://api.ercot.com/api/public-reports/", &DAM_LMP);
/// assert_eq!(url, "https://api.ercot.com/api/public-reports/np4-183-cd/dam_hourly_lmp");
/// ```
pub fn build_report_url(base_url: &str, report: &ReportDescriptor) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), report.endpoint)
}

/// Format the from/to values for a report's date parameters
pub fn format_date_bounds(report: &ReportDescriptor, range: &DateRange) -> (String, String) {
    match report.date_style {
        DateParamStyle::Date => (
            range.start.format("%Y-%m-%d").to_string(),
            range.end.format("%Y-%m-%d").to_string(),
        ),
        DateParamStyle::Timestamp => (
            range.start.format("%Y-%m-%dT00:00:00").to_string(),
            range.end.format("%Y-%m-%dT23:59:59").to_string(),
        ),
    }
}

/// Build the query parameters for one page of a report query
///
/// # Arguments
///
/// * `report` - Report descriptor
/// * `location` - Bus or settlement point name (sent as the descriptor's location field)
/// * `range` - Inclusive date range
/// * `page_size` - Rows per page (`size`)
/// * `page` - 1-based page number (`page`)
pub fn build_query_params(
    report: &ReportDescriptor,
    location: &str,
    range: &DateRange,
    page_size: usize,
    page: u64,
) -> Vec<(String, String)> {
    let (from, to) = format_date_bounds(report, range);

    vec![
        (report.location_field.to_string(), location.to_string()),
        (report.date_from_param.to_string(), from),
        (report.date_to_param.to_string(), to),
        ("size".to_string(), page_size.to_string()),
        ("page".to_string(), page.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::parse(start, end).unwrap()
    }

    #[test]
    fn test_four_distinct_descriptors() {
        assert_eq!(ALL_REPORTS.len(), 4);
        for (i, a) in ALL_REPORTS.iter().enumerate() {
            for b in ALL_REPORTS.iter().skip(i + 1) {
                assert_ne!(a.id, b.id);
                assert_ne!(a.endpoint, b.endpoint);
            }
            assert_eq!(a.kind.descriptor(), *a);
        }
    }

    #[test]
    fn test_report_kind_from_str() {
        assert_eq!("dam-lmp".parse::<ReportKind>().unwrap(), ReportKind::DamLmp);
        assert_eq!("RTM_SPP".parse::<ReportKind>().unwrap(), ReportKind::RtmSpp);
        assert_eq!(
            "hourly".parse::<ReportKind>(),
            Err(QueryError::UnknownReport("hourly".to_string()))
        );
    }

    #[test]
    fn test_report_kind_display_round_trips_id() {
        for report in ALL_REPORTS {
            assert_eq!(report.kind.to_string(), report.id);
        }
    }

    #[test]
    fn test_resolution_by_market() {
        assert!(!DAM_LMP.is_sub_hourly());
        assert!(!DAM_SPP.is_sub_hourly());
        assert!(RTM_LMP.is_sub_hourly());
        assert!(RTM_SPP.is_sub_hourly());
    }

    #[test]
    fn test_date_range_validation() {
        assert!(DateRange::parse("2024-01-01", "2024-01-01").is_ok());
        assert_eq!(
            DateRange::parse("2024-01-02", "2024-01-01"),
            Err(QueryError::InvalidDateRange {
                start: "2024-01-02".to_string(),
                end: "2024-01-01".to_string(),
            })
        );
        assert_eq!(
            DateRange::parse("01/02/2024", "2024-01-03"),
            Err(QueryError::InvalidDate("01/02/2024".to_string()))
        );
    }

    #[test]
    fn test_date_range_days_inclusive() {
        assert_eq!(range("2024-01-01", "2024-01-01").days(), 1);
        assert_eq!(range("2024-02-28", "2024-03-01").days(), 3);
    }

    #[test]
    fn test_build_report_url_trailing_slash() {
        assert_eq!(
            build_report_url("http://localhost:1234/", &RTM_SPP),
            "http://localhost:1234/np6-905-cd/spp_node_zone_hub"
        );
        assert_eq!(
            build_report_url("http://localhost:1234", &RTM_SPP),
            "http://localhost:1234/np6-905-cd/spp_node_zone_hub"
        );
    }

    #[test]
    fn test_date_bounds_for_sced_report_cover_whole_end_day() {
        let (from, to) = format_date_bounds(&RTM_LMP, &range("2024-01-01", "2024-01-02"));
        assert_eq!(from, "2024-01-01T00:00:00");
        assert_eq!(to, "2024-01-02T23:59:59");
    }

    #[test]
    fn test_build_query_params_dam_lmp() {
        let params = build_query_params(&DAM_LMP, "AMOCO_PUN1", &range("2024-01-01", "2024-01-07"), 5000, 2);
        assert_eq!(
            params,
            vec![
                ("busName".to_string(), "AMOCO_PUN1".to_string()),
                ("deliveryDateFrom".to_string(), "2024-01-01".to_string()),
                ("deliveryDateTo".to_string(), "2024-01-07".to_string()),
                ("size".to_string(), "5000".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }
}
