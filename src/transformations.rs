//! Field transformation functions for ERCOT report rows
//!
//! Converts raw JSON field values from the public reports API into typed
//! values for the canonical series.
//!
//! # Transformations
//!
//! 1. **Price coercion**: `"20.5"` or `20.5` → `20.5` (non-finite and non-numeric rejected)
//! 2. **Delivery date parsing**: `"2024-01-01"` or `"01/01/2024"` → `NaiveDate`
//! 3. **Hour-ending parsing**: `"01:00"` → `1`, `"24:00"` → `24`
//! 4. **Delivery hour parsing**: `1` or `"1"` → `1`
//! 5. **Hour-ending shift**: `(2024-01-01, HE 1)` → `2024-01-01T00:00`
//! 6. **Delivery interval offset**: interval `3` → `+30 minutes`
//! 7. **Full timestamp parsing**: `"2024-01-01T00:05:16"` → `NaiveDateTime`
//!
//! # Example
//!
//! ```rust
//! use ercot_prices::transformations::*;
//! use serde_json::json;
//!
//! let price = parse_price(&json!("20.5")).unwrap();
//! assert_eq!(price, 20.5);
//!
//! let date = parse_delivery_date(&json!("2024-01-01")).unwrap();
//! let hour = parse_hour_ending(&json!("24:00")).unwrap();
//! let ts = hour_ending_to_start(date, hour).unwrap();
//! assert_eq!(ts.to_string(), "2024-01-01 23:00:00");
//! ```

use crate::error::ParseError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Minutes per real-time settlement interval
pub const INTERVAL_MINUTES: i64 = 15;

/// Render a raw value for error messages
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Transformation 1: Price Coercion
// ============================================================================

/// Coerce a raw price value to a finite number
///
/// Accepts JSON numbers and numeric strings (surrounding whitespace ignored).
/// Missing, empty, non-numeric, `NaN` and infinite values are rejected so the
/// caller can drop the row instead of inventing a price.
///
/// # Examples
///
/// ```
/// # use ercot_prices::transformations::parse_price;
/// # use serde_json::json;
/// assert_eq!(parse_price(&json!(20.5)).unwrap(), 20.5);
/// assert_eq!(parse_price(&json!(" -3.1 ")).unwrap(), -3.1);
/// assert!(parse_price(&json!("abc")).is_err());
/// assert!(parse_price(&json!(null)).is_err());
/// assert!(parse_price(&json!("NaN")).is_err());
/// ```
pub fn parse_price(value: &Value) -> Result<f64, ParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(price) if price.is_finite() => Ok(price),
        _ => Err(ParseError::InvalidPrice(describe(value))),
    }
}

// ============================================================================
// Transformation 2: Delivery Date Parsing
// ============================================================================

/// Parse a delivery date
///
/// ERCOT's API returns ISO dates (`YYYY-MM-DD`); the `MM/DD/YYYY` form used by
/// ERCOT's downloadable reports is accepted too.
pub fn parse_delivery_date(value: &Value) -> Result<NaiveDate, ParseError> {
    let raw = match value {
        Value::String(s) => s.trim(),
        other => return Err(ParseError::InvalidDate(describe(other))),
    };

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .map_err(|_| ParseError::InvalidDate(raw.to_string()))
}

// ============================================================================
// Transformation 3: Hour-Ending String Parsing
// ============================================================================

/// Parse an hour-ending label (`"HH:MM"`) to its hour component
///
/// Only the hour component matters; it must be within 1..=24. `"24:00"` is
/// valid here even though it is not a valid clock time.
///
/// # Examples
///
/// ```
/// # use ercot_prices::transformations::parse_hour_ending;
/// # use serde_json::json;
/// assert_eq!(parse_hour_ending(&json!("01:00")).unwrap(), 1);
/// assert_eq!(parse_hour_ending(&json!("24:00")).unwrap(), 24);
/// assert!(parse_hour_ending(&json!("00:00")).is_err());
/// assert!(parse_hour_ending(&json!("25:00")).is_err());
/// ```
pub fn parse_hour_ending(value: &Value) -> Result<u32, ParseError> {
    let raw = match value {
        Value::String(s) => s.trim(),
        other => return Err(ParseError::InvalidHour(describe(other))),
    };

    let hour = raw
        .split(':')
        .next()
        .and_then(|h| h.trim().parse::<u32>().ok())
        .ok_or_else(|| ParseError::InvalidHour(raw.to_string()))?;

    validate_hour_ending(hour, raw)
}

// ============================================================================
// Transformation 4: Integer Delivery Hour Parsing
// ============================================================================

/// Parse an integer delivery hour (hour-ending convention, 1..=24)
///
/// Accepts JSON integers and integer strings.
pub fn parse_delivery_hour(value: &Value) -> Result<u32, ParseError> {
    let hour = match value {
        Value::Number(n) => n.as_u64().and_then(|h| u32::try_from(h).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
    .ok_or_else(|| ParseError::InvalidHour(describe(value)))?;

    validate_hour_ending(hour, &describe(value))
}

fn validate_hour_ending(hour: u32, raw: &str) -> Result<u32, ParseError> {
    if (1..=24).contains(&hour) {
        Ok(hour)
    } else {
        Err(ParseError::InvalidHour(raw.to_string()))
    }
}

// ============================================================================
// Transformation 5: Hour-Ending → Interval Start
// ============================================================================

/// Shift an hour-ending label to the start of the hour it covers
///
/// Hour ending N covers `(N-1):00` to `N:00`, so the canonical timestamp is
/// midnight of the delivery date plus `N - 1` hours. HE 24 therefore stays on
/// the same calendar date (23:00).
///
/// # Examples
///
/// ```
/// # use ercot_prices::transformations::hour_ending_to_start;
/// # use chrono::NaiveDate;
/// let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// assert_eq!(hour_ending_to_start(date, 1).unwrap().to_string(), "2024-01-01 00:00:00");
/// assert_eq!(hour_ending_to_start(date, 24).unwrap().to_string(), "2024-01-01 23:00:00");
/// ```
pub fn hour_ending_to_start(date: NaiveDate, hour_ending: u32) -> Result<NaiveDateTime, ParseError> {
    let hour_ending = validate_hour_ending(hour_ending, &hour_ending.to_string())?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ParseError::InvalidDate(date.to_string()))?;

    Ok(midnight + Duration::hours(i64::from(hour_ending) - 1))
}

// ============================================================================
// Transformation 6: Delivery Interval Offset
// ============================================================================

/// Parse a real-time delivery interval (1..=4) into its offset from the hour
///
/// Interval 1 starts on the hour, interval 4 starts at :45.
pub fn parse_delivery_interval(value: &Value) -> Result<Duration, ParseError> {
    let interval = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .filter(|i| (1..=4).contains(i))
    .ok_or_else(|| ParseError::InvalidInterval(describe(value)))?;

    Ok(Duration::minutes((interval - 1) * INTERVAL_MINUTES))
}

// ============================================================================
// Transformation 7: Full Timestamp Parsing
// ============================================================================

/// Parse a full timestamp field
///
/// Supported forms:
/// - `2024-01-01T00:05:16` (SCED timestamps, optional fractional seconds)
/// - `2024-01-01 00:05:16` (canonical/CSV form)
/// - `2024-01-01T00:05`
/// - RFC 3339 with an offset; the local wall-clock part is kept
///
/// # Examples
///
/// ```
/// # use ercot_prices::transformations::parse_full_timestamp;
/// # use serde_json::json;
/// let ts = parse_full_timestamp(&json!("2024-01-01T00:05:16")).unwrap();
/// assert_eq!(ts.to_string(), "2024-01-01 00:05:16");
/// assert!(parse_full_timestamp(&json!("yesterday")).is_err());
/// ```
pub fn parse_full_timestamp(value: &Value) -> Result<NaiveDateTime, ParseError> {
    let raw = match value {
        Value::String(s) => s.trim(),
        other => return Err(ParseError::InvalidTimestamp(describe(other))),
    };

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    for format in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .map_err(|_| ParseError::InvalidTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_price_number_and_string() {
        assert_eq!(parse_price(&json!(42)).unwrap(), 42.0);
        assert_eq!(parse_price(&json!("20.5")).unwrap(), 20.5);
        assert_eq!(parse_price(&json!("-251.07")).unwrap(), -251.07);
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        assert_eq!(
            parse_price(&json!("abc")),
            Err(ParseError::InvalidPrice("abc".to_string()))
        );
        assert!(parse_price(&json!("")).is_err());
        assert!(parse_price(&json!(true)).is_err());
        assert!(parse_price(&json!("inf")).is_err());
    }

    #[test]
    fn test_parse_delivery_date_formats() {
        assert_eq!(parse_delivery_date(&json!("2024-03-10")).unwrap(), date(2024, 3, 10));
        assert_eq!(parse_delivery_date(&json!("03/10/2024")).unwrap(), date(2024, 3, 10));
        assert!(parse_delivery_date(&json!("2024-13-01")).is_err());
        assert!(parse_delivery_date(&json!(20240310)).is_err());
    }

    #[test]
    fn test_parse_hour_ending_bounds() {
        assert_eq!(parse_hour_ending(&json!("01:00")).unwrap(), 1);
        assert_eq!(parse_hour_ending(&json!("13:00")).unwrap(), 13);
        assert_eq!(parse_hour_ending(&json!("24:00")).unwrap(), 24);
        assert!(parse_hour_ending(&json!("0:00")).is_err());
        assert!(parse_hour_ending(&json!("ab:00")).is_err());
        assert!(parse_hour_ending(&json!(1)).is_err());
    }

    #[test]
    fn test_parse_delivery_hour() {
        assert_eq!(parse_delivery_hour(&json!(1)).unwrap(), 1);
        assert_eq!(parse_delivery_hour(&json!("24")).unwrap(), 24);
        assert!(parse_delivery_hour(&json!(0)).is_err());
        assert!(parse_delivery_hour(&json!(25)).is_err());
        assert!(parse_delivery_hour(&json!(-1)).is_err());
        assert!(parse_delivery_hour(&json!(1.5)).is_err());
    }

    #[test]
    fn test_hour_ending_boundaries_stay_on_same_date() {
        let d = date(2024, 1, 1);
        assert_eq!(
            hour_ending_to_start(d, 1).unwrap(),
            d.and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            hour_ending_to_start(d, 24).unwrap(),
            d.and_hms_opt(23, 0, 0).unwrap()
        );
        assert!(hour_ending_to_start(d, 0).is_err());
    }

    #[test]
    fn test_string_and_integer_hours_agree() {
        let d = date(2024, 7, 4);
        for hour in 1..=24u32 {
            let from_string = parse_hour_ending(&json!(format!("{:02}:00", hour))).unwrap();
            let from_int = parse_delivery_hour(&json!(hour)).unwrap();
            assert_eq!(
                hour_ending_to_start(d, from_string).unwrap(),
                hour_ending_to_start(d, from_int).unwrap()
            );
        }
    }

    #[test]
    fn test_parse_delivery_interval() {
        assert_eq!(parse_delivery_interval(&json!(1)).unwrap(), Duration::zero());
        assert_eq!(parse_delivery_interval(&json!("4")).unwrap(), Duration::minutes(45));
        assert!(parse_delivery_interval(&json!(5)).is_err());
        assert!(parse_delivery_interval(&json!(0)).is_err());
    }

    #[test]
    fn test_parse_full_timestamp_variants() {
        let expected = date(2024, 1, 1).and_hms_opt(0, 5, 16).unwrap();
        assert_eq!(parse_full_timestamp(&json!("2024-01-01T00:05:16")).unwrap(), expected);
        assert_eq!(parse_full_timestamp(&json!("2024-01-01 00:05:16")).unwrap(), expected);
        assert_eq!(
            parse_full_timestamp(&json!("2024-01-01T00:05:16-06:00")).unwrap(),
            expected
        );
        assert_eq!(
            parse_full_timestamp(&json!("2024-01-01T00:05")).unwrap(),
            date(2024, 1, 1).and_hms_opt(0, 5, 0).unwrap()
        );
        assert!(parse_full_timestamp(&json!("01/01/2024 00:05")).is_err());
    }
}
