//! ERCOT prices - retrieval and normalization of ERCOT LMP/SPP price series
//!
//! Pulls locational marginal prices and settlement point prices from ERCOT's
//! public reports API and turns the four report layouts into one canonical
//! time-indexed series.
//!
//! # Features
//! - Password-grant token exchange against ERCOT's B2C identity provider
//! - Paginated report queries with truncation reporting
//! - Schema normalization across timestamp encodings (full timestamp,
//!   delivery date + hour ending, delivery date + hour + interval)
//! - Hourly resampling of real-time reports
//! - Summary statistics, histogram, hour-of-day averages, solar-hours filter
//! - CSV export
//!
//! # Pipeline
//!
//! ```text
//! TokenProvider → ReportFetcher → normalize → resample_hourly → summarize / write_csv
//! ```
//!
//! [`Session`] wires the steps together and caches the token and query results.
//!
//! # Example
//!
//! ```rust,no_run
//! use ercot_prices::{Config, ReqwestHttpClient, Session, ReportQuery, ReportKind, DateRange};
//! use ercot_prices::stats::{summarize, HourFilter, DEFAULT_HISTOGRAM_BINS};
//!
//! let config = Config::from_env()?;
//! let client = ReqwestHttpClient::new(config.http_timeout)?;
//! let mut session = Session::new(config, client);
//!
//! let range = DateRange::parse("2024-01-01", "2024-01-07")?;
//! let result = session.run_query(&ReportQuery::new(ReportKind::RtmSpp, "HB_HOUSTON", range))?;
//! let _summary = summarize(&result.series, HourFilter::SolarHours, DEFAULT_HISTOGRAM_BINS);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod http;
pub mod normalizer;
pub mod oauth2;
pub mod reports;
pub mod resample;
pub mod session;
pub mod stats;
pub mod transformations;
pub mod types;

// Re-export public types for easier access
pub use config::{Config, Credentials};
pub use error::{AuthError, ConfigError, Error, ExportError, FetchError, NormalizationError, ParseError, QueryError};
pub use fetcher::{FetchedRecords, ReportFetcher};
pub use http::{HttpClient, ReqwestHttpClient};
pub use normalizer::{normalize, normalize_report, TimestampSource};
pub use oauth2::{AccessToken, TokenProvider};
pub use reports::{DateRange, ReportDescriptor, ReportKind, ALL_REPORTS};
pub use resample::{hourly_buckets, resample_hourly};
pub use session::{FetchStatus, QueryResult, ReportQuery, Session};
pub use stats::{summarize, HourFilter, Summary, SummaryOutcome};
pub use types::{CanonicalSample, CanonicalSeries, HourlySeries, RawRecord};
