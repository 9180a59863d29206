//! Error types for the ERCOT price pipeline
//!
//! Provides error handling for every stage of a fetch:
//! - Configuration errors (missing secrets, invalid overrides)
//! - Token exchange errors against the identity provider
//! - Report API errors (network, empty results, malformed envelopes, expired tokens)
//! - Schema normalization errors (unrecognized timestamp encoding)
//! - Row-level parse errors (only used to explain dropped rows)
//! - CSV export errors

use thiserror::Error;

/// Top-level error type for the pipeline
///
/// Supports automatic conversion from the stage-specific error types via `From`
#[derive(Debug, Error)]
pub enum Error {
    /// Startup configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Token exchange error
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Report API error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Timestamp encoding could not be detected
    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizationError),

    /// Invalid user query (dates, report name)
    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    /// CSV export error
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Configuration errors
///
/// All of these are fatal at startup.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A required secret is not set
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An optional override is set but cannot be parsed
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
}

/// Token exchange errors
///
/// The token is never cached when one of these occurs.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Identity provider rejected the username/password (HTTP 400 or 401)
    #[error("Invalid ERCOT API credentials (HTTP {status}): {body}")]
    InvalidCredentials { status: u16, body: String },

    /// Token request failed for any other reason
    ///
    /// `status` is 0 when the request never got a response.
    #[error("Token fetch failed (HTTP {status}): {body}")]
    FetchFailed { status: u16, body: String },

    /// Response body has no usable token
    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),
}

/// Report API errors
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Transport failure or non-success HTTP status
    ///
    /// `status` is `None` when the request never got a response.
    #[error("{}", network_message(.status, .body))]
    NetworkError { status: Option<u16>, body: String },

    /// The server reports zero matching records
    #[error("Report returned zero records for this selection")]
    EmptyResult,

    /// Envelope is not JSON or lacks `fields`/`data`
    #[error("Malformed report response: {detail} (top-level fields present: [{}])", .present.join(", "))]
    MalformedResponse { detail: String, present: Vec<String> },

    /// Bearer token rejected by the report API (HTTP 401/403)
    #[error("Access token rejected (HTTP {status}); re-authenticate and fetch again")]
    TokenExpired { status: u16 },

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded (HTTP 429); wait before fetching again")]
    RateLimited,
}

fn network_message(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(status) => format!("HTTP {} error: {}", status, body),
        None => format!("Network error: {}", body),
    }
}

/// Schema normalization errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizationError {
    /// None of the known timestamp encodings match the record fields
    #[error("Unrecognized report schema; fields present: [{}]", .fields.join(", "))]
    UnrecognizedSchema { fields: Vec<String> },
}

/// Invalid query parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Start date after end date
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    /// Date is not `YYYY-MM-DD`
    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// Report identifier not one of the four known reports
    #[error("Unknown report '{0}' (expected dam-lmp, dam-spp, rtm-lmp or rtm-spp)")]
    UnknownReport(String),

    /// Empty location filter
    #[error("Location filter must not be empty")]
    EmptyLocation,
}

/// Row-level parse errors
///
/// Never escape the normalizer: a failing row is dropped and the error is logged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Price missing, non-numeric or not finite
    #[error("Invalid price value: '{0}'")]
    InvalidPrice(String),

    /// Delivery date not `YYYY-MM-DD` or `MM/DD/YYYY`
    #[error("Invalid delivery date: '{0}'")]
    InvalidDate(String),

    /// Hour-ending or delivery hour outside 1..=24 or unparseable
    #[error("Invalid hour value: '{0}' (expected hour ending 1-24)")]
    InvalidHour(String),

    /// Delivery interval outside 1..=4 or unparseable
    #[error("Invalid delivery interval: '{0}' (expected 1-4)")]
    InvalidInterval(String),

    /// Full timestamp in an unknown format
    #[error("Invalid timestamp: '{0}'")]
    InvalidTimestamp(String),

    /// Field absent from the record
    #[error("Missing field: '{0}'")]
    MissingField(String),
}

/// CSV export errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization failed
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    /// File could not be created or flushed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
