//! Report fetcher for the ERCOT public reports API
//!
//! Issues the paginated query for one report and flattens the JSON envelope
//! into [`RawRecord`]s.
//!
//! # Envelope
//!
//! ```text
//! {
//!   "_meta":  { "totalRecords": 48, "pageSize": 5000, "totalPages": 1, "currentPage": 1 },
//!   "fields": [ { "name": "deliveryDate" }, { "name": "hourEnding" }, ... ],
//!   "data":   [ [ "2024-01-01", "01:00", ... ], ... ]
//! }
//! ```
//!
//! `meta` is accepted as an alias of `_meta`.
//!
//! # Pagination
//!
//! Pages are requested in order until the reported page count is reached or
//! `max_pages` is hit. A result with fewer records than `totalRecords` is
//! returned with `truncated = true` and a warning is logged.
//!
//! # Status handling
//!
//! - 2xx → parse envelope
//! - 401 / 403 → [`FetchError::TokenExpired`] (caller must re-authenticate)
//! - 429 → [`FetchError::RateLimited`]
//! - anything else → [`FetchError::NetworkError`] with status and body

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::FetchError;
use crate::http::{HttpClient, Request};
use crate::oauth2::AccessToken;
use crate::reports::{build_query_params, build_report_url, DateRange, ReportDescriptor};
use crate::types::RawRecord;

/// Header carrying the API subscription key
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Deserialize)]
struct ReportEnvelope {
    #[serde(rename = "_meta", alias = "meta", default)]
    meta: Option<ReportMeta>,

    #[serde(default)]
    fields: Option<Vec<FieldSpec>>,

    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportMeta {
    #[serde(default)]
    total_records: Option<u64>,

    #[serde(default)]
    page_size: Option<u64>,

    #[serde(default)]
    total_pages: Option<u64>,

    #[serde(default)]
    current_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FieldSpec {
    name: String,
}

/// One decoded page
#[derive(Debug)]
struct ReportPage {
    records: Vec<RawRecord>,
    field_names: Vec<String>,
    total_records: Option<u64>,
    total_pages: Option<u64>,
}

/// Decode one page body into named records
///
/// `EmptyResult` is returned when the server reports zero total records,
/// before `fields`/`data` are required.
fn parse_page(body: &str) -> Result<ReportPage, FetchError> {
    let value: Value = serde_json::from_str(body).map_err(|err| FetchError::MalformedResponse {
        detail: format!("body is not JSON: {}", err),
        present: Vec::new(),
    })?;

    let present: Vec<String> = match &value {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };

    let envelope: ReportEnvelope =
        serde_json::from_value(value).map_err(|err| FetchError::MalformedResponse {
            detail: format!("unexpected envelope shape: {}", err),
            present: present.clone(),
        })?;

    let total_records = envelope.meta.as_ref().and_then(|m| m.total_records);
    if total_records == Some(0) {
        return Err(FetchError::EmptyResult);
    }

    let fields = envelope.fields.ok_or_else(|| FetchError::MalformedResponse {
        detail: "missing 'fields'".to_string(),
        present: present.clone(),
    })?;
    let data = envelope.data.ok_or_else(|| FetchError::MalformedResponse {
        detail: "missing 'data'".to_string(),
        present: present.clone(),
    })?;

    let field_names: Vec<String> = fields.into_iter().map(|f| f.name).collect();

    let records = data
        .into_iter()
        .map(|row| {
            if row.len() != field_names.len() {
                debug!(
                    expected = field_names.len(),
                    actual = row.len(),
                    "Row width differs from field list"
                );
            }
            field_names.iter().cloned().zip(row).collect::<RawRecord>()
        })
        .collect();

    let total_pages = envelope.meta.as_ref().and_then(|meta| {
        meta.total_pages.or_else(|| {
            let total = meta.total_records?;
            let size = meta.page_size.filter(|s| *s > 0)?;
            Some(total.div_ceil(size))
        })
    });

    if let Some(meta) = &envelope.meta {
        debug!(
            current_page = ?meta.current_page,
            total_pages = ?total_pages,
            total_records = ?meta.total_records,
            "Decoded report page"
        );
    }

    Ok(ReportPage {
        records,
        field_names,
        total_records,
        total_pages,
    })
}

// ============================================================================
// Fetcher
// ============================================================================

/// Records returned for one query
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRecords {
    pub records: Vec<RawRecord>,

    /// Field names as listed by the server
    pub field_names: Vec<String>,

    /// Total reported by the server (falls back to the number received)
    pub total_records: u64,

    /// Pages actually requested
    pub pages_fetched: u64,

    /// True when fewer records than `total_records` were collected
    pub truncated: bool,
}

/// Issues report queries against the public reports API
#[derive(Debug)]
pub struct ReportFetcher<'a, C: HttpClient> {
    client: &'a C,
    base_url: &'a str,
    subscription_key: &'a str,
    page_size: usize,
    max_pages: u64,
}

impl<'a, C: HttpClient> ReportFetcher<'a, C> {
    pub fn new(client: &'a C, base_url: &'a str, subscription_key: &'a str) -> Self {
        Self {
            client,
            base_url,
            subscription_key,
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            max_pages: crate::config::DEFAULT_MAX_PAGES,
        }
    }

    /// Fetcher using the endpoints and limits from a [`Config`]
    pub fn from_config(client: &'a C, config: &'a Config) -> Self {
        Self::new(
            client,
            &config.base_url,
            config.credentials.subscription_key.expose_secret(),
        )
        .with_page_size(config.page_size)
        .with_max_pages(config.max_pages)
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetch all rows for a location and date range
    ///
    /// # Arguments
    ///
    /// * `report` - Which report to query
    /// * `token` - Bearer token from the token provider
    /// * `location` - Bus or settlement point name
    /// * `range` - Inclusive calendar date range
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedRecords)` - at least one record
    /// * `Err(FetchError::EmptyResult)` - server reports zero records
    /// * `Err(FetchError)` - any other failure on any page
    pub fn fetch(
        &self,
        report: &ReportDescriptor,
        token: &AccessToken,
        location: &str,
        range: &DateRange,
    ) -> Result<FetchedRecords, FetchError> {
        let url = build_report_url(self.base_url, report);

        info!(
            report = report.id,
            location,
            start = %range.start,
            end = %range.end,
            "Fetching ERCOT report"
        );

        let first = self.fetch_page(&url, report, token, location, range, 1)?;
        let mut records = first.records;
        let field_names = first.field_names;
        let total_records = first.total_records;
        let total_pages = first.total_pages.unwrap_or(1);

        let last_page = total_pages.min(self.max_pages);
        let mut pages_fetched = 1;

        for page in 2..=last_page {
            let next = match self.fetch_page(&url, report, token, location, range, page) {
                Ok(next) => next,
                // Fewer rows than advertised; the truncation check below reports it
                Err(FetchError::EmptyResult) => break,
                Err(err) => return Err(err),
            };
            pages_fetched = page;
            if next.records.is_empty() {
                break;
            }
            records.extend(next.records);
        }

        if records.is_empty() && total_records.is_none() {
            return Err(FetchError::EmptyResult);
        }

        let received = records.len() as u64;
        let total_records = total_records.unwrap_or(received);
        let truncated = received < total_records;

        if truncated {
            warn!(
                report = report.id,
                received,
                total_records,
                pages_fetched,
                total_pages,
                max_pages = self.max_pages,
                "Report result is truncated; narrow the date range or raise ERCOT_MAX_PAGES"
            );
        }

        info!(report = report.id, received, total_records, pages_fetched, "Report fetched");

        Ok(FetchedRecords {
            records,
            field_names,
            total_records,
            pages_fetched,
            truncated,
        })
    }

    fn fetch_page(
        &self,
        url: &str,
        report: &ReportDescriptor,
        token: &AccessToken,
        location: &str,
        range: &DateRange,
        page: u64,
    ) -> Result<ReportPage, FetchError> {
        let request = Request::get(url)
            .header("authorization", token.bearer_header())
            .header(SUBSCRIPTION_KEY_HEADER, self.subscription_key)
            .header("accept", "application/json")
            .with_query(build_query_params(report, location, range, self.page_size, page));

        debug!(url, page, "Requesting report page");

        let response = self
            .client
            .send(&request)
            .map_err(|err| FetchError::NetworkError { status: None, body: err })?;

        match response.status_code {
            200..=299 => parse_page(&response.body),
            401 | 403 => Err(FetchError::TokenExpired {
                status: response.status_code,
            }),
            429 => Err(FetchError::RateLimited),
            status => Err(FetchError::NetworkError {
                status: Some(status),
                body: response.body,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeHttpClient;
    use crate::reports::{DAM_LMP, RTM_LMP};
    use serde_json::json;

    fn range() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-01").unwrap()
    }

    fn token() -> AccessToken {
        AccessToken::new("tok")
    }

    fn page_body(total: u64, total_pages: u64, page: u64, rows: &[(&str, &str, &str)]) -> String {
        json!({
            "_meta": {
                "totalRecords": total,
                "pageSize": 2,
                "totalPages": total_pages,
                "currentPage": page
            },
            "fields": [
                {"name": "deliveryDate", "label": "Delivery Date", "dataType": "DATE"},
                {"name": "hourEnding"},
                {"name": "busName"},
                {"name": "LMP"}
            ],
            "data": rows
                .iter()
                .map(|(d, h, p)| json!([d, h, "AMOCO_PUN1", p]))
                .collect::<Vec<_>>()
        })
        .to_string()
    }

    #[test]
    fn test_parse_page_zips_fields_onto_rows() {
        let page = parse_page(&page_body(1, 1, 1, &[("2024-01-01", "01:00", "20.5")])).unwrap();

        assert_eq!(page.field_names, vec!["deliveryDate", "hourEnding", "busName", "LMP"]);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0]["hourEnding"], "01:00");
        assert_eq!(page.records[0]["busName"], "AMOCO_PUN1");
        assert_eq!(page.total_records, Some(1));
    }

    #[test]
    fn test_parse_page_meta_alias_and_computed_pages() {
        let body = json!({
            "meta": {"totalRecords": 5, "pageSize": 2},
            "fields": [{"name": "LMP"}],
            "data": [[1.0], [2.0]]
        })
        .to_string();

        let page = parse_page(&body).unwrap();
        assert_eq!(page.total_records, Some(5));
        assert_eq!(page.total_pages, Some(3));
    }

    #[test]
    fn test_parse_page_zero_records_is_empty_result() {
        let body = json!({"_meta": {"totalRecords": 0}, "fields": [], "data": []}).to_string();
        assert!(matches!(parse_page(&body), Err(FetchError::EmptyResult)));

        // fields/data may be absent entirely when nothing matched
        let body = json!({"_meta": {"totalRecords": 0}}).to_string();
        assert!(matches!(parse_page(&body), Err(FetchError::EmptyResult)));
    }

    #[test]
    fn test_parse_page_missing_data_is_malformed() {
        let body = json!({"_meta": {"totalRecords": 3}, "fields": [{"name": "LMP"}]}).to_string();
        match parse_page(&body) {
            Err(FetchError::MalformedResponse { detail, present }) => {
                assert!(detail.contains("data"));
                assert_eq!(present, vec!["_meta".to_string(), "fields".to_string()]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_page_non_json() {
        assert!(matches!(
            parse_page("<html>502 Bad Gateway</html>"),
            Err(FetchError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_fetch_single_page_request_shape() {
        let client = FakeHttpClient::new().respond(
            200,
            page_body(2, 1, 1, &[("2024-01-01", "01:00", "20.5"), ("2024-01-01", "02:00", "21")]),
        );
        let fetcher = ReportFetcher::new(&client, "https://api.example.com/reports/", "sub-key");

        let fetched = fetcher.fetch(&DAM_LMP, &token(), "AMOCO_PUN1", &range()).unwrap();
        assert_eq!(fetched.records.len(), 2);
        assert_eq!(fetched.total_records, 2);
        assert_eq!(fetched.pages_fetched, 1);
        assert!(!fetched.truncated);

        let request = client.request(0);
        assert_eq!(request.url, "https://api.example.com/reports/np4-183-cd/dam_hourly_lmp");
        assert_eq!(request.header_value("Authorization"), Some("Bearer tok"));
        assert_eq!(request.header_value(SUBSCRIPTION_KEY_HEADER), Some("sub-key"));
        assert_eq!(request.query_value("busName"), Some("AMOCO_PUN1"));
        assert_eq!(request.query_value("deliveryDateFrom"), Some("2024-01-01"));
        assert_eq!(request.query_value("deliveryDateTo"), Some("2024-01-01"));
        assert_eq!(request.query_value("size"), Some("5000"));
        assert_eq!(request.query_value("page"), Some("1"));
    }

    #[test]
    fn test_fetch_follows_pages() {
        let client = FakeHttpClient::new()
            .respond(200, page_body(3, 2, 1, &[("2024-01-01", "01:00", "1"), ("2024-01-01", "02:00", "2")]))
            .respond(200, page_body(3, 2, 2, &[("2024-01-01", "03:00", "3")]));
        let fetcher = ReportFetcher::new(&client, "http://x", "k").with_page_size(2);

        let fetched = fetcher.fetch(&DAM_LMP, &token(), "AMOCO_PUN1", &range()).unwrap();
        assert_eq!(fetched.records.len(), 3);
        assert_eq!(fetched.pages_fetched, 2);
        assert!(!fetched.truncated);
        assert_eq!(client.request(1).query_value("page"), Some("2"));
        assert_eq!(client.request(1).query_value("size"), Some("2"));
    }

    #[test]
    fn test_fetch_page_cap_flags_truncation() {
        let client = FakeHttpClient::new()
            .respond(200, page_body(6, 3, 1, &[("2024-01-01", "01:00", "1"), ("2024-01-01", "02:00", "2")]));
        let fetcher = ReportFetcher::new(&client, "http://x", "k")
            .with_page_size(2)
            .with_max_pages(1);

        let fetched = fetcher.fetch(&DAM_LMP, &token(), "AMOCO_PUN1", &range()).unwrap();
        assert_eq!(fetched.records.len(), 2);
        assert_eq!(fetched.total_records, 6);
        assert!(fetched.truncated);
        assert_eq!(client.request_count(), 1);
    }

    #[test]
    fn test_fetch_zero_records() {
        let client = FakeHttpClient::new()
            .respond(200, json!({"_meta": {"totalRecords": 0}, "fields": [], "data": []}).to_string());
        let fetcher = ReportFetcher::new(&client, "http://x", "k");

        assert!(matches!(
            fetcher.fetch(&DAM_LMP, &token(), "NOWHERE", &range()),
            Err(FetchError::EmptyResult)
        ));
    }

    #[test]
    fn test_fetch_status_mapping() {
        let client = FakeHttpClient::new()
            .respond(401, "expired")
            .respond(403, "forbidden")
            .respond(429, "slow down")
            .respond(500, "boom")
            .fail("dns failure");
        let fetcher = ReportFetcher::new(&client, "http://x", "k");
        let fetch = || fetcher.fetch(&RTM_LMP, &token(), "BUS1", &range());

        assert!(matches!(fetch(), Err(FetchError::TokenExpired { status: 401 })));
        assert!(matches!(fetch(), Err(FetchError::TokenExpired { status: 403 })));
        assert!(matches!(fetch(), Err(FetchError::RateLimited)));
        match fetch() {
            Err(FetchError::NetworkError { status, body }) => {
                assert_eq!(status, Some(500));
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(fetch(), Err(FetchError::NetworkError { status: None, .. })));
    }

    #[test]
    fn test_fetch_sced_report_uses_timestamp_bounds() {
        let client = FakeHttpClient::new().respond(
            200,
            json!({
                "_meta": {"totalRecords": 1},
                "fields": [{"name": "SCEDTimestamp"}, {"name": "repeatHourFlag"}, {"name": "electricalBus"}, {"name": "LMP"}],
                "data": [["2024-01-01T00:05:16", false, "BUS1", 18.2]]
            })
            .to_string(),
        );
        let fetcher = ReportFetcher::new(&client, "http://x", "k");

        let fetched = fetcher.fetch(&RTM_LMP, &token(), "BUS1", &range()).unwrap();
        assert_eq!(fetched.records[0]["LMP"], 18.2);

        let request = client.request(0);
        assert_eq!(request.query_value("electricalBus"), Some("BUS1"));
        assert_eq!(request.query_value("SCEDTimestampFrom"), Some("2024-01-01T00:00:00"));
        assert_eq!(request.query_value("SCEDTimestampTo"), Some("2024-01-01T23:59:59"));
    }
}
