//! Session context for the retrieval pipeline
//!
//! A [`Session`] owns everything that outlives a single fetch: the transport,
//! the cached bearer token and the memoized query results. Each call to
//! [`Session::run_query`] runs token → fetch → normalize → resample for one
//! user-initiated query.
//!
//! # Token lifecycle
//!
//! The token is obtained on the first query and reused until the report API
//! rejects it (HTTP 401/403). That query fails with
//! [`FetchError::TokenExpired`] and the token is dropped, so the next query
//! authenticates again. Nothing is retried automatically.
//!
//! # Memoization
//!
//! Normalized series are cached by `(report, date range, location, price
//! field)` until [`Session::invalidate_cache`] or [`Session::clear`].
//! Resampling is applied on top of the cached series, so toggling it never
//! triggers a new fetch.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, FetchError, QueryError};
use crate::fetcher::ReportFetcher;
use crate::http::HttpClient;
use crate::normalizer::normalize_report;
use crate::oauth2::{AccessToken, TokenProvider};
use crate::reports::{DateRange, ReportKind};
use crate::resample::resample_hourly;
use crate::types::CanonicalSeries;

/// One user-initiated query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub report: ReportKind,
    pub location: String,
    pub range: DateRange,

    /// Resample sub-hourly reports to hourly means (ignored for hourly reports)
    pub resample: bool,
}

impl ReportQuery {
    pub fn new(report: ReportKind, location: &str, range: DateRange) -> Self {
        Self {
            report,
            location: location.trim().to_string(),
            range,
            resample: true,
        }
    }

    pub fn with_resample(mut self, resample: bool) -> Self {
        self.resample = resample;
        self
    }
}

/// How complete a query result is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    /// Every record the server reported was received
    Complete,

    /// The server reported zero records for the selection
    NoRecords,

    /// The page cap was hit before all records arrived
    Truncated { fetched: u64, total: u64 },
}

/// Result of [`Session::run_query`]
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub query: ReportQuery,
    pub series: CanonicalSeries,
    pub status: FetchStatus,

    /// True when `series` was resampled to hourly means
    pub resampled: bool,

    /// True when served from the memo cache without a network call
    pub from_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueryKey {
    report: ReportKind,
    range: DateRange,
    location: String,
    price_field: &'static str,
}

#[derive(Debug, Clone)]
struct CachedFetch {
    series: CanonicalSeries,
    status: FetchStatus,
}

/// Pipeline session
///
/// Created with a configuration and a transport; dropping it ends the session.
pub struct Session<C: HttpClient> {
    /// Endpoints, credentials and paging limits
    config: Config,

    /// Transport shared by the token provider and the fetcher
    client: C,

    provider: TokenProvider,

    /// Bearer token, cached until rejected or cleared
    token: Option<AccessToken>,

    /// Normalized (pre-resample) series per query key
    cache: HashMap<QueryKey, CachedFetch>,

    last_query: Option<ReportQuery>,
    last_result: Option<QueryResult>,
}

impl<C: HttpClient> Session<C> {
    pub fn new(config: Config, client: C) -> Self {
        let provider = TokenProvider::new(&config.token_url);
        Self {
            config,
            client,
            provider,
            token: None,
            cache: HashMap::new(),
            last_query: None,
            last_result: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True while a bearer token is cached
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Number of memoized queries
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }

    pub fn last_query(&self) -> Option<&ReportQuery> {
        self.last_query.as_ref()
    }

    pub fn last_result(&self) -> Option<&QueryResult> {
        self.last_result.as_ref()
    }

    /// Drop all memoized results; the token is kept
    pub fn invalidate_cache(&mut self) {
        debug!(entries = self.cache.len(), "Invalidating query cache");
        self.cache.clear();
    }

    /// Reset the session: token, cache, last query and last result
    pub fn clear(&mut self) {
        self.token = None;
        self.cache.clear();
        self.last_query = None;
        self.last_result = None;
    }

    /// Run one query through the pipeline
    ///
    /// # Returns
    ///
    /// * `Ok(QueryResult)` - including `FetchStatus::NoRecords` with an empty series
    /// * `Err(Error::Query)` - empty location
    /// * `Err(Error::Auth)` - token exchange failed
    /// * `Err(Error::Fetch)` - report request failed; on `TokenExpired` the
    ///   cached token has been dropped
    /// * `Err(Error::Normalize)` - unrecognized report layout
    pub fn run_query(&mut self, query: &ReportQuery) -> Result<QueryResult, Error> {
        if query.location.trim().is_empty() {
            return Err(QueryError::EmptyLocation.into());
        }

        let report = query.report.descriptor();
        let key = QueryKey {
            report: query.report,
            range: query.range,
            location: query.location.clone(),
            price_field: report.price_field,
        };

        self.last_query = Some(query.clone());
        self.last_result = None;

        let (cached, from_cache) = match self.cache.get(&key) {
            Some(cached) => {
                debug!(report = report.id, location = %query.location, "Serving query from cache");
                (cached.clone(), true)
            }
            None => {
                let fetched = self.fetch_and_normalize(query)?;
                self.cache.insert(key, fetched.clone());
                (fetched, false)
            }
        };

        let resampled = query.resample && report.is_sub_hourly();
        let series = if resampled {
            resample_hourly(&cached.series)
        } else {
            cached.series
        };

        info!(
            report = report.id,
            location = %query.location,
            samples = series.len(),
            resampled,
            from_cache,
            status = ?cached.status,
            "Query complete"
        );

        let result = QueryResult {
            query: query.clone(),
            series,
            status: cached.status,
            resampled,
            from_cache,
        };
        self.last_result = Some(result.clone());
        Ok(result)
    }

    fn fetch_and_normalize(&mut self, query: &ReportQuery) -> Result<CachedFetch, Error> {
        let report = query.report.descriptor();

        let token = match self.token.take() {
            Some(token) => token,
            None => self
                .provider
                .obtain_token(&self.client, &self.config.credentials)?,
        };

        let outcome = ReportFetcher::from_config(&self.client, &self.config).fetch(
            report,
            &token,
            &query.location,
            &query.range,
        );

        if let Err(FetchError::TokenExpired { status }) = &outcome {
            warn!(status, "Access token rejected; it will be re-acquired on the next query");
            return Err(FetchError::TokenExpired { status: *status }.into());
        }
        self.token = Some(token);

        match outcome {
            Ok(fetched) => {
                let series = normalize_report(&fetched.records, report)?;
                let status = if fetched.truncated {
                    FetchStatus::Truncated {
                        fetched: fetched.records.len() as u64,
                        total: fetched.total_records,
                    }
                } else {
                    FetchStatus::Complete
                };
                Ok(CachedFetch { series, status })
            }
            Err(FetchError::EmptyResult) => {
                info!(report = report.id, location = %query.location, "No records for this selection");
                Ok(CachedFetch {
                    series: CanonicalSeries::empty(report.price_field),
                    status: FetchStatus::NoRecords,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}
