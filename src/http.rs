//! HTTP transport
//!
//! The token provider and the report fetcher only ever see [`Request`] and
//! [`Response`]; the [`HttpClient`] trait is the seam between them and the
//! network. [`ReqwestHttpClient`] is the production implementation on top of
//! `reqwest::blocking`. Calls block the caller and are never retried.

use std::time::Duration;

use tracing::debug;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Outgoing HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Query string parameters (URL-encoded by the transport)
    pub query: Vec<(String, String)>,
    pub body: String,
}

impl Request {
    /// GET request with no headers, query or body
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: String::new(),
        }
    }

    /// POST request with the given body
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a header
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Replace the query parameters
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Look up a header value (case-insensitive name match)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Look up a query parameter value
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP response: status and body only
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status_code: u16,
    pub body: String,
}

impl Response {
    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Blocking HTTP transport
///
/// `Err` means no response was received at all (DNS, connect, TLS, timeout);
/// any status code, including errors, comes back as `Ok(Response)`.
pub trait HttpClient {
    fn send(&self, request: &Request) -> Result<Response, String>;
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn send(&self, request: &Request) -> Result<Response, String> {
        (**self).send(request)
    }
}

/// `reqwest::blocking` implementation of [`HttpClient`]
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::blocking::Client,
}

impl ReqwestHttpClient {
    /// Build a client, optionally with a request timeout
    ///
    /// Without a timeout the transport default applies.
    pub fn new(timeout: Option<Duration>) -> Result<Self, String> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestHttpClient {
    fn send(&self, request: &Request) -> Result<Response, String> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url).body(request.body.clone()),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!(method = ?request.method, url = %request.url, "Sending HTTP request");

        let response = builder
            .send()
            .map_err(|e| format!("{:?} {} failed: {}", request.method, request.url, e))?;
        let status_code = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| format!("Failed to read response body from {}: {}", request.url, e))?;

        debug!(status = status_code, bytes = body.len(), "HTTP response received");

        Ok(Response { status_code, body })
    }
}
