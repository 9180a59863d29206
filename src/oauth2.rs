//! OAuth2 token provider for the ERCOT public API
//!
//! Implements the resource-owner password grant against ERCOT's Azure AD B2C
//! identity provider.
//!
//! # Behaviour
//! - Exactly one HTTP exchange per call, never retried
//! - `id_token` is used as the bearer token (ERCOT's documented flow);
//!   `access_token` is accepted as a fallback
//! - No expiry tracking: the caller ([`crate::session::Session`]) caches the
//!   token for the session and drops it when a report call rejects it
//!
//! # Example
//! ```rust,no_run
//! use ercot_prices::config::Config;
//! use ercot_prices::http::ReqwestHttpClient;
//! use ercot_prices::oauth2::TokenProvider;
//!
//! let config = Config::from_env()?;
//! let client = ReqwestHttpClient::new(None)?;
//! let provider = TokenProvider::new(&config.token_url);
//! let token = provider.obtain_token(&client, &config.credentials)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Credentials;
use crate::error::AuthError;
use crate::http::{HttpClient, Request};

/// Public client ID of ERCOT's API Explorer application
pub const ERCOT_CLIENT_ID: &str = "fec253ea-0d06-4272-a5e6-b478baeecd70";

/// Scope requested with the password grant
pub const ERCOT_SCOPE: &str = "openid fec253ea-0d06-4272-a5e6-b478baeecd70 offline_access";

/// Bearer token for report requests
///
/// The token value is kept secret and redacted from `Debug` output.
pub struct AccessToken {
    token: SecretString,

    /// Lifetime reported by the identity provider, informational only
    pub expires_in_secs: Option<u64>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into().into()),
            expires_in_secs: None,
        }
    }

    /// Value for the `Authorization` header
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }

    /// Token length, for logging without revealing the token
    pub fn len(&self) -> usize {
        self.token.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// Token response from the identity provider
///
/// B2C returns `expires_in` as a string; numbers are accepted too.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,

    #[serde(default)]
    access_token: Option<String>,

    #[serde(default)]
    token_type: Option<String>,

    #[serde(default)]
    expires_in: Option<Value>,
}

impl TokenResponse {
    fn bearer(&self) -> Option<&str> {
        self.id_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.access_token.as_deref().filter(|t| !t.is_empty()))
    }

    fn expires_in_secs(&self) -> Option<u64> {
        match self.expires_in.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Exchanges operator credentials for a bearer token
#[derive(Debug, Clone)]
pub struct TokenProvider {
    token_url: String,
    client_id: String,
    scope: String,
}

impl TokenProvider {
    /// Provider for a token endpoint using ERCOT's public client ID and scope
    pub fn new(token_url: &str) -> Self {
        Self {
            token_url: token_url.to_string(),
            client_id: ERCOT_CLIENT_ID.to_string(),
            scope: ERCOT_SCOPE.to_string(),
        }
    }

    /// Build the form-urlencoded password-grant body
    fn form_body(&self, credentials: &Credentials) -> String {
        let pairs = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose_secret()),
            ("grant_type", "password"),
            ("scope", self.scope.as_str()),
            ("client_id", self.client_id.as_str()),
            ("response_type", "id_token"),
        ];

        pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Exchange credentials for a bearer token
    ///
    /// # Returns
    /// - `Ok(AccessToken)` - token ready for report requests
    /// - `Err(AuthError::InvalidCredentials)` - HTTP 400/401 from the identity provider
    /// - `Err(AuthError::FetchFailed)` - transport failure (status 0) or other non-2xx status
    /// - `Err(AuthError::InvalidTokenResponse)` - body is not JSON or carries no token
    pub fn obtain_token<C: HttpClient>(
        &self,
        client: &C,
        credentials: &Credentials,
    ) -> Result<AccessToken, AuthError> {
        let request = Request::post(&self.token_url, self.form_body(credentials))
            .header("content-type", "application/x-www-form-urlencoded")
            .header("accept", "application/json");

        debug!(url = %self.token_url, "Requesting ERCOT access token");

        let response = client
            .send(&request)
            .map_err(|err| AuthError::FetchFailed { status: 0, body: err })?;

        if !response.is_success() {
            return match response.status_code {
                400 | 401 => Err(AuthError::InvalidCredentials {
                    status: response.status_code,
                    body: response.body,
                }),
                status => Err(AuthError::FetchFailed {
                    status,
                    body: response.body,
                }),
            };
        }

        let token_response: TokenResponse =
            serde_json::from_str(&response.body).map_err(|err| {
                AuthError::InvalidTokenResponse(format!(
                    "Failed to parse token response: {}. Body: {}",
                    err, response.body
                ))
            })?;

        let bearer = token_response.bearer().ok_or_else(|| {
            AuthError::InvalidTokenResponse(
                "response has neither id_token nor access_token".to_string(),
            )
        })?;

        let mut token = AccessToken::new(bearer);
        token.expires_in_secs = token_response.expires_in_secs();

        info!(
            token_len = token.len(),
            token_type = token_response.token_type.as_deref().unwrap_or("Bearer"),
            expires_in = ?token.expires_in_secs,
            "Obtained ERCOT access token"
        );

        Ok(token)
    }
}
