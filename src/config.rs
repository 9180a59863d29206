//! Startup configuration
//!
//! The three ERCOT API secrets (identity username, password and subscription
//! key) must be present in the environment when the process starts; missing
//! any of them is fatal. Endpoint URLs and paging limits have defaults that
//! can be overridden for testing or for a proxy.
//!
//! | Variable                      | Required | Default                                      |
//! |-------------------------------|----------|----------------------------------------------|
//! | `ERCOT_API_USERNAME`          | yes      |                                              |
//! | `ERCOT_API_PASSWORD`          | yes      |                                              |
//! | `ERCOT_API_SUBSCRIPTION_KEY`  | yes      |                                              |
//! | `ERCOT_API_BASE_URL`          | no       | `https://api.ercot.com/api/public-reports`   |
//! | `ERCOT_TOKEN_URL`             | no       | ERCOT B2C ROPC token endpoint                |
//! | `ERCOT_PAGE_SIZE`             | no       | `5000`                                       |
//! | `ERCOT_MAX_PAGES`             | no       | `100`                                        |
//! | `ERCOT_HTTP_TIMEOUT_SECS`     | no       | transport default                            |

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const ENV_USERNAME: &str = "ERCOT_API_USERNAME";
pub const ENV_PASSWORD: &str = "ERCOT_API_PASSWORD";
pub const ENV_SUBSCRIPTION_KEY: &str = "ERCOT_API_SUBSCRIPTION_KEY";
pub const ENV_BASE_URL: &str = "ERCOT_API_BASE_URL";
pub const ENV_TOKEN_URL: &str = "ERCOT_TOKEN_URL";
pub const ENV_PAGE_SIZE: &str = "ERCOT_PAGE_SIZE";
pub const ENV_MAX_PAGES: &str = "ERCOT_MAX_PAGES";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "ERCOT_HTTP_TIMEOUT_SECS";

/// Public reports API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.ercot.com/api/public-reports";

/// ERCOT's Azure AD B2C resource-owner-password token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://ercotb2c.b2clogin.com/ercotb2c.onmicrosoft.com/B2C_1_PUBAPI-ROPC-FLOW/oauth2/v2.0/token";

/// Rows requested per page
pub const DEFAULT_PAGE_SIZE: usize = 5000;

/// Upper bound on pages fetched for one query
pub const DEFAULT_MAX_PAGES: u64 = 100;

/// Operator credentials for the password-grant token exchange
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub subscription_key: SecretString,
}

/// Full runtime configuration
#[derive(Debug)]
pub struct Config {
    pub credentials: Credentials,
    pub base_url: String,
    pub token_url: String,
    pub page_size: usize,
    pub max_pages: u64,
    /// `None` keeps the transport default
    pub http_timeout: Option<Duration>,
}

impl Config {
    /// Configuration with default endpoints and limits
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            http_timeout: None,
        }
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require =
            |name: &str| get(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()));

        let credentials = Credentials {
            username: require(ENV_USERNAME)?,
            password: SecretString::new(require(ENV_PASSWORD)?.into()),
            subscription_key: SecretString::new(require(ENV_SUBSCRIPTION_KEY)?.into()),
        };

        let mut config = Self::new(credentials);

        if let Some(url) = get(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Some(url) = get(ENV_TOKEN_URL) {
            config.token_url = url;
        }
        if let Some(raw) = get(ENV_PAGE_SIZE) {
            config.page_size = parse_positive(ENV_PAGE_SIZE, &raw)?;
        }
        if let Some(raw) = get(ENV_MAX_PAGES) {
            config.max_pages = parse_positive(ENV_MAX_PAGES, &raw)?;
        }
        if let Some(raw) = get(ENV_HTTP_TIMEOUT_SECS) {
            let secs: u64 = parse_positive(ENV_HTTP_TIMEOUT_SECS, &raw)?;
            config.http_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn parse_positive<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const SECRETS: [(&str, &str); 3] = [
        (ENV_USERNAME, "trader@example.com"),
        (ENV_PASSWORD, "hunter2"),
        (ENV_SUBSCRIPTION_KEY, "sub-key"),
    ];

    #[test]
    fn test_defaults_with_required_secrets() {
        let config = Config::from_lookup(env(&SECRETS)).unwrap();

        assert_eq!(config.credentials.username, "trader@example.com");
        assert_eq!(config.credentials.password.expose_secret(), "hunter2");
        assert_eq!(config.credentials.subscription_key.expose_secret(), "sub-key");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.page_size, 5000);
        assert_eq!(config.max_pages, 100);
        assert_eq!(config.http_timeout, None);
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        for missing in [ENV_USERNAME, ENV_PASSWORD, ENV_SUBSCRIPTION_KEY] {
            let pairs: Vec<(&str, &str)> =
                SECRETS.iter().copied().filter(|(k, _)| *k != missing).collect();
            match Config::from_lookup(env(&pairs)) {
                Err(ConfigError::MissingEnvVar(name)) => assert_eq!(name, missing),
                other => panic!("expected MissingEnvVar for {}, got {:?}", missing, other),
            }
        }
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let mut pairs = SECRETS.to_vec();
        pairs[1] = (ENV_PASSWORD, "   ");
        assert!(matches!(
            Config::from_lookup(env(&pairs)),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = SECRETS.to_vec();
        pairs.extend([
            (ENV_BASE_URL, "http://127.0.0.1:9000/reports"),
            (ENV_TOKEN_URL, "http://127.0.0.1:9000/token"),
            (ENV_PAGE_SIZE, "250"),
            (ENV_MAX_PAGES, "3"),
            (ENV_HTTP_TIMEOUT_SECS, "30"),
        ]);

        let config = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000/reports");
        assert_eq!(config.token_url, "http://127.0.0.1:9000/token");
        assert_eq!(config.page_size, 250);
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.http_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_numeric_override() {
        let mut pairs = SECRETS.to_vec();
        pairs.push((ENV_PAGE_SIZE, "0"));
        assert!(matches!(
            Config::from_lookup(env(&pairs)),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut pairs = SECRETS.to_vec();
        pairs.push((ENV_MAX_PAGES, "many"));
        match Config::from_lookup(env(&pairs)) {
            Err(ConfigError::InvalidValue { name, value }) => {
                assert_eq!(name, ENV_MAX_PAGES);
                assert_eq!(value, "many");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }
}
