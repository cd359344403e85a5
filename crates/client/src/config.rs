//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPFRONT_API_URL` - Backend base URL (default: `http://localhost:3000`)
//! - `SHOPFRONT_STATE_FILE` - Durable storage document (default: `.shopfront/storage.json`)
//! - `SHOPFRONT_CATALOG_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `SHOPFRONT_POLL_INTERVAL_MS` - How often to look for changes made by
//!   other processes (default: 500)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_STATE_FILE: &str = ".shopfront/storage.json";
const DEFAULT_CATALOG_TTL_SECS: u64 = 300;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, always ending in `/`
    pub api_url: Url,
    /// JSON document backing durable storage
    pub state_file: PathBuf,
    /// Lifetime of cached catalog responses
    pub catalog_ttl: Duration,
    /// Interval between checks for changes made by other processes
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(&format!("{DEFAULT_API_URL}/")).unwrap_or_else(|_| {
                unreachable!("default API URL is a valid URL")
            }),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            catalog_ttl: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_env_or_default("SHOPFRONT_API_URL", DEFAULT_API_URL))
            .map_err(|e| ConfigError::InvalidEnvVar("SHOPFRONT_API_URL".to_string(), e))?;
        let state_file = PathBuf::from(get_env_or_default("SHOPFRONT_STATE_FILE", DEFAULT_STATE_FILE));
        let catalog_ttl = Duration::from_secs(parse_env(
            "SHOPFRONT_CATALOG_TTL_SECS",
            DEFAULT_CATALOG_TTL_SECS,
        )?);
        let poll_interval = Duration::from_millis(parse_env(
            "SHOPFRONT_POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL_MS,
        )?);

        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFRONT_POLL_INTERVAL_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            state_file,
            catalog_ttl,
            poll_interval,
        })
    }

    /// Point the client at a different backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `url` is not an absolute http(s) URL.
    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url(url)
            .map_err(|e| ConfigError::InvalidEnvVar("api_url".to_string(), e))?;
        Ok(self)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a backend URL, ensuring the path ends in `/` so endpoints join
/// beneath it rather than replacing its last segment.
fn parse_api_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {}", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
