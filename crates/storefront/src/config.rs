//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MYSTERY_BOX_BACKEND_URL` - Base URL of the commerce backend (e.g. `https://api.example.com`)
//!
//! ## Optional
//! - `MYSTERY_BOX_PUBLISHABLE_KEY` - Publishable API key sent with every store request
//! - `MYSTERY_BOX_REGION_ID` - Region new carts are created in
//! - `MYSTERY_BOX_DATA_DIR` - Directory for locally persisted state (default: `.mystery-box`)
//! - `MYSTERY_BOX_PAGE_SIZE` - Products per listing page (default: 12)
//! - `MYSTERY_BOX_REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: 15)
//! - `MYSTERY_BOX_CACHE_TTL_SECS` - Catalog cache TTL, 0 disables caching (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_PAGE_SIZE: usize = 12;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_DATA_DIR: &str = ".mystery-box";

/// Blocklist of placeholder patterns copied out of sample `.env` files (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront configuration.
///
/// Implements `Debug` manually to redact the publishable key.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Commerce backend base URL
    pub backend_url: Url,
    /// Publishable API key, if the backend requires one
    pub publishable_key: Option<SecretString>,
    /// Region new carts are created in (backend default when unset)
    pub region_id: Option<String>,
    /// Directory holding the persisted cart id, wishlist and session
    pub data_dir: PathBuf,
    /// Products per listing page
    pub page_size: usize,
    /// Per-request timeout for backend calls
    pub request_timeout: Duration,
    /// Time-to-live for cached catalog reads (zero disables the cache)
    pub cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("backend_url", &self.backend_url.as_str())
            .field(
                "publishable_key",
                &self.publishable_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("region_id", &self.region_id)
            .field("data_dir", &self.data_dir)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .field("cache_ttl", &self.cache_ttl)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[SET]"))
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the publishable key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend_url = parse_backend_url(&get_required_env("MYSTERY_BOX_BACKEND_URL")?)?;

        let publishable_key = get_optional_env("MYSTERY_BOX_PUBLISHABLE_KEY")
            .map(|key| {
                validate_not_placeholder(&key, "MYSTERY_BOX_PUBLISHABLE_KEY")?;
                Ok::<_, ConfigError>(SecretString::from(key))
            })
            .transpose()?;

        let page_size = parse_env_or_default("MYSTERY_BOX_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MYSTERY_BOX_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let request_timeout = Duration::from_secs(parse_env_or_default(
            "MYSTERY_BOX_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let cache_ttl = Duration::from_secs(parse_env_or_default(
            "MYSTERY_BOX_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )?);

        Ok(Self {
            backend_url,
            publishable_key,
            region_id: get_optional_env("MYSTERY_BOX_REGION_ID"),
            data_dir: PathBuf::from(get_env_or_default("MYSTERY_BOX_DATA_DIR", DEFAULT_DATA_DIR)),
            page_size,
            request_timeout,
            cache_ttl,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Configuration pointing at `backend_url` with every optional setting at
    /// its default. Used by tests and embedding applications.
    #[must_use]
    pub fn for_backend(backend_url: Url) -> Self {
        Self {
            backend_url,
            publishable_key: None,
            region_id: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            sentry_dsn: None,
        }
    }

    /// The publishable key, exposed for use in a request header.
    #[must_use]
    pub fn publishable_key(&self) -> Option<&str> {
        self.publishable_key.as_ref().map(|key| key.expose_secret())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse the backend URL, requiring an http(s) scheme.
///
/// A trailing slash is enforced so relative endpoint paths join below it.
fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("MYSTERY_BOX_BACKEND_URL".into(), msg);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Reject values that were obviously copied from a sample `.env`.
fn validate_not_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }
    Ok(())
}
