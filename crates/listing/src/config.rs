//! Listing configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `CATALOG_BASE_URL` - Remote catalog base URL (default: `https://dummyjson.com`)
//! - `CATALOG_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `CATALOG_FETCH_ALL_PAGE_SIZE` - Page size used to materialize the full catalog (default: 100)
//! - `CATALOG_SEARCH_DEBOUNCE_MS` - Search input quiet period (default: 400)
//! - `CATALOG_SNAPSHOT_TTL_SECS` - Freshness window of the full catalog snapshot (default: 60)
//! - `CATALOG_CATEGORIES_TTL_SECS` - Freshness window of the category list (default: 1800)
//! - `CATALOG_PAGE_CACHE_CAPACITY` - Maximum cached page signatures (default: 1000)
//! - `CATALOG_KEEP_PREVIOUS_PAGE` - Show the previous page while the next one loads (default: true)

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://dummyjson.com";
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 400;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Product listing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Remote catalog base URL, without trailing slash
    pub base_url: String,
    /// Timeout applied to every remote request
    pub request_timeout: Duration,
    /// Page size used by the full-dataset fetcher
    pub fetch_all_page_size: u32,
    /// Quiet period before search text takes effect
    pub search_debounce: Duration,
    /// How long the full catalog snapshot stays fresh
    pub snapshot_ttl: Duration,
    /// How long the category list stays fresh
    pub categories_ttl: Duration,
    /// Maximum number of cached page signatures
    pub page_cache_capacity: u64,
    /// Keep showing the previous server page while the next one loads
    pub keep_previous_page: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            fetch_all_page_size: 100,
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            snapshot_ttl: Duration::from_secs(60),
            categories_ttl: Duration::from_secs(30 * 60),
            page_cache_capacity: 1000,
            keep_previous_page: true,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let base_url = validate_base_url(
            "CATALOG_BASE_URL",
            get_optional_env("CATALOG_BASE_URL").unwrap_or(defaults.base_url),
        )?;
        let request_timeout = Duration::from_secs(parse_or_default(
            "CATALOG_REQUEST_TIMEOUT_SECS",
            get_optional_env("CATALOG_REQUEST_TIMEOUT_SECS"),
            defaults.request_timeout.as_secs(),
        )?);
        let fetch_all_page_size = parse_or_default(
            "CATALOG_FETCH_ALL_PAGE_SIZE",
            get_optional_env("CATALOG_FETCH_ALL_PAGE_SIZE"),
            defaults.fetch_all_page_size,
        )?;
        if fetch_all_page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_FETCH_ALL_PAGE_SIZE".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        let search_debounce = Duration::from_millis(parse_or_default(
            "CATALOG_SEARCH_DEBOUNCE_MS",
            get_optional_env("CATALOG_SEARCH_DEBOUNCE_MS"),
            DEFAULT_SEARCH_DEBOUNCE_MS,
        )?);
        let snapshot_ttl = Duration::from_secs(parse_or_default(
            "CATALOG_SNAPSHOT_TTL_SECS",
            get_optional_env("CATALOG_SNAPSHOT_TTL_SECS"),
            defaults.snapshot_ttl.as_secs(),
        )?);
        let categories_ttl = Duration::from_secs(parse_or_default(
            "CATALOG_CATEGORIES_TTL_SECS",
            get_optional_env("CATALOG_CATEGORIES_TTL_SECS"),
            defaults.categories_ttl.as_secs(),
        )?);
        let page_cache_capacity = parse_or_default(
            "CATALOG_PAGE_CACHE_CAPACITY",
            get_optional_env("CATALOG_PAGE_CACHE_CAPACITY"),
            defaults.page_cache_capacity,
        )?;
        let keep_previous_page = parse_bool_or_default(
            "CATALOG_KEEP_PREVIOUS_PAGE",
            get_optional_env("CATALOG_KEEP_PREVIOUS_PAGE"),
            defaults.keep_previous_page,
        )?;

        Ok(Self {
            base_url,
            request_timeout,
            fetch_all_page_size,
            search_debounce,
            snapshot_ttl,
            categories_ttl,
            page_cache_capacity,
            keep_previous_page,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse a raw value, falling back to `default` when unset.
fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`/`yes`/`no`).
fn parse_bool_or_default(key: &str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Check that the base URL parses and has a host. Trailing slashes are dropped.
fn validate_base_url(key: &str, value: String) -> Result<String, ConfigError> {
    let url =
        Url::parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "base URL must have a host".to_string(),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}
