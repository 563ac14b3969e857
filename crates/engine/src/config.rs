//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `TABLECRM_API_URL` - Base URL of the TableCRM API (default: `https://app.tablecrm.com/api/v1`)
//! - `TABLECRM_CUSTOMER_PAGE_SIZE` - Customers fetched per page (default: 20)
//! - `TABLECRM_TOKEN_FILE` - File the access token is persisted to between runs
//! - `TABLECRM_LOG_JSON` - Emit JSON logs (`true`/`false`, default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Default TableCRM API endpoint.
pub const DEFAULT_API_URL: &str = "https://app.tablecrm.com/api/v1";

/// Default number of customers fetched per page.
pub const DEFAULT_CUSTOMER_PAGE_SIZE: u32 = 20;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Point-of-sale engine configuration.
#[derive(Debug, Clone)]
pub struct PosConfig {
    /// TableCRM API base URL, always ending with `/`
    pub api_url: Url,
    /// Customers fetched per page
    pub customer_page_size: u32,
    /// Where the access token is persisted, if anywhere
    pub token_file: Option<PathBuf>,
    /// Emit logs as JSON
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl PosConfig {
    /// Configuration pointing at `api_url` with every optional setting at its default.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url: normalize_api_url(api_url),
            customer_page_size: DEFAULT_CUSTOMER_PAGE_SIZE,
            token_file: None,
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_env_or_default("TABLECRM_API_URL", DEFAULT_API_URL))?;
        let customer_page_size = parse_page_size(&get_env_or_default(
            "TABLECRM_CUSTOMER_PAGE_SIZE",
            &DEFAULT_CUSTOMER_PAGE_SIZE.to_string(),
        ))?;
        let token_file = get_optional_env("TABLECRM_TOKEN_FILE").map(PathBuf::from);
        let log_json = parse_bool("TABLECRM_LOG_JSON", &get_env_or_default("TABLECRM_LOG_JSON", "false"))?;

        Ok(Self {
            api_url,
            customer_page_size,
            token_file,
            log_json,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Use a different API base URL (for tests and staging backends).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `url` is not an absolute http(s) URL.
    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url(url)?;
        Ok(self)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse the API base URL, normalizing it to end with a slash so that
/// `Url::join` appends endpoint paths instead of replacing the last segment.
fn parse_api_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("TABLECRM_API_URL".to_string(), msg);

    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(normalize_api_url(url))
}

fn normalize_api_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn parse_page_size(value: &str) -> Result<u32, ConfigError> {
    let invalid =
        |msg: String| ConfigError::InvalidEnvVar("TABLECRM_CUSTOMER_PAGE_SIZE".to_string(), msg);

    let size = value.trim().parse::<u32>().map_err(|e| invalid(e.to_string()))?;
    if size == 0 {
        return Err(invalid("must be at least 1".to_string()));
    }
    Ok(size)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "" | "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}
