//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; the defaults run the storefront locally
//! against the production shop API.
//!
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: <http://localhost:3000>)
//! - `AETHER_API_BASE_URL` - Remote shop REST API root (default: <https://thanhbinhnguyen.id.vn/restful>)
//! - `AETHER_API_TIMEOUT_SECS` - Timeout for every remote call (default: 5)
//! - `AETHER_API_CACHE_TTL_SECS` - Catalogue cache lifetime, 0 disables (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default remote shop API root.
pub const DEFAULT_API_BASE_URL: &str = "https://thanhbinhnguyen.id.vn/restful";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Remote shop API configuration
    pub api: ApiConfig,
    /// Sentry DSN for error tracking (contains a project key)
    pub sentry_dsn: Option<SecretString>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Remote shop API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Root URL; endpoint paths are appended to it.
    pub base_url: Url,
    /// Applied to every request, connect through body.
    pub timeout: Duration,
    /// Lifetime of cached catalogue responses. `None` disables caching.
    pub cache_ttl: Option<Duration>,
}

impl ApiConfig {
    /// Configuration pointing at `base_url` with default timeout and caching.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("AETHER_API_BASE_URL", base_url)?,
            timeout: Duration::from_secs(5),
            cache_ttl: Some(Duration::from_secs(60)),
        })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = get("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string()))?;
        let port = get("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string()))?;
        let base_url = get("STOREFRONT_BASE_URL", "http://localhost:3000");

        let api = ApiConfig {
            base_url: parse_base_url(
                "AETHER_API_BASE_URL",
                &get("AETHER_API_BASE_URL", DEFAULT_API_BASE_URL),
            )?,
            timeout: Duration::from_secs(parse_secs(
                "AETHER_API_TIMEOUT_SECS",
                &get("AETHER_API_TIMEOUT_SECS", "5"),
            )?),
            cache_ttl: match parse_secs(
                "AETHER_API_CACHE_TTL_SECS",
                &get("AETHER_API_CACHE_TTL_SECS", "60"),
            )? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        };

        if api.timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "AETHER_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            api,
            sentry_dsn: lookup("SENTRY_DSN")
                .filter(|dsn| !dsn.is_empty())
                .map(SecretString::from),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an API root, making sure it ends with `/` so that `Url::join`
/// appends endpoint paths instead of replacing the last segment.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };
    let url = Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
