//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_API_BASE_URL` - Base URL of the commerce REST API
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_API_TOKEN` - Bearer token sent with admin API calls
//! - `STOREFRONT_API_TIMEOUT_SECS` - Per-request API timeout (default: 30)
//! - `STOREFRONT_CACHE_TTL_SECS` - Catalog cache lifetime (default: 60)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` URL for persistent sessions
//!   (falls back to `DATABASE_URL`; in-memory sessions when neither is set)
//! - `STOREFRONT_TRUST_PROXY_HEADERS` - Key the login rate limit on the
//!   proxy-appended `X-Forwarded-For` hop instead of the peer address
//!   (default: false; enable only behind a reverse proxy)
//! - `STRIPE_PUBLISHABLE_KEY` - Publishable key for the payment widget
//! - `ADMIN_EMAIL` - Admin console login email
//! - `ADMIN_PASSWORD_HASH` - Argon2 PHC hash of the admin password
//!   (generate with `digistore-cli admin hash-password`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use digistore_core::Email;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
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
    /// Commerce REST API configuration
    pub api: ApiConfig,
    /// `PostgreSQL` URL for the session store, if sessions should survive restarts
    pub database_url: Option<SecretString>,
    /// Whether a reverse proxy in front of us sets `X-Forwarded-For`
    pub trust_proxy_headers: bool,
    /// Payment widget configuration
    pub payments: PaymentConfig,
    /// Admin console credentials
    pub admin: AdminConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Commerce REST API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://api.example.com/api`
    pub base_url: Url,
    /// Optional bearer token for admin mutations
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long product and category lists are cached
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// Payment widget configuration.
#[derive(Debug, Clone, Default)]
pub struct PaymentConfig {
    /// Publishable (browser-safe) key; checkout is disabled without it
    pub publishable_key: Option<String>,
}

/// Admin console credentials.
///
/// Implements `Debug` manually to redact the password hash.
#[derive(Clone, Default)]
pub struct AdminConfig {
    /// Email the admin logs in with
    pub email: Option<Email>,
    /// Argon2 PHC string for the admin password
    pub password_hash: Option<SecretString>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl AdminConfig {
    /// Whether both an email and a password hash are configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.email.is_some() && self.password_hash.is_some()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        Ok(Self {
            host,
            port,
            base_url,
            api: ApiConfig::from_env()?,
            database_url: get_database_url("STOREFRONT_DATABASE_URL"),
            trust_proxy_headers: parse_env("STOREFRONT_TRUST_PROXY_HEADERS", "false")?,
            payments: PaymentConfig {
                publishable_key: get_optional_env("STRIPE_PUBLISHABLE_KEY"),
            },
            admin: AdminConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Build a configuration with defaults for everything but the two URLs.
    ///
    /// Used by tests and tooling that do not read the environment.
    #[must_use]
    pub fn new(base_url: &str, api_base_url: Url) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: base_url.to_string(),
            api: ApiConfig {
                base_url: api_base_url,
                token: None,
                timeout: Duration::from_secs(30),
                cache_ttl: Duration::from_secs(60),
            },
            database_url: None,
            trust_proxy_headers: false,
            payments: PaymentConfig::default(),
            admin: AdminConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
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

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("STOREFRONT_API_BASE_URL")?;
        let base_url = parse_base_url(&raw).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_API_BASE_URL".to_string(), e.to_string())
        })?;

        let token = match get_optional_env("STOREFRONT_API_TOKEN") {
            Some(value) => {
                validate_secret_strength(&value, "STOREFRONT_API_TOKEN")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self {
            base_url,
            token,
            timeout: Duration::from_secs(parse_env("STOREFRONT_API_TIMEOUT_SECS", "30")?),
            cache_ttl: Duration::from_secs(parse_env("STOREFRONT_CACHE_TTL_SECS", "60")?),
        })
    }
}

impl AdminConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let email = get_optional_env("ADMIN_EMAIL")
            .map(|raw| {
                Email::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("ADMIN_EMAIL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let password_hash = get_optional_env("ADMIN_PASSWORD_HASH")
            .map(|hash| {
                if hash.starts_with("$argon2") {
                    Ok(SecretString::from(hash))
                } else {
                    Err(ConfigError::InvalidEnvVar(
                        "ADMIN_PASSWORD_HASH".to_string(),
                        "expected an Argon2 PHC string (see `digistore-cli admin hash-password`)"
                            .to_string(),
                    ))
                }
            })
            .transpose()?;

        Ok(Self {
            email,
            password_hash,
        })
    }
}

/// Parse the API base URL, ensuring a trailing slash so relative joins keep
/// any path prefix (`/api` + `products` = `/api/products`).
///
/// # Errors
///
/// Returns `url::ParseError` if the URL is malformed.
pub fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{trimmed}/"))
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

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key)
        .as_deref()
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= \
                 {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Expose a secret for an outgoing header.
pub(crate) fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}
