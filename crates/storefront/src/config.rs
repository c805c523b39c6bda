//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL of the storefront UI (used for payment return URLs)
//! - `PAYMENT_SERVICE_URL` - Base URL of the payment provider
//! - `PAYMENT_WEBHOOK_SECRET` - HMAC secret for provider callbacks (min 32 chars, high entropy)
//! - `STOREFRONT_REDIS_URL` - Redis URL (falls back to `REDIS_URL`), unless the cart backend is `memory`
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_CART_BACKEND` - `redis` (default) or `memory`
//! - `STOREFRONT_CART_TTL_SECONDS` - Cart lifetime, refreshed on every write (default: 86400)
//! - `STOREFRONT_CORS_ORIGIN` - Origin of the storefront UI allowed to call the API
//! - `STOREFRONT_RATE_LIMIT` - Set to `false` to disable rate limiting (default: true)
//! - `LOG_FORMAT` - `json` for structured logs
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_WEBHOOK_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_CART_TTL_SECONDS: u64 = 24 * 60 * 60;

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
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where carts are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartBackend {
    Redis,
    /// In-process map; carts are lost on restart.
    Memory,
}

impl FromStr for CartBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected `redis` or `memory`, got `{other}`")),
        }
    }
}

/// Cart store settings.
#[derive(Clone)]
pub struct CartConfig {
    pub backend: CartBackend,
    /// Redis connection URL (may contain a password).
    pub redis_url: Option<SecretString>,
    pub ttl: Duration,
}

impl std::fmt::Debug for CartConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartConfig")
            .field("backend", &self.backend)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Payment provider settings.
///
/// Implements `Debug` manually to redact the webhook secret.
#[derive(Clone)]
pub struct PaymentConfig {
    pub service_url: Url,
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("service_url", &self.service_url.as_str())
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the storefront UI
    pub base_url: String,
    pub cart: CartConfig,
    pub payment: PaymentConfig,
    /// Origin allowed by CORS, if the UI is served from another host
    pub cors_origin: Option<String>,
    pub rate_limit: bool,
    /// Emit JSON logs instead of human-readable ones
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_with_fallback("STOREFRONT_DATABASE_URL", "DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let cart = CartConfig::from_env()?;
        let payment = PaymentConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            cart,
            payment,
            cors_origin: get_optional_env("STOREFRONT_CORS_ORIGIN"),
            rate_limit: parse_env("STOREFRONT_RATE_LIMIT", "true")?,
            log_json: get_optional_env("LOG_FORMAT").is_some_and(|v| v == "json"),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl CartConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend: CartBackend = parse_env("STOREFRONT_CART_BACKEND", "redis")?;
        let redis_url = match backend {
            CartBackend::Redis => Some(get_with_fallback("STOREFRONT_REDIS_URL", "REDIS_URL")?),
            CartBackend::Memory => None,
        };
        let ttl_seconds: u64 = parse_env(
            "STOREFRONT_CART_TTL_SECONDS",
            &DEFAULT_CART_TTL_SECONDS.to_string(),
        )?;
        if ttl_seconds == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_CART_TTL_SECONDS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            backend,
            redis_url,
            ttl: Duration::from_secs(ttl_seconds),
        })
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let service_url = get_required_env("PAYMENT_SERVICE_URL")?;
        let service_url = Url::parse(&service_url).map_err(|e| {
            ConfigError::InvalidEnvVar("PAYMENT_SERVICE_URL".to_string(), e.to_string())
        })?;
        let webhook_secret = get_validated_secret("PAYMENT_WEBHOOK_SECRET")?;
        validate_secret_length(&webhook_secret, "PAYMENT_WEBHOOK_SECRET")?;
        Ok(Self {
            service_url,
            webhook_secret,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a secret with fallback to a generic variable (e.g. `DATABASE_URL`).
fn get_with_fallback(primary_key: &str, fallback_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var(fallback_key))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, using `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_WEBHOOK_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_WEBHOOK_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:5173".to_string(),
            cart: CartConfig {
                backend: CartBackend::Redis,
                redis_url: Some(SecretString::from("redis://:hunter2@localhost:6379")),
                ttl: Duration::from_secs(DEFAULT_CART_TTL_SECONDS),
            },
            payment: PaymentConfig {
                service_url: Url::parse("http://localhost:4000").unwrap(),
                webhook_secret: SecretString::from("super_private_webhook_value"),
            },
            cors_origin: None,
            rate_limit: true,
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-webhook-secret-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "TEST").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "TEST").is_ok());
    }

    #[test]
    fn test_cart_backend_parse() {
        assert_eq!("Memory".parse::<CartBackend>(), Ok(CartBackend::Memory));
        assert!("sqlite".parse::<CartBackend>().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", config());
        assert!(debug_output.contains("localhost:4000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_private_webhook_value"));
        assert!(!debug_output.contains("hunter2"));
    }
}
