//! Room service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default conferencing-server connect timeout in seconds.
pub const DEFAULT_SERVER_CONNECT_TIMEOUT_SECONDS: u64 = 5;

/// Default conferencing-server request timeout in seconds.
pub const DEFAULT_SERVER_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Default interval between server health checks in seconds.
pub const DEFAULT_SERVER_HEALTH_CHECK_INTERVAL_SECONDS: u64 = 30;

/// Default number of consecutive failed health checks before a server is
/// considered offline.
pub const DEFAULT_SERVER_OFFLINE_AFTER_FAILURES: u32 = 3;

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Minimum application key length in bytes.
pub const MIN_APP_KEY_LENGTH: usize = 32;

/// Digest used for conferencing API checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha1,
    Sha256,
}

/// Room service configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Database URL, Redis URL and the application key are redacted in Debug
/// output to prevent credential leakage.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Key for signing meeting-end callback URLs.
    pub app_key: SecretString,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Externally reachable base URL, used to build callback URLs.
    pub public_url: String,

    /// Redis URL for distributed start locks. Without it locks are
    /// process-local.
    pub redis_url: Option<String>,

    /// Connect timeout for conferencing-server requests.
    pub server_connect_timeout: Duration,

    /// Overall timeout for conferencing-server requests.
    pub server_request_timeout: Duration,

    /// Interval between server health checks.
    pub server_health_check_interval: Duration,

    /// Consecutive failed health checks before a server is marked offline.
    pub server_offline_after_failures: u32,

    /// Room token lifetime measured from last use. `None` means tokens never
    /// expire.
    pub room_token_expiration: Option<chrono::Duration>,

    /// Digest for conferencing API checksums (default: sha256).
    pub checksum_algorithm: ChecksumAlgorithm,

    /// Optional stylesheet URL passed to the conferencing client on join.
    pub custom_style_url: Option<String>,

    /// Time to let in-flight requests finish on shutdown.
    pub drain_period: Duration,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("app_key", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("public_url", &self.public_url)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("server_connect_timeout", &self.server_connect_timeout)
            .field("server_request_timeout", &self.server_request_timeout)
            .field(
                "server_health_check_interval",
                &self.server_health_check_interval,
            )
            .field(
                "server_offline_after_failures",
                &self.server_offline_after_failures,
            )
            .field("room_token_expiration", &self.room_token_expiration)
            .field("checksum_algorithm", &self.checksum_algorithm)
            .field("custom_style_url", &self.custom_style_url)
            .field("drain_period", &self.drain_period)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid application key: {0}")]
    InvalidAppKey(String),

    #[error("Invalid timeout configuration: {0}")]
    InvalidTimeout(String),

    #[error("Invalid health check configuration: {0}")]
    InvalidHealthCheck(String),

    #[error("Invalid room token expiration: {0}")]
    InvalidTokenExpiration(String),

    #[error("Invalid checksum algorithm: {0}")]
    InvalidChecksumAlgorithm(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let app_key = vars
            .get("APP_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("APP_KEY".to_string()))?;
        if app_key.len() < MIN_APP_KEY_LENGTH {
            return Err(ConfigError::InvalidAppKey(format!(
                "APP_KEY must be at least {} bytes, got {}",
                MIN_APP_KEY_LENGTH,
                app_key.len()
            )));
        }
        let app_key = SecretString::from(app_key.as_str());

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let public_url = vars
            .get("PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "http://localhost:8080".to_string());

        let redis_url = vars.get("REDIS_URL").filter(|url| !url.is_empty()).cloned();

        let server_connect_timeout = Duration::from_secs(parse_positive(
            vars,
            "SERVER_CONNECT_TIMEOUT_SECONDS",
            DEFAULT_SERVER_CONNECT_TIMEOUT_SECONDS,
            ConfigError::InvalidTimeout,
        )?);

        let server_request_timeout = Duration::from_secs(parse_positive(
            vars,
            "SERVER_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_SERVER_REQUEST_TIMEOUT_SECONDS,
            ConfigError::InvalidTimeout,
        )?);

        let server_health_check_interval = Duration::from_secs(parse_positive(
            vars,
            "SERVER_HEALTH_CHECK_INTERVAL_SECONDS",
            DEFAULT_SERVER_HEALTH_CHECK_INTERVAL_SECONDS,
            ConfigError::InvalidHealthCheck,
        )?);

        let server_offline_after_failures = parse_positive(
            vars,
            "SERVER_OFFLINE_AFTER_FAILURES",
            u64::from(DEFAULT_SERVER_OFFLINE_AFTER_FAILURES),
            ConfigError::InvalidHealthCheck,
        )?;
        let server_offline_after_failures =
            u32::try_from(server_offline_after_failures).map_err(|_| {
                ConfigError::InvalidHealthCheck(format!(
                    "SERVER_OFFLINE_AFTER_FAILURES is too large, got {}",
                    server_offline_after_failures
                ))
            })?;

        // Unset or 0 disables expiry
        let room_token_expiration = match vars.get("ROOM_TOKEN_EXPIRATION_DAYS") {
            Some(value_str) => {
                let days: i64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidTokenExpiration(format!(
                        "ROOM_TOKEN_EXPIRATION_DAYS must be a valid integer, got '{}': {}",
                        value_str, e
                    ))
                })?;
                if days < 0 {
                    return Err(ConfigError::InvalidTokenExpiration(format!(
                        "ROOM_TOKEN_EXPIRATION_DAYS must not be negative, got {}",
                        days
                    )));
                }
                if days == 0 {
                    None
                } else {
                    Some(chrono::Duration::try_days(days).ok_or_else(|| {
                        ConfigError::InvalidTokenExpiration(format!(
                            "ROOM_TOKEN_EXPIRATION_DAYS is too large, got {}",
                            days
                        ))
                    })?)
                }
            }
            None => None,
        };

        let checksum_algorithm = match vars.get("CHECKSUM_ALGORITHM").map(String::as_str) {
            None | Some("sha256") => ChecksumAlgorithm::Sha256,
            Some("sha1") => ChecksumAlgorithm::Sha1,
            Some(other) => {
                return Err(ConfigError::InvalidChecksumAlgorithm(format!(
                    "CHECKSUM_ALGORITHM must be 'sha256' or 'sha1', got '{}'",
                    other
                )));
            }
        };

        let custom_style_url = vars
            .get("CUSTOM_STYLE_URL")
            .filter(|url| !url.is_empty())
            .cloned();

        let drain_period = match vars.get("DRAIN_SECONDS") {
            Some(value_str) => Duration::from_secs(value_str.parse().map_err(|e| {
                ConfigError::InvalidTimeout(format!(
                    "DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?),
            None => Duration::from_secs(DEFAULT_DRAIN_SECONDS),
        };

        Ok(Config {
            database_url,
            app_key,
            bind_address,
            public_url,
            redis_url,
            server_connect_timeout,
            server_request_timeout,
            server_health_check_interval,
            server_offline_after_failures,
            room_token_expiration,
            checksum_algorithm,
            custom_style_url,
            drain_period,
        })
    }

    /// Upper bound on waiting for another request's start of the same room.
    pub fn start_lock_wait(&self) -> Duration {
        self.server_connect_timeout + self.server_request_timeout
    }

    /// Raw application key bytes for HMAC signing.
    pub fn app_key_bytes(&self) -> &[u8] {
        self.app_key.expose_secret().as_bytes()
    }
}

fn parse_positive(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    err: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        err(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(err(format!("{} must be greater than 0", name)));
    }

    Ok(value)
}
