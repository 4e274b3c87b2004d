// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Resolves backend, cache, rate limit, and database settings once at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! Environment-based configuration management for production deployment
//!
//! All configuration is read from environment variables exactly once, at
//! startup, into a [`ServerConfig`]. Components receive the resolved values
//! and never consult the environment again.

use crate::errors::{AppError, AppResult};
use laas_core::constants::{cache, rate_limit};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Default HTTP port
const DEFAULT_HTTP_PORT: u16 = 8081;

/// Default database location
const DEFAULT_DATABASE_URL: &str = "sqlite:./data/laas.db";

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Redis connection and retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConnectionConfig {
    /// Timeout for establishing a connection
    pub connection_timeout_secs: u64,
    /// Timeout for a single command round trip
    pub response_timeout_secs: u64,
    /// Reconnection attempts performed by the connection manager
    pub reconnection_retries: usize,
    /// Exponential backoff base for reconnection
    pub retry_exponent_base: u64,
    /// Upper bound for a single backoff delay
    pub max_retry_delay_ms: u64,
    /// Connection attempts made during startup warm-up
    pub initial_connection_retries: u32,
    /// First delay between warm-up attempts
    pub initial_retry_delay_ms: u64,
    /// Minimum gap between lazy reconnect attempts once Redis was unreachable
    pub reconnect_cooldown_secs: u64,
}

impl Default for RedisConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: cache::REDIS_CONNECT_TIMEOUT_SECS,
            response_timeout_secs: cache::REDIS_RESPONSE_TIMEOUT_SECS,
            reconnection_retries: 3,
            retry_exponent_base: 2,
            max_retry_delay_ms: 2_000,
            initial_connection_retries: 2,
            initial_retry_delay_ms: 250,
            reconnect_cooldown_secs: cache::REDIS_RECONNECT_COOLDOWN_SECS,
        }
    }
}

/// Shared cache / rate-limit backend selection
///
/// The environment offers three mutually exclusive shapes (`REDIS_URL`,
/// `REDIS_HOST` + `REDIS_PORT`, or nothing); they collapse into this value.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum SharedBackendConfig {
    /// No shared backend: in-process fallback only
    #[default]
    None,
    /// Redis shared backend
    Redis {
        /// Connection URL (may embed credentials)
        url: String,
        /// Timeouts and retry policy
        connection: RedisConnectionConfig,
    },
}

impl SharedBackendConfig {
    /// Resolve from `REDIS_URL` or `REDIS_HOST` / `REDIS_PORT` / `REDIS_PASSWORD` / `REDIS_TLS`
    ///
    /// # Errors
    ///
    /// Returns an error if `REDIS_PORT` is not a valid port number
    pub fn from_env() -> AppResult<Self> {
        if let Some(url) = non_empty_var("REDIS_URL") {
            return Ok(Self::Redis {
                url,
                connection: RedisConnectionConfig::default(),
            });
        }

        let Some(host) = non_empty_var("REDIS_HOST") else {
            return Ok(Self::None);
        };
        let port: u16 = parse_var("REDIS_PORT", 6379)?;
        let scheme = if parse_var("REDIS_TLS", false)? {
            "rediss"
        } else {
            "redis"
        };
        let url = match non_empty_var("REDIS_PASSWORD") {
            Some(password) => format!(
                "{scheme}://:{}@{host}:{port}",
                urlencoding::encode(&password)
            ),
            None => format!("{scheme}://{host}:{port}"),
        };

        Ok(Self::Redis {
            url,
            connection: RedisConnectionConfig::default(),
        })
    }

    /// Whether a shared backend is configured
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        matches!(self, Self::Redis { .. })
    }
}

impl fmt::Debug for SharedBackendConfig {
    // Redis URLs may carry a password
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Redis { connection, .. } => f
                .debug_struct("Redis")
                .field("url", &"<redacted>")
                .field("connection", connection)
                .finish(),
        }
    }
}

/// Read-through cache settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// TTL applied to cached read responses
    pub default_ttl: Duration,
    /// Capacity of the in-process fallback
    pub max_entries: usize,
    /// Interval of the fallback expiry sweep
    pub sweep_interval: Duration,
    /// Whether the fallback sweep task is spawned (disabled in tests)
    pub enable_background_sweep: bool,
    /// Extra lifetime of a tag index beyond the entries it references
    pub tag_ttl_grace: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(cache::DEFAULT_CACHE_TTL_SECS),
            max_entries: cache::DEFAULT_CACHE_MAX_ENTRIES,
            sweep_interval: Duration::from_secs(cache::DEFAULT_SWEEP_INTERVAL_SECS),
            enable_background_sweep: true,
            tag_ttl_grace: Duration::from_secs(cache::TAG_TTL_GRACE_SECS),
        }
    }
}

/// Fixed-window rate limiting settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Requests admitted per tenant per window
    pub max_requests: u64,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: rate_limit::DEFAULT_MAX_REQUESTS,
            window: Duration::from_millis(rate_limit::DEFAULT_WINDOW_MS),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Database connection string
    pub database_url: String,
    /// Shared backend selection
    pub shared_backend: SharedBackendConfig,
    /// Cache settings
    pub cache: CacheSettings,
    /// Rate limiting settings
    pub rate_limit: RateLimitSettings,
    /// Namespace prefix for every cache and rate-limit key
    pub key_prefix: String,
    /// Upper bound on a single request
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            shared_backend: SharedBackendConfig::None,
            cache: CacheSettings::default(),
            rate_limit: RateLimitSettings::default(),
            key_prefix: cache::DEFAULT_KEY_PREFIX.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        let defaults = Self::default();
        let config = Self {
            http_port: parse_var("HTTP_PORT", defaults.http_port)?,
            database_url: non_empty_var("DATABASE_URL").unwrap_or(defaults.database_url),
            shared_backend: SharedBackendConfig::from_env()?,
            cache: CacheSettings {
                default_ttl: Duration::from_secs(parse_var(
                    "CACHE_TTL_SECONDS",
                    cache::DEFAULT_CACHE_TTL_SECS,
                )?),
                max_entries: parse_var("CACHE_MAX_ENTRIES", cache::DEFAULT_CACHE_MAX_ENTRIES)?,
                sweep_interval: Duration::from_secs(parse_var(
                    "CACHE_SWEEP_INTERVAL_SECS",
                    cache::DEFAULT_SWEEP_INTERVAL_SECS,
                )?),
                ..defaults.cache
            },
            rate_limit: RateLimitSettings {
                max_requests: parse_var("RATE_LIMIT_MAX_REQUESTS", rate_limit::DEFAULT_MAX_REQUESTS)?,
                window: Duration::from_millis(parse_var(
                    "RATE_LIMIT_WINDOW_MS",
                    rate_limit::DEFAULT_WINDOW_MS,
                )?),
            },
            key_prefix: non_empty_var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            request_timeout: Duration::from_secs(parse_var(
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot work
    ///
    /// # Errors
    ///
    /// Returns an error for a zero rate-limit ceiling, a zero window, or a zero cache TTL
    pub fn validate(&self) -> AppResult<()> {
        if self.rate_limit.max_requests == 0 {
            return Err(AppError::config("RATE_LIMIT_MAX_REQUESTS must be at least 1"));
        }
        if self.rate_limit.window.is_zero() {
            return Err(AppError::config("RATE_LIMIT_WINDOW_MS must be at least 1"));
        }
        if self.cache.default_ttl.is_zero() {
            return Err(AppError::config("CACHE_TTL_SECONDS must be at least 1"));
        }
        Ok(())
    }

    /// Human-readable summary for startup logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "LaaS Server Configuration:\n\
             - HTTP Port: {}\n\
             - Database: {}\n\
             - Shared Backend: {}\n\
             - Cache TTL: {}s\n\
             - Rate Limit: {} requests / {}ms\n\
             - Key Prefix: {}",
            self.http_port,
            if self.database_url == "memory:" {
                "In-process (not persisted)"
            } else if self.database_url.contains(":memory:") {
                "SQLite (in-memory)"
            } else {
                "SQLite"
            },
            if self.shared_backend.is_shared() {
                "Redis"
            } else {
                "None (in-process fallback only)"
            },
            self.cache.default_ttl.as_secs(),
            self.rate_limit.max_requests,
            self.rate_limit.window.as_millis(),
            self.key_prefix,
        )
    }
}

/// Read a variable, treating empty values as unset
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` only when it is unset
fn parse_var<T: FromStr>(key: &str, default: T) -> AppResult<T>
where
    T::Err: fmt::Display,
{
    non_empty_var(key).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|e| AppError::config(format!("Invalid {key} value '{raw}': {e}")))
    })
}
