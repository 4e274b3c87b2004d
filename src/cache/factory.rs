// ABOUTME: Backend factory for configuration-based backend selection
// ABOUTME: Builds the shared cache and rate-limit backends once at startup for injection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::failover::Failover;
use super::memory::InMemoryBackend;
use super::redis::RedisBackend;
use super::CacheBackend;
use crate::config::{CacheSettings, SharedBackendConfig};
use crate::errors::AppResult;
use crate::rate_limiting::RateLimitBackend;
use serde::Serialize;
use std::sync::Arc;

/// Whether a shared backend sits in front of the fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    /// Shared primary with in-process fallback
    Shared,
    /// In-process fallback only
    FallbackOnly,
}

/// Backends constructed once and passed to the cache store and rate limiter
#[derive(Clone)]
pub struct Backends {
    /// Cache backend (failover-composed)
    pub cache: Arc<dyn CacheBackend>,
    /// Rate-limit backend (failover-composed)
    pub rate_limit: Arc<dyn RateLimitBackend>,
    /// Selected mode
    pub mode: BackendMode,
}

impl Backends {
    /// Build backends from the resolved configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis URL is malformed
    pub async fn from_config(
        shared: &SharedBackendConfig,
        cache_settings: &CacheSettings,
    ) -> AppResult<Self> {
        match shared {
            SharedBackendConfig::None => {
                tracing::info!(
                    "No shared backend configured, using in-process fallback (max entries: {})",
                    cache_settings.max_entries
                );
                Ok(Self::in_memory(cache_settings))
            }
            SharedBackendConfig::Redis { url, connection } => {
                tracing::info!("Initializing Redis shared backend with in-process fallback");
                let redis = Arc::new(RedisBackend::new(url, connection.clone())?);
                redis.warm_up().await;
                let cache: Arc<dyn CacheBackend> = redis.clone();
                let rate_limit: Arc<dyn RateLimitBackend> = redis;
                let fallback = Arc::new(InMemoryBackend::new(cache_settings));
                Ok(Self::compose(
                    Some((cache, rate_limit)),
                    fallback,
                    BackendMode::Shared,
                ))
            }
        }
    }

    /// Fallback-only backends
    #[must_use]
    pub fn in_memory(cache_settings: &CacheSettings) -> Self {
        let fallback = Arc::new(InMemoryBackend::new(cache_settings));
        Self::compose(None, fallback, BackendMode::FallbackOnly)
    }

    /// Put arbitrary primaries in front of an in-process fallback
    #[must_use]
    pub fn with_primary(
        cache: Arc<dyn CacheBackend>,
        rate_limit: Arc<dyn RateLimitBackend>,
        cache_settings: &CacheSettings,
    ) -> Self {
        let fallback = Arc::new(InMemoryBackend::new(cache_settings));
        Self::compose(Some((cache, rate_limit)), fallback, BackendMode::Shared)
    }

    fn compose(
        primary: Option<(Arc<dyn CacheBackend>, Arc<dyn RateLimitBackend>)>,
        fallback: Arc<InMemoryBackend>,
        mode: BackendMode,
    ) -> Self {
        let (cache_primary, rate_primary) = primary.unzip();
        let cache_fallback: Arc<dyn CacheBackend> = fallback.clone();
        let rate_fallback: Arc<dyn RateLimitBackend> = fallback;

        Self {
            cache: Arc::new(Failover::new(cache_primary, cache_fallback)),
            rate_limit: Arc::new(Failover::new(rate_primary, rate_fallback)),
            mode,
        }
    }
}
