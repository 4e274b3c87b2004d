// ABOUTME: Centralized resource container shared by every HTTP handler and middleware
// ABOUTME: Built once at startup from configuration, or from injected backends in tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! # Server Resources
//!
//! Holds the store, the cache store, the rate limiter, and the domain
//! services. Backends are constructed once here and injected everywhere
//! else, so the process never holds two connections to the same backend.

use crate::cache::factory::{BackendMode, Backends};
use crate::cache::CacheStore;
use crate::config::ServerConfig;
use crate::database_plugins::factory::open_store;
use crate::database_plugins::LicenseStore;
use crate::errors::AppResult;
use crate::quota::{QuotaPolicy, SubscriptionQuotaGuard};
use crate::rate_limiting::RateLimiter;
use crate::validation::LicenseValidationEngine;
use std::sync::Arc;

/// Shared server resources
#[derive(Clone)]
pub struct ServerResources {
    /// Durable store
    pub store: Arc<dyn LicenseStore>,
    /// Response cache
    pub cache: Arc<CacheStore>,
    /// Per-tenant request limiter
    pub rate_limiter: Arc<RateLimiter>,
    /// License validation
    pub validation: Arc<LicenseValidationEngine>,
    /// License creation gate
    pub quota: Arc<SubscriptionQuotaGuard>,
    /// Whether a shared backend is configured
    pub backend_mode: BackendMode,
    /// Resolved configuration
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Open the store and backends named by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the Redis URL is malformed
    pub async fn from_config(config: ServerConfig) -> AppResult<Self> {
        let store = open_store(&config.database_url).await?;
        let backends = Backends::from_config(&config.shared_backend, &config.cache).await?;
        Ok(Self::with_parts(
            store,
            backends,
            config,
            QuotaPolicy::default(),
        ))
    }

    /// Assemble resources from already-constructed parts
    #[must_use]
    pub fn with_parts(
        store: Arc<dyn LicenseStore>,
        backends: Backends,
        config: ServerConfig,
        quota_policy: QuotaPolicy,
    ) -> Self {
        let cache = CacheStore::new(
            backends.cache,
            config.cache.default_ttl,
            config.cache.tag_ttl_grace,
            config.key_prefix.clone(),
        );
        let rate_limiter = RateLimiter::new(
            backends.rate_limit,
            config.rate_limit.max_requests,
            config.rate_limit.window,
            config.key_prefix.clone(),
        );

        Self {
            validation: Arc::new(LicenseValidationEngine::new(store.clone())),
            quota: Arc::new(SubscriptionQuotaGuard::new(store.clone(), quota_policy)),
            store,
            cache: Arc::new(cache),
            rate_limiter: Arc::new(rate_limiter),
            backend_mode: backends.mode,
            config: Arc::new(config),
        }
    }
}
