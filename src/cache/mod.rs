// ABOUTME: Cache abstraction layer for tenant-scoped read-through response caching
// ABOUTME: Pluggable backends (in-memory, Redis) composed behind a primary-then-fallback strategy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

/// Backend construction from the resolved configuration
pub mod factory;
/// Primary-then-fallback backend composition
pub mod failover;
/// In-process fallback backend
pub mod memory;
/// Redis shared backend
pub mod redis;
/// Read-through cache with tag invalidation
pub mod store;
/// Tenant-scoped tag names and route-to-tag mapping
pub mod tags;

pub use store::{CacheLookup, CacheStore, CachedResponse};

use crate::errors::AppResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stored response payload with its absolute expiry and tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Serialized response body
    pub body: String,
    /// Entry is logically gone once `now >= expires_at`
    pub expires_at: DateTime<Utc>,
    /// Tags the entry was stored under
    pub tags: Vec<String>,
}

impl CacheEntry {
    /// Whether the entry has passed its expiry at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry at `now`
    #[must_use]
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at - now).to_std().ok()
    }
}

/// Key-value store with TTL and set-membership operations
///
/// Keys arrive fully namespaced. Implementations must be safe to share
/// across all tenants and request types.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Fetch an entry; physical presence does not imply validity
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn get_entry(&self, key: &str) -> AppResult<Option<CacheEntry>>;

    /// Store an entry with a TTL
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn put_entry(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> AppResult<()>;

    /// Delete entries, returning how many existed
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn delete_keys(&self, keys: &[String]) -> AppResult<u64>;

    /// Add `member` to the tag set at `tag_key`, extending the set TTL to at least `ttl`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn add_tag_member(&self, tag_key: &str, member: &str, ttl: Duration) -> AppResult<()>;

    /// Members of a tag set (empty when the tag is unknown)
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn tag_members(&self, tag_key: &str) -> AppResult<Vec<String>>;

    /// Remove a tag set
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn delete_tag(&self, tag_key: &str) -> AppResult<()>;

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn health_check(&self) -> AppResult<()>;
}

/// Request-shape cache key
///
/// Two requests map to the same key exactly when they share tenant, method,
/// normalized path, and query parameters (in any order).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    path: String,
    tenant_id: String,
    query: String,
}

impl CacheKey {
    /// Build a key from raw request parts
    #[must_use]
    pub fn new(method: &str, raw_path: &str, tenant_id: &str, raw_query: Option<&str>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: normalize_path(raw_path),
            tenant_id: tenant_id.to_owned(),
            query: raw_query.map(normalize_query).unwrap_or_default(),
        }
    }

    /// Normalized path component
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache:{}:{}:{}", self.tenant_id, self.method, self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

/// Collapse repeated slashes and drop a trailing slash
fn normalize_path(raw: &str) -> String {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Sort query parameters so ordering does not split the cache
fn normalize_query(raw: &str) -> String {
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect();
    pairs.sort();
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
