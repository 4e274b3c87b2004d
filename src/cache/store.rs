// ABOUTME: Read-through response cache keyed by request shape with tag-based bulk invalidation
// ABOUTME: Treats expired entries as misses and never surfaces backend failures to callers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::{CacheBackend, CacheEntry, CacheKey};
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A valid cached payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Stored body
    pub body: String,
    /// Time left before the entry expires
    pub remaining_ttl: Duration,
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Entry present and unexpired
    Hit(CachedResponse),
    /// Absent, expired, or backend unavailable
    Miss,
}

/// Per-tag invalidation counters observed before computing a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagVersions(Vec<u64>);

/// Read-through cache over a [`CacheBackend`]
///
/// Every key is stored as `{prefix}{cache_key}` and every tag index as
/// `{prefix}tag:{tag}`. A tag index outlives the entries it references by
/// `tag_grace`, so it is eventually cleaned up even if invalidation never runs.
///
/// Each invalidation bumps an in-process version per tag. A response computed
/// while one of its tags was invalidated is not kept (see
/// [`CacheStore::store_unless_invalidated`]). Invalidations issued by other
/// instances are not visible here; such entries live until their TTL.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
    tag_grace: Duration,
    key_prefix: String,
    versions: Arc<DashMap<String, u64>>,
}

impl CacheStore {
    /// Create a store over the given backend
    #[must_use]
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        default_ttl: Duration,
        tag_grace: Duration,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            default_ttl,
            tag_grace,
            key_prefix: key_prefix.into(),
            versions: Arc::new(DashMap::new()),
        }
    }

    /// TTL applied when `store` is given none
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn entry_key(&self, key: &CacheKey) -> String {
        format!("{}{key}", self.key_prefix)
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}tag:{tag}", self.key_prefix)
    }

    /// Look up a key; an expired entry is removed and reported as a miss
    pub async fn lookup(&self, key: &CacheKey) -> CacheLookup {
        let entry_key = self.entry_key(key);
        let entry = match self.backend.get_entry(&entry_key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return CacheLookup::Miss,
            Err(e) => {
                warn!(key = %entry_key, error = %e, "Cache lookup failed, treating as miss");
                return CacheLookup::Miss;
            }
        };

        let now = Utc::now();
        if entry.is_expired_at(now) {
            if let Err(e) = self.backend.delete_keys(&[entry_key]).await {
                debug!(error = %e, "Failed to remove expired cache entry");
            }
            return CacheLookup::Miss;
        }

        CacheLookup::Hit(CachedResponse {
            remaining_ttl: entry.remaining_ttl(now).unwrap_or_default(),
            body: entry.body,
        })
    }

    /// Store a payload under `key` with the given (or default) TTL and tags
    pub async fn store(&self, key: &CacheKey, body: String, ttl: Option<Duration>, tags: &[String]) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let Ok(chrono_ttl) = ChronoDuration::from_std(ttl) else {
            warn!(ttl_secs = ttl.as_secs(), "Cache TTL out of range, not storing");
            return;
        };

        let entry_key = self.entry_key(key);
        let entry = CacheEntry {
            body,
            expires_at: Utc::now() + chrono_ttl,
            tags: tags.to_vec(),
        };

        if let Err(e) = self.backend.put_entry(&entry_key, &entry, ttl).await {
            warn!(key = %entry_key, error = %e, "Cache store failed");
            return;
        }

        let tag_ttl = ttl + self.tag_grace;
        for tag in tags {
            if let Err(e) = self
                .backend
                .add_tag_member(&self.tag_key(tag), &entry_key, tag_ttl)
                .await
            {
                warn!(tag = %tag, error = %e, "Cache tag index update failed");
            }
        }
    }

    /// Current invalidation versions of `tags`
    #[must_use]
    pub fn tag_versions(&self, tags: &[String]) -> TagVersions {
        TagVersions(
            tags.iter()
                .map(|tag| self.versions.get(tag).map_or(0, |version| *version))
                .collect(),
        )
    }

    /// Store a response unless one of its tags was invalidated since `seen`
    ///
    /// The versions are checked again after the write; an invalidation that
    /// raced the write removes the fresh entry. Returns whether it was kept.
    pub async fn store_unless_invalidated(
        &self,
        key: &CacheKey,
        body: String,
        ttl: Option<Duration>,
        tags: &[String],
        seen: &TagVersions,
    ) -> bool {
        if self.tag_versions(tags) != *seen {
            debug!(key = %key, "Tags invalidated while computing response, not caching");
            return false;
        }

        self.store(key, body, ttl, tags).await;

        if self.tag_versions(tags) != *seen {
            let entry_key = self.entry_key(key);
            if let Err(e) = self.backend.delete_keys(&[entry_key]).await {
                warn!(key = %key, error = %e, "Failed to drop entry stored during invalidation");
            }
            return false;
        }
        true
    }

    /// Remove every entry whose tags intersect `tags`, returning how many were removed
    pub async fn invalidate_by_tags(&self, tags: &[String]) -> u64 {
        for tag in tags {
            *self.versions.entry(tag.clone()).or_insert(0) += 1;
        }

        let mut keys = HashSet::new();
        for tag in tags {
            let tag_key = self.tag_key(tag);
            match self.backend.tag_members(&tag_key).await {
                Ok(members) => keys.extend(members),
                Err(e) => warn!(tag = %tag, error = %e, "Cache tag lookup failed"),
            }
            if let Err(e) = self.backend.delete_tag(&tag_key).await {
                warn!(tag = %tag, error = %e, "Cache tag delete failed");
            }
        }

        if keys.is_empty() {
            return 0;
        }

        let keys: Vec<String> = keys.into_iter().collect();
        match self.backend.delete_keys(&keys).await {
            Ok(removed) => {
                debug!(tags = ?tags, removed, "Invalidated cache entries by tag");
                removed
            }
            Err(e) => {
                warn!(tags = ?tags, error = %e, "Cache invalidation failed");
                0
            }
        }
    }

    /// Whether the backend currently answers
    pub async fn health_check(&self) -> bool {
        match self.backend.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Cache health check failed");
                false
            }
        }
    }
}
