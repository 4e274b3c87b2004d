// ABOUTME: Primary-then-fallback composition implementing the backend traits
// ABOUTME: Any primary failure is logged and the same operation is retried on the fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::{CacheBackend, CacheEntry};
use crate::errors::AppResult;
use crate::logging::AppLogger;
use crate::rate_limiting::{RateLimitBackend, WindowCount};
use std::sync::Arc;
use std::time::Duration;

/// Backend that prefers a shared primary and falls back per call
///
/// Selection is re-evaluated on every operation, so a recovered primary is
/// used again without a restart. Call sites never branch on backend type.
///
/// Reads and writes go to one backend. Invalidation (`tag_members`,
/// `delete_tag`, `delete_keys`) runs on both, since the fallback may hold
/// entries written while the primary was down.
pub struct Failover<B: ?Sized> {
    primary: Option<Arc<B>>,
    fallback: Arc<B>,
}

impl<B: ?Sized> Failover<B> {
    /// Compose a primary (if configured) with a fallback
    pub const fn new(primary: Option<Arc<B>>, fallback: Arc<B>) -> Self {
        Self { primary, fallback }
    }

    /// Whether a primary is configured
    pub const fn has_primary(&self) -> bool {
        self.primary.is_some()
    }
}

/// Try the primary, then the fallback on error
macro_rules! failover {
    ($self:ident, $op:literal, |$backend:ident| $call:expr) => {{
        if let Some($backend) = &$self.primary {
            match $call.await {
                Ok(value) => return Ok(value),
                Err(e) => AppLogger::log_backend_fallback($op, $backend.name(), &e.to_string()),
            }
        }
        let $backend = &$self.fallback;
        $call.await
    }};
}

#[async_trait::async_trait]
impl CacheBackend for Failover<dyn CacheBackend> {
    fn name(&self) -> &'static str {
        "failover"
    }

    async fn get_entry(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        failover!(self, "get_entry", |backend| backend.get_entry(key))
    }

    async fn put_entry(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> AppResult<()> {
        failover!(self, "put_entry", |backend| backend.put_entry(key, entry, ttl))
    }

    async fn delete_keys(&self, keys: &[String]) -> AppResult<u64> {
        let mut removed = 0;
        if let Some(primary) = &self.primary {
            match primary.delete_keys(keys).await {
                Ok(count) => removed += count,
                Err(e) => AppLogger::log_backend_fallback("delete_keys", primary.name(), &e.to_string()),
            }
        }
        Ok(removed + self.fallback.delete_keys(keys).await?)
    }

    async fn add_tag_member(&self, tag_key: &str, member: &str, ttl: Duration) -> AppResult<()> {
        failover!(self, "add_tag_member", |backend| backend
            .add_tag_member(tag_key, member, ttl))
    }

    async fn tag_members(&self, tag_key: &str) -> AppResult<Vec<String>> {
        let mut members = Vec::new();
        if let Some(primary) = &self.primary {
            match primary.tag_members(tag_key).await {
                Ok(found) => members.extend(found),
                Err(e) => AppLogger::log_backend_fallback("tag_members", primary.name(), &e.to_string()),
            }
        }
        for member in self.fallback.tag_members(tag_key).await? {
            if !members.contains(&member) {
                members.push(member);
            }
        }
        Ok(members)
    }

    async fn delete_tag(&self, tag_key: &str) -> AppResult<()> {
        if let Some(primary) = &self.primary {
            if let Err(e) = primary.delete_tag(tag_key).await {
                AppLogger::log_backend_fallback("delete_tag", primary.name(), &e.to_string());
            }
        }
        self.fallback.delete_tag(tag_key).await
    }

    async fn health_check(&self) -> AppResult<()> {
        match &self.primary {
            Some(primary) => primary.health_check().await,
            None => self.fallback.health_check().await,
        }
    }
}

#[async_trait::async_trait]
impl RateLimitBackend for Failover<dyn RateLimitBackend> {
    fn name(&self) -> &'static str {
        "failover"
    }

    async fn increment_window(&self, key: &str, window: Duration) -> AppResult<WindowCount> {
        failover!(self, "increment_window", |backend| backend
            .increment_window(key, window))
    }
}
