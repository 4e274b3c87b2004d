// ABOUTME: In-process fallback backend with LRU eviction, tag sets, and window counters
// ABOUTME: Includes background sweep task for expired entries, tags, and counters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::{CacheBackend, CacheEntry};
use crate::config::CacheSettings;
use crate::errors::AppResult;
use crate::rate_limiting::{RateLimitBackend, WindowCount};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Members of one tag and when the set itself lapses
#[derive(Debug, Clone)]
struct TagSet {
    members: HashSet<String>,
    expires_at: DateTime<Utc>,
}

/// Shared state between backend operations and the sweep task
struct MemoryState {
    entries: RwLock<LruCache<String, CacheEntry>>,
    tags: DashMap<String, TagSet>,
    counters: DashMap<String, WindowCount>,
}

/// In-process backend with LRU eviction and background sweep
///
/// Entries have no native expiry here, so the sweep task removes anything
/// past `expires_at` to bound memory. Counters are atomic within this
/// process only; under horizontal scale each instance counts on its own.
#[derive(Clone)]
pub struct InMemoryBackend {
    state: Arc<MemoryState>,
    shutdown_tx: Option<Arc<tokio::sync::mpsc::Sender<()>>>,
}

impl InMemoryBackend {
    /// Capacity used when configuration asks for zero entries
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create the backend, spawning the sweep task when enabled
    ///
    /// Must be called inside a Tokio runtime when the sweep is enabled.
    #[must_use]
    pub fn new(settings: &CacheSettings) -> Self {
        let capacity = NonZeroUsize::new(settings.max_entries).unwrap_or(Self::DEFAULT_CAPACITY);
        let state = Arc::new(MemoryState {
            entries: RwLock::new(LruCache::new(capacity)),
            tags: DashMap::new(),
            counters: DashMap::new(),
        });

        let shutdown_tx = if settings.enable_background_sweep {
            let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
            let sweep_state = state.clone();
            let sweep_interval = settings.sweep_interval;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(sweep_interval);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            Self::sweep_expired(&sweep_state, Utc::now()).await;
                        }
                        _ = shutdown_rx.recv() => {
                            tracing::debug!("Cache sweep task received shutdown signal");
                            break;
                        }
                    }
                }
            });

            Some(Arc::new(shutdown_tx))
        } else {
            None
        };

        Self { state, shutdown_tx }
    }

    /// Remove expired entries, tag sets, and elapsed counters
    async fn sweep_expired(state: &MemoryState, now: DateTime<Utc>) -> usize {
        let mut entries = state.entries.write().await;
        let expired_keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired_keys {
            entries.pop(key);
        }

        // Tag references to evicted or expired keys are dropped with them
        state.tags.retain(|_, tag| {
            tag.members.retain(|member| entries.contains(member));
            tag.expires_at > now && !tag.members.is_empty()
        });
        drop(entries);

        state.counters.retain(|_, counter| counter.reset_at > now);

        let removed = expired_keys.len();
        if removed > 0 {
            tracing::debug!("Swept {} expired cache entries", removed);
        }
        removed
    }

    /// Run one sweep immediately
    pub async fn sweep_now(&self) -> usize {
        Self::sweep_expired(&self.state, Utc::now()).await
    }

    /// Entries physically held, expired or not
    pub async fn len(&self) -> usize {
        self.state.entries.read().await.len()
    }

    /// Whether no entries are held
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_entry(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        // LruCache::get updates recency, so it needs the write lock
        let mut entries = self.state.entries.write().await;
        Ok(entries.get(key).cloned())
    }

    async fn put_entry(&self, key: &str, entry: &CacheEntry, _ttl: Duration) -> AppResult<()> {
        self.state
            .entries
            .write()
            .await
            .push(key.to_owned(), entry.clone());
        Ok(())
    }

    async fn delete_keys(&self, keys: &[String]) -> AppResult<u64> {
        let mut entries = self.state.entries.write().await;
        let removed = keys.iter().filter(|key| entries.pop(*key).is_some()).count();
        Ok(removed as u64)
    }

    async fn add_tag_member(&self, tag_key: &str, member: &str, ttl: Duration) -> AppResult<()> {
        let expires_at =
            Utc::now() + ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::zero());
        let mut tag = self
            .state
            .tags
            .entry(tag_key.to_owned())
            .or_insert_with(|| TagSet {
                members: HashSet::new(),
                expires_at,
            });
        tag.members.insert(member.to_owned());
        if tag.expires_at < expires_at {
            tag.expires_at = expires_at;
        }
        Ok(())
    }

    async fn tag_members(&self, tag_key: &str) -> AppResult<Vec<String>> {
        Ok(self
            .state
            .tags
            .get(tag_key)
            .map(|tag| tag.members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_tag(&self, tag_key: &str) -> AppResult<()> {
        self.state.tags.remove(tag_key);
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl RateLimitBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn increment_window(&self, key: &str, window: Duration) -> AppResult<WindowCount> {
        let now = Utc::now();
        let window =
            ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::seconds(60));

        // The entry guard holds the shard lock, so read-reset-increment is atomic
        let mut counter = self
            .state
            .counters
            .entry(key.to_owned())
            .or_insert(WindowCount {
                count: 0,
                reset_at: now + window,
            });
        if counter.reset_at <= now {
            *counter = WindowCount {
                count: 0,
                reset_at: now + window,
            };
        }
        counter.count += 1;
        Ok(*counter)
    }
}

impl Drop for InMemoryBackend {
    fn drop(&mut self) {
        // Only the last clone holds the only Arc to the sender
        if let Some(tx) = &self.shutdown_tx {
            if Arc::strong_count(tx) == 1 {
                if let Err(e) = tx.try_send(()) {
                    tracing::debug!(error = ?e, "Sweep shutdown signal send failed (channel likely closed)");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(max_entries: usize) -> CacheSettings {
        CacheSettings {
            max_entries,
            enable_background_sweep: false,
            ..CacheSettings::default()
        }
    }

    fn entry(expires_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            body: "[]".to_owned(),
            expires_at,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_entries() {
        let backend = InMemoryBackend::new(&settings(10));
        let now = Utc::now();
        let ttl = Duration::from_secs(60);

        backend
            .put_entry("old", &entry(now - ChronoDuration::seconds(1)), ttl)
            .await
            .unwrap();
        backend
            .put_entry("fresh", &entry(now + ChronoDuration::seconds(60)), ttl)
            .await
            .unwrap();

        assert_eq!(backend.sweep_now().await, 1);
        assert!(backend.get_entry("old").await.unwrap().is_none());
        assert!(backend.get_entry("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lru_capacity_bounds_memory() {
        let backend = InMemoryBackend::new(&settings(2));
        let expires_at = Utc::now() + ChronoDuration::seconds(60);
        let ttl = Duration::from_secs(60);

        for key in ["a", "b", "c"] {
            backend.put_entry(key, &entry(expires_at), ttl).await.unwrap();
        }

        assert_eq!(backend.len().await, 2);
        assert!(backend.get_entry("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sweep_prunes_dead_tag_members() {
        let backend = InMemoryBackend::new(&settings(10));
        let now = Utc::now();
        let ttl = Duration::from_secs(60);

        backend
            .put_entry("old", &entry(now - ChronoDuration::seconds(1)), ttl)
            .await
            .unwrap();
        backend
            .put_entry("fresh", &entry(now + ChronoDuration::seconds(60)), ttl)
            .await
            .unwrap();
        for key in ["old", "fresh"] {
            backend.add_tag_member("tag:a", key, ttl).await.unwrap();
        }
        backend.add_tag_member("tag:b", "old", ttl).await.unwrap();

        backend.sweep_now().await;

        assert_eq!(
            backend.tag_members("tag:a").await.unwrap(),
            vec!["fresh".to_owned()]
        );
        assert!(backend.tag_members("tag:b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counter_resets_after_window() {
        let backend = InMemoryBackend::new(&settings(10));
        let window = Duration::from_millis(50);

        assert_eq!(backend.increment_window("k", window).await.unwrap().count, 1);
        assert_eq!(backend.increment_window("k", window).await.unwrap().count, 2);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(backend.increment_window("k", window).await.unwrap().count, 1);
    }
}
