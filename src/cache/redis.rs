// ABOUTME: Redis shared backend with lazy connection, reconnect cooldown, and Lua atomic scripts
// ABOUTME: Provides cross-instance caching, tag sets, and rate-limit counters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::{CacheBackend, CacheEntry};
use crate::config::RedisConnectionConfig;
use crate::errors::{AppError, AppResult};
use crate::rate_limiting::{RateLimitBackend, WindowCount};
use chrono::{Duration as ChronoDuration, Utc};
use laas_core::constants::cache;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Script};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Increment a window counter and give it a TTL on first use
///
/// Returns `{count, pttl}`. Running as one script keeps INCR and PEXPIRE atomic.
const INCREMENT_WINDOW_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

/// Add a tag member and extend the tag set TTL, never shortening it
const ADD_TAG_MEMBER_SCRIPT: &str = r"
redis.call('SADD', KEYS[1], ARGV[1])
local ttl = redis.call('PTTL', KEYS[1])
if ttl < tonumber(ARGV[2]) then
  redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return 1
";

/// Connection slot shared by all operations
///
/// The lock is only held to read or update this state, never across a
/// connection attempt.
#[derive(Default)]
struct ConnectionState {
    manager: Option<ConnectionManager>,
    last_attempt: Option<Instant>,
    connecting: bool,
}

/// Redis backend using a lazily established `ConnectionManager`
///
/// Operations never wait for a connection attempt. Without a live manager
/// an operation fails immediately (the caller falls back) and, outside the
/// reconnect cooldown, starts a single background connect. Once connected,
/// the manager reconnects on its own.
pub struct RedisBackend {
    client: redis::Client,
    config: RedisConnectionConfig,
    state: Arc<Mutex<ConnectionState>>,
    increment_script: Script,
    tag_script: Script,
}

impl RedisBackend {
    /// Create the backend without connecting
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed
    pub fn new(url: &str, config: RedisConnectionConfig) -> AppResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::config(format!("Invalid Redis URL: {e}")))?;

        Ok(Self {
            client,
            config,
            state: Arc::new(Mutex::new(ConnectionState::default())),
            increment_script: Script::new(INCREMENT_WINDOW_SCRIPT),
            tag_script: Script::new(ADD_TAG_MEMBER_SCRIPT),
        })
    }

    fn manager_config(&self, retries: usize) -> ConnectionManagerConfig {
        ConnectionManagerConfig::new()
            .set_connection_timeout(self.connect_timeout())
            .set_response_timeout(Duration::from_secs(self.config.response_timeout_secs))
            .set_number_of_retries(retries)
            .set_exponent_base(self.config.retry_exponent_base)
            .set_max_delay(self.config.max_retry_delay_ms)
    }

    const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.config.connection_timeout_secs)
    }

    /// Connect at startup with exponential backoff
    ///
    /// Failure is not fatal: the service runs on the fallback until a
    /// background reconnect succeeds.
    pub async fn warm_up(&self) {
        let max_retries = self.config.initial_connection_retries;
        let mut delay_ms = self.config.initial_retry_delay_ms;

        for attempt in 0..=max_retries {
            let result = establish(
                self.client.clone(),
                self.manager_config(self.config.reconnection_retries),
                self.connect_timeout(),
            )
            .await;

            match result {
                Ok(manager) => {
                    let mut state = self.state.lock().await;
                    state.manager = Some(manager);
                    state.last_attempt = None;
                    info!("Redis connection established after {} attempt(s)", attempt + 1);
                    return;
                }
                Err(e) if attempt < max_retries => {
                    warn!(
                        "Redis connection attempt {}/{} failed, retrying in {}ms: {}",
                        attempt + 1,
                        max_retries + 1,
                        delay_ms,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(self.config.max_retry_delay_ms);
                }
                Err(e) => {
                    self.state.lock().await.last_attempt = Some(Instant::now());
                    warn!(
                        "Redis unreachable after {} attempts, continuing on in-process fallback: {}",
                        max_retries + 1,
                        e
                    );
                }
            }
        }
    }

    /// Current connection, or an immediate error while none is live
    async fn connection(&self) -> AppResult<ConnectionManager> {
        let mut state = self.state.lock().await;
        if let Some(manager) = &state.manager {
            return Ok(manager.clone());
        }
        if state.connecting {
            return Err(AppError::cache_backend("Redis unavailable (reconnect in progress)"));
        }

        let cooldown = Duration::from_secs(self.config.reconnect_cooldown_secs);
        if state
            .last_attempt
            .is_some_and(|attempted_at| attempted_at.elapsed() < cooldown)
        {
            return Err(AppError::cache_backend(
                "Redis unavailable (reconnect cooldown)",
            ));
        }

        state.connecting = true;
        state.last_attempt = Some(Instant::now());
        drop(state);

        self.spawn_reconnect();
        Err(AppError::cache_backend(
            "Redis unavailable (reconnecting in background)",
        ))
    }

    /// Single-flight background connect; the caller has set `connecting`
    fn spawn_reconnect(&self) {
        let client = self.client.clone();
        let manager_config = self.manager_config(
            self.config
                .reconnection_retries
                .min(cache::REDIS_LAZY_RECONNECT_RETRIES),
        );
        let timeout = self.connect_timeout();
        let state = self.state.clone();

        tokio::spawn(async move {
            let result = establish(client, manager_config, timeout).await;

            let mut state = state.lock().await;
            state.connecting = false;
            match result {
                Ok(manager) => {
                    state.manager = Some(manager);
                    info!("Redis connection re-established");
                }
                Err(e) => {
                    state.last_attempt = Some(Instant::now());
                    warn!(error = %e, "Redis reconnect failed, staying on in-process fallback");
                }
            }
        });
    }
}

/// Build a connection manager, bounded by `timeout` overall
async fn establish(
    client: redis::Client,
    config: ConnectionManagerConfig,
    timeout: Duration,
) -> AppResult<ConnectionManager> {
    match tokio::time::timeout(timeout, ConnectionManager::new_with_config(client, config)).await {
        Ok(Ok(manager)) => Ok(manager),
        Ok(Err(e)) => Err(AppError::cache_backend(format!(
            "Redis connection failed: {e}"
        ))),
        Err(_) => Err(AppError::cache_backend(format!(
            "Redis connection timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

fn redis_error(operation: &str, e: &redis::RedisError) -> AppError {
    error!("Redis {} operation failed: {}", operation, e);
    AppError::cache_backend(format!("Cache error: {e}"))
}

/// TTL in whole milliseconds, at least one
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait::async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get_entry(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        let mut conn = self.connection().await?;
        let data: Option<String> = conn.get(key).await.map_err(|e| redis_error("GET", &e))?;

        match data {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put_entry(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> AppResult<()> {
        let serialized = serde_json::to_string(entry)?;
        let mut conn = self.connection().await?;

        // PSETEX sets value and expiry in one atomic operation
        conn.pset_ex::<_, _, ()>(key, serialized, ttl_millis(ttl))
            .await
            .map_err(|e| redis_error("PSETEX", &e))
    }

    async fn delete_keys(&self, keys: &[String]) -> AppResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        conn.del(keys).await.map_err(|e| redis_error("DEL", &e))
    }

    async fn add_tag_member(&self, tag_key: &str, member: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let _: i64 = self
            .tag_script
            .key(tag_key)
            .arg(member)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| redis_error("SADD", &e))?;
        Ok(())
    }

    async fn tag_members(&self, tag_key: &str) -> AppResult<Vec<String>> {
        let mut conn = self.connection().await?;
        conn.smembers(tag_key)
            .await
            .map_err(|e| redis_error("SMEMBERS", &e))
    }

    async fn delete_tag(&self, tag_key: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(tag_key)
            .await
            .map_err(|e| redis_error("DEL", &e))
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.connection().await?;

        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("PING", &e))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::cache_backend(format!(
                "Cache error: unexpected PING response '{response}'"
            )))
        }
    }
}

#[async_trait::async_trait]
impl RateLimitBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn increment_window(&self, key: &str, window: Duration) -> AppResult<WindowCount> {
        let mut conn = self.connection().await?;
        let (count, ttl_ms): (u64, i64) = self
            .increment_script
            .key(key)
            .arg(ttl_millis(window))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| redis_error("INCR", &e))?;

        Ok(WindowCount {
            count,
            reset_at: Utc::now() + ChronoDuration::milliseconds(ttl_ms.max(0)),
        })
    }
}
