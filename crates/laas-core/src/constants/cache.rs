// ABOUTME: Cache-related constants for TTL, capacity, and cleanup intervals
// ABOUTME: Shared by the Redis backend and the in-process fallback backend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

/// Default TTL for cached read responses
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300; // 5 minutes

/// Default maximum cache entries for the in-process fallback
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// Default sweep interval for expired fallback entries
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300; // 5 minutes

/// Extra lifetime given to a tag index beyond the entries it references
pub const TAG_TTL_GRACE_SECS: u64 = 60;

/// Default key namespace shared by cache and rate limiter
pub const DEFAULT_KEY_PREFIX: &str = "laas:";

/// Redis connection timeout in seconds
pub const REDIS_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Redis operation timeout in seconds
pub const REDIS_RESPONSE_TIMEOUT_SECS: u64 = 3;

/// Minimum delay between reconnect attempts after Redis was unreachable
pub const REDIS_RECONNECT_COOLDOWN_SECS: u64 = 5;

/// Connection manager retries for a background reconnect
pub const REDIS_LAZY_RECONNECT_RETRIES: usize = 1;

/// Largest response body the cache layer buffers
pub const MAX_CACHEABLE_BODY_BYTES: usize = 1024 * 1024;
