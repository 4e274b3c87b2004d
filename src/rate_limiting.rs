// ABOUTME: Per-tenant fixed-window rate limiting with backend-native atomic counting
// ABOUTME: Decides admission and derives limit, remaining, reset, and retry-after values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! # Fixed-Window Rate Limiting
//!
//! Every tenant gets `max_requests` admissions per window. The counter lives
//! in a [`RateLimitBackend`]; increments are atomic inside the backend so
//! concurrent admissions for one tenant are never lost. Backend failures
//! admit the request: the limiter protects the service, it never blocks it.

use crate::errors::AppResult;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use laas_core::models::TenantId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Counter state after an increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowCount {
    /// Requests counted in the current window, including this one
    pub count: u64,
    /// When the current window ends
    pub reset_at: DateTime<Utc>,
}

/// Counter store with an atomic increment-in-window primitive
#[async_trait::async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Atomically add one to the counter at `key`
    ///
    /// A missing or elapsed window starts fresh at 1 and ends `window` from now.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn increment_window(&self, key: &str, window: Duration) -> AppResult<WindowCount>;
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests admitted per window
    pub limit: u64,
    /// Requests left in the window
    pub remaining: u64,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
    /// Seconds to wait, set on denial only
    pub retry_after_secs: Option<u64>,
}

impl RateLimitDecision {
    /// Derive the decision from a post-increment counter
    #[must_use]
    pub fn from_count(counted: WindowCount, limit: u64, now: DateTime<Utc>) -> Self {
        if counted.count > limit {
            Self {
                allowed: false,
                limit,
                remaining: 0,
                reset_at: counted.reset_at,
                retry_after_secs: Some(retry_after_secs(counted.reset_at, now)),
            }
        } else {
            Self {
                allowed: true,
                limit,
                remaining: limit - counted.count,
                reset_at: counted.reset_at,
                retry_after_secs: None,
            }
        }
    }
}

/// Whole seconds until `reset_at`, rounded up and never below one
fn retry_after_secs(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (reset_at - now).num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}

/// Per-tenant fixed-window limiter
#[derive(Clone)]
pub struct RateLimiter {
    backend: Arc<dyn RateLimitBackend>,
    max_requests: u64,
    window: Duration,
    key_prefix: String,
}

impl RateLimiter {
    /// Create a limiter over the given backend
    #[must_use]
    pub fn new(
        backend: Arc<dyn RateLimitBackend>,
        max_requests: u64,
        window: Duration,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            max_requests,
            window,
            key_prefix: key_prefix.into(),
        }
    }

    /// Requests admitted per window
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.max_requests
    }

    /// Count this request against the tenant and decide admission
    pub async fn admit(&self, tenant_id: TenantId) -> RateLimitDecision {
        let key = format!("{}ratelimit:{tenant_id}", self.key_prefix);
        let now = Utc::now();

        match self.backend.increment_window(&key, self.window).await {
            Ok(counted) => {
                let decision = RateLimitDecision::from_count(counted, self.max_requests, now);
                if !decision.allowed {
                    debug!(
                        tenant.id = %tenant_id,
                        count = counted.count,
                        limit = self.max_requests,
                        "Rate limit exceeded"
                    );
                }
                decision
            }
            Err(e) => {
                warn!(
                    tenant.id = %tenant_id,
                    backend = self.backend.name(),
                    error = %e,
                    "Rate limit backend unavailable, admitting request"
                );
                RateLimitDecision {
                    allowed: true,
                    limit: self.max_requests,
                    remaining: self.max_requests,
                    reset_at: now
                        + ChronoDuration::from_std(self.window)
                            .unwrap_or_else(|_| ChronoDuration::seconds(60)),
                    retry_after_secs: None,
                }
            }
        }
    }
}
