// ABOUTME: Integration tests for the per-tenant fixed-window rate limiter
// ABOUTME: Covers the limit boundary, window reset, tenant isolation, and concurrent atomicity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use chrono::Utc;
use common::{init_test_logging, test_cache_settings};
use laas_server::cache::factory::Backends;
use laas_server::models::TenantId;
use laas_server::rate_limiting::RateLimiter;
use std::sync::Arc;
use std::time::Duration;

fn limiter(max_requests: u64, window: Duration) -> RateLimiter {
    init_test_logging();
    let backends = Backends::in_memory(&test_cache_settings());
    RateLimiter::new(backends.rate_limit, max_requests, window, "test:")
}

#[tokio::test]
async fn test_requests_up_to_limit_are_admitted() {
    let limiter = limiter(5, Duration::from_secs(60));
    let tenant = TenantId::new();

    for expected_remaining in (0..5).rev() {
        let decision = limiter.admit(tenant).await;
        assert!(decision.allowed);
        assert_eq!(decision.limit, 5);
        assert_eq!(decision.remaining, expected_remaining);
        assert!(decision.retry_after_secs.is_none());
    }

    let denied = limiter.admit(tenant).await;
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
    let retry_after = denied.retry_after_secs.unwrap();
    assert!((1..=60).contains(&retry_after));
    assert!(denied.reset_at > Utc::now());
}

#[tokio::test]
async fn test_window_resets_after_elapsing() {
    let limiter = limiter(2, Duration::from_millis(100));
    let tenant = TenantId::new();

    assert!(limiter.admit(tenant).await.allowed);
    assert!(limiter.admit(tenant).await.allowed);
    assert!(!limiter.admit(tenant).await.allowed);

    tokio::time::sleep(Duration::from_millis(150)).await;

    let fresh = limiter.admit(tenant).await;
    assert!(fresh.allowed);
    assert_eq!(fresh.remaining, 1);
}

#[tokio::test]
async fn test_tenants_have_separate_budgets() {
    let limiter = limiter(1, Duration::from_secs(60));
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();

    assert!(limiter.admit(tenant_a).await.allowed);
    assert!(!limiter.admit(tenant_a).await.allowed);
    assert!(limiter.admit(tenant_b).await.allowed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admissions_never_exceed_limit() {
    let limiter = Arc::new(limiter(20, Duration::from_secs(60)));
    let tenant = TenantId::new();

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.admit(tenant).await.allowed })
        })
        .collect();

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 20);
}
