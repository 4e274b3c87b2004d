// ABOUTME: Criterion benchmarks for the fixed-window rate limiter over the in-process backend
// ABOUTME: Measures admission latency for one hot tenant, many tenants, and concurrent callers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! Criterion benchmarks for rate limiting.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use laas_server::cache::factory::Backends;
use laas_server::config::CacheSettings;
use laas_server::models::TenantId;
use laas_server::rate_limiting::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use uuid::Uuid;

fn bench_limiter(max_requests: u64) -> RateLimiter {
    let settings = CacheSettings {
        enable_background_sweep: false,
        ..CacheSettings::default()
    };
    let backends = Backends::in_memory(&settings);
    RateLimiter::new(
        backends.rate_limit,
        max_requests,
        Duration::from_secs(3600),
        "bench:",
    )
}

/// Single tenant, always under the limit
fn bench_admit_single_tenant(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let limiter = rt.block_on(async { bench_limiter(u64::MAX) });
    let tenant = TenantId(Uuid::from_u128(1));

    c.bench_function("rate_limit_admit_single_tenant", |b| {
        b.iter(|| rt.block_on(async { black_box(limiter.admit(black_box(tenant)).await) }));
    });
}

/// Requests spread across many tenants
fn bench_admit_many_tenants(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("rate_limit_many_tenants");

    for tenants in [10_u128, 1_000, 10_000] {
        let limiter = rt.block_on(async { bench_limiter(u64::MAX) });
        group.bench_with_input(BenchmarkId::from_parameter(tenants), &tenants, |b, &tenants| {
            let mut index = 0_u128;
            b.iter(|| {
                let tenant = TenantId(Uuid::from_u128(index % tenants));
                index = index.wrapping_add(1);
                rt.block_on(async { black_box(limiter.admit(tenant).await) })
            });
        });
    }

    group.finish();
}

/// Concurrent callers contending on one tenant's counter
fn bench_admit_concurrent(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("rate_limit_concurrent");
    let tasks = 64_u64;
    group.throughput(Throughput::Elements(tasks));

    let limiter = Arc::new(rt.block_on(async { bench_limiter(u64::MAX) }));
    let tenant = TenantId(Uuid::from_u128(7));

    group.bench_function("memory_64_tasks", |b| {
        b.iter(|| {
            rt.block_on(async {
                let handles: Vec<_> = (0..tasks)
                    .map(|_| {
                        let limiter = limiter.clone();
                        tokio::spawn(async move { limiter.admit(tenant).await })
                    })
                    .collect();
                for handle in handles {
                    black_box(handle.await.unwrap());
                }
            });
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_admit_single_tenant,
    bench_admit_many_tenants,
    bench_admit_concurrent
);
criterion_main!(benches);
