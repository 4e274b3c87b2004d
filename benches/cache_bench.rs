// ABOUTME: Criterion benchmarks for the read-through cache store over the in-process backend
// ABOUTME: Measures store/lookup latency for several body sizes and tag invalidation cost
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! Criterion benchmarks for cache operations.
//!
//! Measures store/lookup latency and throughput for various body sizes and
//! tenant-wide tag invalidation, using the in-process fallback backend.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use laas_server::cache::factory::Backends;
use laas_server::cache::tags::{resources, scoped};
use laas_server::cache::{CacheKey, CacheStore};
use laas_server::config::CacheSettings;
use laas_server::models::TenantId;
use std::time::Duration;
use tokio::runtime::Runtime;
use uuid::Uuid;

/// Response body sizes for benchmarking
#[derive(Debug, Clone, Copy)]
enum BodySize {
    Small,
    Medium,
    Large,
}

impl BodySize {
    const fn bytes(self) -> usize {
        match self {
            Self::Small => 100,
            Self::Medium => 1_000,
            Self::Large => 10_000,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Small => "100B",
            Self::Medium => "1KB",
            Self::Large => "10KB",
        }
    }
}

fn tenant() -> TenantId {
    TenantId(Uuid::from_u128(1000))
}

fn make_cache_key(index: usize) -> CacheKey {
    CacheKey::new(
        "GET",
        &format!("/licenses/{index}"),
        &tenant().to_string(),
        Some("page=1"),
    )
}

/// Cache store over a fallback-only backend (no background sweep for benchmarks)
fn bench_store() -> CacheStore {
    let settings = CacheSettings {
        max_entries: 10_000,
        enable_background_sweep: false,
        ..CacheSettings::default()
    };
    let backends = Backends::in_memory(&settings);
    CacheStore::new(
        backends.cache,
        Duration::from_secs(3600),
        Duration::from_secs(60),
        "bench:",
    )
}

/// Benchmark store operations with different body sizes
fn bench_cache_store(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("cache_store");
    let tags = scoped(tenant(), &[resources::LICENSES]);

    for size in [BodySize::Small, BodySize::Medium, BodySize::Large] {
        let body = "x".repeat(size.bytes());
        let cache = rt.block_on(async { bench_store() });

        group.throughput(Throughput::Bytes(size.bytes() as u64));
        group.bench_with_input(BenchmarkId::new("memory", size.name()), &body, |b, body| {
            let mut key_index = 0_usize;
            b.iter(|| {
                let key = make_cache_key(key_index % 5_000);
                key_index = key_index.wrapping_add(1);
                rt.block_on(async {
                    cache
                        .store(black_box(&key), body.clone(), None, black_box(&tags))
                        .await;
                });
            });
        });
    }

    group.finish();
}

/// Benchmark lookups (hits vs misses)
fn bench_cache_lookup(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("cache_lookup");
    let cache = rt.block_on(async { bench_store() });

    // Pre-populate cache with 1000 entries
    let body = "x".repeat(BodySize::Medium.bytes());
    rt.block_on(async {
        for i in 0..1000 {
            cache.store(&make_cache_key(i), body.clone(), None, &[]).await;
        }
    });

    group.bench_function("memory_hit", |b| {
        let mut key_index = 0_usize;
        b.iter(|| {
            let key = make_cache_key(key_index % 1000);
            key_index = key_index.wrapping_add(1);
            rt.block_on(async { black_box(cache.lookup(black_box(&key)).await) });
        });
    });

    group.bench_function("memory_miss", |b| {
        let mut key_index = 10_000_usize;
        b.iter(|| {
            let key = make_cache_key(key_index);
            key_index = key_index.wrapping_add(1);
            rt.block_on(async { black_box(cache.lookup(black_box(&key)).await) });
        });
    });

    group.finish();
}

/// Benchmark tenant-wide tag invalidation
fn bench_cache_invalidate(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("cache_invalidate");
    let tags = scoped(tenant(), &[resources::LICENSES]);

    group.bench_function("memory_tag_100_entries", |b| {
        b.iter_custom(|iters| {
            let cache = rt.block_on(async { bench_store() });
            let mut elapsed = Duration::ZERO;

            for _ in 0..iters {
                rt.block_on(async {
                    for i in 0..100 {
                        cache
                            .store(&make_cache_key(i), "{}".to_owned(), None, &tags)
                            .await;
                    }
                });

                let start = std::time::Instant::now();
                rt.block_on(async {
                    black_box(cache.invalidate_by_tags(black_box(&tags)).await);
                });
                elapsed += start.elapsed();
            }
            elapsed
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_cache_store,
    bench_cache_lookup,
    bench_cache_invalidate
);
criterion_main!(benches);
