// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory resources, tenant and API key seeding, and license fixtures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `laas_server`

use anyhow::Result;
use chrono::{DateTime, Utc};
use laas_server::{
    api_keys::generate_api_key,
    cache::factory::Backends,
    config::{CacheSettings, ServerConfig},
    database_plugins::{memory::MemoryLicenseStore, LicenseStore},
    models::{
        LaasUser, License, LicenseStatus, Product, SubscriptionQuota, Tenant, TenantId,
    },
    quota::QuotaPolicy,
    resources::ServerResources,
};
use serde_json::json;
use std::sync::{Arc, Once};
use std::time::Duration;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Cache settings without the background sweep task
pub fn test_cache_settings() -> CacheSettings {
    CacheSettings {
        enable_background_sweep: false,
        ..CacheSettings::default()
    }
}

/// Configuration for an in-memory deployment with the given rate limit
pub fn test_config(max_requests: u64, window: Duration) -> ServerConfig {
    let mut config = ServerConfig {
        database_url: "memory:".to_owned(),
        cache: test_cache_settings(),
        ..ServerConfig::default()
    };
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.window = window;
    config
}

/// In-memory store plus resources built over fallback-only backends
pub fn memory_resources(max_requests: u64) -> (Arc<ServerResources>, Arc<dyn LicenseStore>) {
    init_test_logging();
    let store: Arc<dyn LicenseStore> = Arc::new(MemoryLicenseStore::new());
    let config = test_config(max_requests, Duration::from_secs(60));
    let backends = Backends::in_memory(&config.cache);
    let resources =
        ServerResources::with_parts(store.clone(), backends, config, QuotaPolicy::default());
    (Arc::new(resources), store)
}

/// Create an active tenant and return it with a plaintext API key
pub async fn create_tenant_with_key(store: &dyn LicenseStore, name: &str) -> Result<(Tenant, String)> {
    let tenant = Tenant::new(name);
    store.create_tenant(&tenant).await?;
    let key = generate_api_key();
    store
        .create_api_key(tenant.id, &key.key_hash, &key.key_prefix)
        .await?;
    Ok((tenant, key.full_key))
}

/// Give the tenant an active subscription allowing `max_licenses`
pub async fn grant_quota(store: &dyn LicenseStore, tenant_id: TenantId, max_licenses: i64) -> Result<()> {
    store
        .upsert_quota(&SubscriptionQuota {
            tenant_id,
            stripe_subscription_id: Some("sub_test".to_owned()),
            stripe_price_id: Some("price_test".to_owned()),
            max_licenses,
            used_licenses: 0,
            has_active_subscription: true,
            updated_at: Utc::now(),
        })
        .await?;
    Ok(())
}

/// Create a product for the tenant
pub async fn create_product(store: &dyn LicenseStore, tenant_id: TenantId, name: &str) -> Result<Product> {
    let product = Product {
        id: Uuid::new_v4(),
        tenant_id,
        name: name.to_owned(),
        description: None,
        created_at: Utc::now(),
    };
    store.create_product(&product).await?;
    Ok(product)
}

/// License fixture builder
pub struct LicenseFixture {
    pub max_seats: Option<i64>,
    pub max_devices: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: LicenseStatus,
}

impl Default for LicenseFixture {
    fn default() -> Self {
        Self {
            max_seats: None,
            max_devices: None,
            expires_at: None,
            status: LicenseStatus::Active,
        }
    }
}

impl LicenseFixture {
    /// Store a license for a fresh product of the tenant
    pub async fn create(self, store: &dyn LicenseStore, tenant_id: TenantId) -> Result<License> {
        let product = create_product(store, tenant_id, "Desktop App").await?;
        let license = License {
            id: Uuid::new_v4(),
            tenant_id,
            product_id: product.id,
            plan_id: None,
            status: self.status,
            max_seats: self.max_seats,
            max_devices: self.max_devices,
            expires_at: self.expires_at,
            features: json!({ "pro": true }),
            created_at: Utc::now(),
        };
        store.create_license(&license).await?;
        Ok(license)
    }
}

/// Assign a license to the tenant's end user, creating the user if needed
pub async fn assign(
    store: &dyn LicenseStore,
    tenant_id: TenantId,
    external_id: &str,
    license_id: Uuid,
) -> Result<LaasUser> {
    let user = store
        .create_user(&LaasUser::new(tenant_id, external_id))
        .await?;
    store.assign_license(user.id, license_id).await?;
    Ok(user)
}
