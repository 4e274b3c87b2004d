// ABOUTME: Integration tests for the subscription quota guard
// ABOUTME: Covers denial reasons, usage accounting, billing events, and unmapped-price policies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use chrono::Utc;
use common::{create_product, grant_quota, init_test_logging};
use laas_server::constants::audit;
use laas_server::database_plugins::memory::MemoryLicenseStore;
use laas_server::database_plugins::sqlite::SqliteLicenseStore;
use laas_server::database_plugins::LicenseStore;
use laas_server::errors::ErrorCode;
use laas_server::models::{
    License, LicenseStatus, PlanMapping, SubscriptionQuota, Tenant, TenantId,
};
use laas_server::quota::{QuotaDenial, QuotaPolicy, SubscriptionEvent, SubscriptionQuotaGuard};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

async fn setup(policy: QuotaPolicy) -> Result<(SubscriptionQuotaGuard, Arc<dyn LicenseStore>, Tenant)> {
    init_test_logging();
    let store: Arc<dyn LicenseStore> = Arc::new(MemoryLicenseStore::new());
    let tenant = Tenant::new("Acme");
    store.create_tenant(&tenant).await?;
    Ok((SubscriptionQuotaGuard::new(store.clone(), policy), store, tenant))
}

async fn new_license(store: &dyn LicenseStore, tenant_id: TenantId) -> Result<License> {
    let product = create_product(store, tenant_id, "Desktop App").await?;
    Ok(License {
        id: Uuid::new_v4(),
        tenant_id,
        product_id: product.id,
        plan_id: None,
        status: LicenseStatus::Active,
        max_seats: None,
        max_devices: None,
        expires_at: None,
        features: json!({}),
        created_at: Utc::now(),
    })
}

fn event(tenant_id: TenantId, price_id: &str, status: Option<&str>) -> SubscriptionEvent {
    SubscriptionEvent {
        tenant_id,
        subscription_id: Some("sub_123".to_owned()),
        price_id: Some(price_id.to_owned()),
        status: status.map(str::to_owned),
    }
}

async fn used_licenses(store: &dyn LicenseStore, tenant_id: TenantId) -> Result<i64> {
    Ok(store.get_quota(tenant_id).await?.unwrap().used_licenses)
}

#[tokio::test]
async fn test_missing_subscription_denies_creation() -> Result<()> {
    let (guard, store, tenant) = setup(QuotaPolicy::default()).await?;

    let check = guard.check_limit(tenant.id).await?;
    assert!(!check.allowed);
    assert_eq!(check.reason, Some(QuotaDenial::NoSubscription));
    assert!(check.quota.is_none());

    let license = new_license(store.as_ref(), tenant.id).await?;
    let err = guard.create_license_guarded(&license, &[]).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::QuotaExceeded);
    assert!(store.get_license(tenant.id, license.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_inactive_subscription_denies_creation() -> Result<()> {
    let (guard, store, tenant) = setup(QuotaPolicy::default()).await?;
    store
        .upsert_quota(&SubscriptionQuota {
            tenant_id: tenant.id,
            stripe_subscription_id: Some("sub_1".to_owned()),
            stripe_price_id: Some("price_1".to_owned()),
            max_licenses: 10,
            used_licenses: 0,
            has_active_subscription: false,
            updated_at: Utc::now(),
        })
        .await?;

    let check = guard.check_limit(tenant.id).await?;
    assert_eq!(check.reason, Some(QuotaDenial::InactiveSubscription));
    Ok(())
}

#[tokio::test]
async fn test_limit_reached_after_allowance_is_used() -> Result<()> {
    let (guard, store, tenant) = setup(QuotaPolicy::default()).await?;
    grant_quota(store.as_ref(), tenant.id, 2).await?;

    for expected_used in 1..=2 {
        let license = new_license(store.as_ref(), tenant.id).await?;
        guard.create_license_guarded(&license, &[]).await?;
        assert_eq!(used_licenses(store.as_ref(), tenant.id).await?, expected_used);
    }

    let check = guard.check_limit(tenant.id).await?;
    assert!(!check.allowed);
    assert_eq!(check.reason, Some(QuotaDenial::LimitReached));

    let extra = new_license(store.as_ref(), tenant.id).await?;
    let err = guard.create_license_guarded(&extra, &[]).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::QuotaExceeded);
    assert_eq!(err.details.as_ref().unwrap()["quota"]["usedLicenses"], 2);
    assert_eq!(used_licenses(store.as_ref(), tenant.id).await?, 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creations_never_exceed_allowance() -> Result<()> {
    let (guard, store, tenant) = setup(QuotaPolicy::default()).await?;
    grant_quota(store.as_ref(), tenant.id, 3).await?;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let license = new_license(store.as_ref(), tenant.id).await?;
        let guard = guard.clone();
        handles.push(tokio::spawn(async move {
            guard.create_license_guarded(&license, &[]).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => created += 1,
            Err(e) => assert_eq!(e.code, ErrorCode::QuotaExceeded),
        }
    }

    assert_eq!(created, 3);
    assert_eq!(used_licenses(store.as_ref(), tenant.id).await?, 3);
    assert_eq!(store.list_licenses(tenant.id).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_creation_assigns_users_and_is_audited() -> Result<()> {
    let (guard, store, tenant) = setup(QuotaPolicy::default()).await?;
    grant_quota(store.as_ref(), tenant.id, 5).await?;

    let license = new_license(store.as_ref(), tenant.id).await?;
    guard
        .create_license_guarded(&license, &["alice".to_owned(), "bob".to_owned()])
        .await?;

    for external_id in ["alice", "bob"] {
        let user = store.find_user(tenant.id, external_id).await?.unwrap();
        let held = store.licenses_for_user(user.id).await?;
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].id, license.id);
    }

    let entries = store.list_audit(tenant.id, 10).await?;
    assert!(entries.iter().any(|e| e.action == audit::LICENSE_CREATED
        && e.entity_id.as_deref() == Some(license.id.to_string().as_str())));
    Ok(())
}

#[tokio::test]
async fn test_deletion_releases_one_slot() -> Result<()> {
    let (guard, store, tenant) = setup(QuotaPolicy::default()).await?;
    grant_quota(store.as_ref(), tenant.id, 1).await?;

    let license = new_license(store.as_ref(), tenant.id).await?;
    guard.create_license_guarded(&license, &[]).await?;
    assert!(!guard.check_limit(tenant.id).await?.allowed);

    assert!(guard.delete_license(tenant.id, license.id).await?);
    assert_eq!(used_licenses(store.as_ref(), tenant.id).await?, 0);
    assert!(guard.check_limit(tenant.id).await?.allowed);

    // Unknown license: nothing released
    assert!(!guard.delete_license(tenant.id, Uuid::new_v4()).await?);
    assert_eq!(used_licenses(store.as_ref(), tenant.id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_insert_leaves_usage_unchanged() -> Result<()> {
    init_test_logging();
    let store: Arc<dyn LicenseStore> = Arc::new(SqliteLicenseStore::new("sqlite::memory:").await?);
    let tenant = Tenant::new("Acme");
    store.create_tenant(&tenant).await?;
    grant_quota(store.as_ref(), tenant.id, 5).await?;
    let guard = SubscriptionQuotaGuard::new(store.clone(), QuotaPolicy::default());

    let license = new_license(store.as_ref(), tenant.id).await?;
    guard.create_license_guarded(&license, &[]).await?;
    assert_eq!(used_licenses(store.as_ref(), tenant.id).await?, 1);

    // Same primary key: the insert fails and nothing is counted
    assert!(guard.create_license_guarded(&license, &[]).await.is_err());
    assert_eq!(used_licenses(store.as_ref(), tenant.id).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_mapped_price_sets_allowance() -> Result<()> {
    let (guard, store, tenant) = setup(QuotaPolicy::default()).await?;
    store
        .upsert_plan_mapping(&PlanMapping {
            price_id: "price_team".to_owned(),
            name: "Team".to_owned(),
            max_licenses: 25,
        })
        .await?;

    let quota = guard
        .apply_subscription_event(&event(tenant.id, "price_team", Some("active")))
        .await?;
    assert_eq!(quota.max_licenses, 25);
    assert!(quota.has_active_subscription);
    assert_eq!(quota.stripe_subscription_id.as_deref(), Some("sub_123"));

    let canceled = guard
        .apply_subscription_event(&event(tenant.id, "price_team", Some("canceled")))
        .await?;
    assert_eq!(canceled.max_licenses, 25);
    assert!(!canceled.has_active_subscription);
    assert_eq!(
        guard.check_limit(tenant.id).await?.reason,
        Some(QuotaDenial::InactiveSubscription)
    );

    let entries = store.list_audit(tenant.id, 10).await?;
    assert_eq!(
        entries
            .iter()
            .filter(|e| e.action == audit::SUBSCRIPTION_UPDATED)
            .count(),
        2
    );
    Ok(())
}

#[tokio::test]
async fn test_billing_event_preserves_usage() -> Result<()> {
    let (guard, store, tenant) = setup(QuotaPolicy::default()).await?;
    store
        .upsert_plan_mapping(&PlanMapping {
            price_id: "price_pro".to_owned(),
            name: "Pro".to_owned(),
            max_licenses: 10,
        })
        .await?;
    grant_quota(store.as_ref(), tenant.id, 3).await?;
    let license = new_license(store.as_ref(), tenant.id).await?;
    guard.create_license_guarded(&license, &[]).await?;

    let quota = guard
        .apply_subscription_event(&event(tenant.id, "price_pro", None))
        .await?;
    assert_eq!(quota.max_licenses, 10);
    assert_eq!(quota.used_licenses, 1);
    assert!(quota.has_active_subscription);
    Ok(())
}

#[tokio::test]
async fn test_unmapped_price_fails_open_to_single_license() -> Result<()> {
    let (guard, _store, tenant) = setup(QuotaPolicy::FailOpenSingleLicense).await?;

    let quota = guard
        .apply_subscription_event(&event(tenant.id, "price_unknown", Some("trialing")))
        .await?;
    assert_eq!(quota.max_licenses, 1);
    assert!(quota.has_active_subscription);
    assert!(guard.check_limit(tenant.id).await?.allowed);
    Ok(())
}

#[tokio::test]
async fn test_unmapped_price_fails_closed() -> Result<()> {
    let (guard, _store, tenant) = setup(QuotaPolicy::FailClosed).await?;

    let quota = guard
        .apply_subscription_event(&event(tenant.id, "price_unknown", Some("active")))
        .await?;
    assert_eq!(quota.max_licenses, 0);
    assert!(!quota.has_active_subscription);
    assert!(!guard.check_limit(tenant.id).await?.allowed);
    Ok(())
}
