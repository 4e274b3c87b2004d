// ABOUTME: Subscription quota guard gating license creation on the tenant's billing allowance
// ABOUTME: Applies billing events to quota records, with a configurable unmapped-price policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use crate::audit::AuditRecorder;
use crate::database_plugins::LicenseStore;
use crate::errors::{AppError, AppResult};
use chrono::Utc;
use laas_core::constants::{audit, quota::FALLBACK_MAX_LICENSES};
use laas_core::models::{
    LaasUser, License, NewAuditEntry, SubscriptionQuota, SubscriptionStatus, TenantId,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// What to do when a billing price has no plan mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotaPolicy {
    /// Create a single-license record so the tenant is not fully blocked
    #[default]
    FailOpenSingleLicense,
    /// Create a zero-license record
    FailClosed,
}

/// Why license creation was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaDenial {
    /// No subscription was ever recorded
    NoSubscription,
    /// The subscription does not currently grant access
    InactiveSubscription,
    /// All licenses in the allowance are used
    LimitReached,
}

impl QuotaDenial {
    /// Message shown to the caller
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoSubscription => "No subscription found for this tenant",
            Self::InactiveSubscription => "Subscription is not active",
            Self::LimitReached => "License limit reached for the current subscription",
        }
    }
}

/// Result of a quota check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaCheck {
    /// Whether a license may be created
    pub allowed: bool,
    /// Denial reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<QuotaDenial>,
    /// Current quota snapshot, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<SubscriptionQuota>,
}

impl QuotaCheck {
    /// Convert a denial into the error returned to the caller
    #[must_use]
    pub fn into_error(self) -> Option<AppError> {
        let reason = self.reason?;
        let snapshot = self.quota.and_then(|q| serde_json::to_value(q).ok());
        Some(AppError::quota_exceeded(reason.message(), snapshot))
    }
}

/// Verified billing event delivered by the webhook collaborator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEvent {
    /// Tenant the subscription belongs to
    pub tenant_id: TenantId,
    /// Billing subscription id
    #[serde(default)]
    pub subscription_id: Option<String>,
    /// Billing price id
    #[serde(default)]
    pub price_id: Option<String>,
    /// Billing status string
    #[serde(default)]
    pub status: Option<String>,
}

/// Gate for license creation
#[derive(Clone)]
pub struct SubscriptionQuotaGuard {
    store: Arc<dyn LicenseStore>,
    audit: AuditRecorder,
    policy: QuotaPolicy,
}

impl SubscriptionQuotaGuard {
    /// Create a guard with the given unmapped-price policy
    #[must_use]
    pub fn new(store: Arc<dyn LicenseStore>, policy: QuotaPolicy) -> Self {
        Self {
            audit: AuditRecorder::new(store.clone()),
            store,
            policy,
        }
    }

    /// Decide whether the tenant may create one more license
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn check_limit(&self, tenant_id: TenantId) -> AppResult<QuotaCheck> {
        let Some(quota) = self.store.get_quota(tenant_id).await? else {
            return Ok(QuotaCheck {
                allowed: false,
                reason: Some(QuotaDenial::NoSubscription),
                quota: None,
            });
        };

        let reason = if !quota.has_active_subscription {
            Some(QuotaDenial::InactiveSubscription)
        } else if quota.used_licenses >= quota.max_licenses {
            Some(QuotaDenial::LimitReached)
        } else {
            None
        };

        Ok(QuotaCheck {
            allowed: reason.is_none(),
            reason,
            quota: Some(quota),
        })
    }

    /// Count one successfully created license
    ///
    /// Returns `false` if the allowance was used up in the meantime.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or no quota record exists
    pub async fn increment_used(&self, tenant_id: TenantId) -> AppResult<bool> {
        self.store.increment_used_licenses(tenant_id).await
    }

    /// Release one license after a confirmed deletion
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn decrement_used(&self, tenant_id: TenantId) -> AppResult<()> {
        self.store.decrement_used_licenses(tenant_id).await
    }

    /// Check the limit, create the license, count it, then assign it
    ///
    /// Nothing is counted unless the license was stored. Concurrent creations
    /// can all pass `check_limit`; the count is conditional, so the ones that
    /// find no slot left delete their license and get a quota error.
    ///
    /// # Errors
    ///
    /// Returns a quota error on denial, or a store error
    pub async fn create_license_guarded(
        &self,
        license: &License,
        assign_to: &[String],
    ) -> AppResult<()> {
        let check = self.check_limit(license.tenant_id).await?;
        if let Some(denied) = check.into_error() {
            return Err(denied);
        }

        self.store.create_license(license).await?;
        if !self.increment_used(license.tenant_id).await? {
            self.store
                .delete_license(license.tenant_id, license.id)
                .await?;
            warn!(
                tenant.id = %license.tenant_id,
                license.id = %license.id,
                "License allowance used up by a concurrent creation, license discarded"
            );
            let check = self.check_limit(license.tenant_id).await?;
            return Err(check.into_error().unwrap_or_else(|| {
                AppError::quota_exceeded(QuotaDenial::LimitReached.message(), None)
            }));
        }

        for external_id in assign_to {
            let user = match self.store.find_user(license.tenant_id, external_id).await? {
                Some(user) => user,
                None => {
                    self.store
                        .create_user(&LaasUser::new(license.tenant_id, external_id.as_str()))
                        .await?
                }
            };
            self.store.assign_license(user.id, license.id).await?;
        }

        self.audit.record(NewAuditEntry::new(
            license.tenant_id,
            audit::LICENSE_CREATED,
            audit::ENTITY_LICENSE,
            Some(license.id.to_string()),
            json!({ "productId": license.product_id, "assignedTo": assign_to }),
        ))
        .await;
        Ok(())
    }

    /// Delete a license and release its quota slot
    ///
    /// Returns whether a license was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn delete_license(&self, tenant_id: TenantId, license_id: Uuid) -> AppResult<bool> {
        if !self.store.delete_license(tenant_id, license_id).await? {
            return Ok(false);
        }
        self.decrement_used(tenant_id).await?;
        self.audit.record(NewAuditEntry::new(
            tenant_id,
            audit::LICENSE_DELETED,
            audit::ENTITY_LICENSE,
            Some(license_id.to_string()),
            json!({}),
        ))
        .await;
        Ok(true)
    }

    /// Apply a verified billing event to the tenant's quota record
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn apply_subscription_event(
        &self,
        event: &SubscriptionEvent,
    ) -> AppResult<SubscriptionQuota> {
        let status: Option<SubscriptionStatus> =
            event.status.as_deref().and_then(|s| s.parse().ok());
        let existing = self.store.get_quota(event.tenant_id).await?;

        let mapping = match event.price_id.as_deref() {
            Some(price_id) => self.store.find_plan_mapping(price_id).await?,
            None => None,
        };

        let (max_licenses, has_active_subscription) = if let Some(mapping) = mapping {
            let active = status.as_ref().map_or_else(
                || existing.as_ref().map_or(true, |q| q.has_active_subscription),
                SubscriptionStatus::grants_access,
            );
            (mapping.max_licenses, active)
        } else {
            warn!(
                tenant.id = %event.tenant_id,
                price_id = event.price_id.as_deref().unwrap_or("<none>"),
                policy = ?self.policy,
                "No plan mapping for billing price, applying unmapped-price quota policy"
            );
            match self.policy {
                QuotaPolicy::FailOpenSingleLicense => (
                    FALLBACK_MAX_LICENSES,
                    status
                        .as_ref()
                        .map_or(true, SubscriptionStatus::grants_access),
                ),
                QuotaPolicy::FailClosed => (0, false),
            }
        };

        let quota = SubscriptionQuota {
            tenant_id: event.tenant_id,
            stripe_subscription_id: event
                .subscription_id
                .clone()
                .or_else(|| existing.as_ref().and_then(|q| q.stripe_subscription_id.clone())),
            stripe_price_id: event
                .price_id
                .clone()
                .or_else(|| existing.as_ref().and_then(|q| q.stripe_price_id.clone())),
            max_licenses,
            used_licenses: existing.as_ref().map_or(0, |q| q.used_licenses),
            has_active_subscription,
            updated_at: Utc::now(),
        };
        self.store.upsert_quota(&quota).await?;

        info!(
            tenant.id = %event.tenant_id,
            max_licenses,
            active = has_active_subscription,
            "Subscription quota updated"
        );
        self.audit.record(NewAuditEntry::new(
            event.tenant_id,
            audit::SUBSCRIPTION_UPDATED,
            audit::ENTITY_SUBSCRIPTION,
            quota.stripe_subscription_id.clone(),
            json!({
                "priceId": quota.stripe_price_id,
                "status": event.status,
                "maxLicenses": max_licenses,
                "hasActiveSubscription": has_active_subscription,
            }),
        ))
        .await;

        Ok(quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_carries_quota_snapshot() {
        let quota = SubscriptionQuota {
            tenant_id: TenantId::new(),
            stripe_subscription_id: None,
            stripe_price_id: Some("price_basic".to_owned()),
            max_licenses: 2,
            used_licenses: 2,
            has_active_subscription: true,
            updated_at: Utc::now(),
        };
        let check = QuotaCheck {
            allowed: false,
            reason: Some(QuotaDenial::LimitReached),
            quota: Some(quota),
        };

        let error = check.into_error().unwrap();
        assert_eq!(error.http_status(), 403);
        assert_eq!(error.details.unwrap()["quota"]["usedLicenses"], 2);
    }

    #[test]
    fn test_allowed_check_is_not_an_error() {
        let check = QuotaCheck {
            allowed: true,
            reason: None,
            quota: None,
        };
        assert!(check.into_error().is_none());
    }
}
