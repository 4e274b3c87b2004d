// ABOUTME: In-memory LicenseStore for tests and ephemeral deployments
// ABOUTME: Mirrors the SQLite uniqueness rules for users, assignments, and activations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::LicenseStore;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use laas_core::models::{
    Activation, AuditLogEntry, LaasUser, License, LicenseStatus, Plan, PlanMapping, Product,
    SubscriptionQuota, Tenant, TenantId,
};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryData {
    tenants: HashMap<TenantId, Tenant>,
    api_keys: HashMap<String, TenantId>,
    users: Vec<LaasUser>,
    products: Vec<Product>,
    plans: HashMap<Uuid, Plan>,
    licenses: Vec<License>,
    /// `(user_id, license_id)` in assignment order
    assignments: Vec<(Uuid, Uuid)>,
    activations: Vec<Activation>,
    audit: Vec<AuditLogEntry>,
    quotas: HashMap<TenantId, SubscriptionQuota>,
    plan_mappings: HashMap<String, PlanMapping>,
}

/// Process-local store guarded by a single lock
#[derive(Default)]
pub struct MemoryLicenseStore {
    data: RwLock<MemoryData>,
}

impl MemoryLicenseStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LicenseStore for MemoryLicenseStore {
    async fn migrate(&self) -> AppResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    async fn create_tenant(&self, tenant: &Tenant) -> AppResult<()> {
        self.data
            .write()
            .await
            .tenants
            .insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: TenantId) -> AppResult<Option<Tenant>> {
        Ok(self.data.read().await.tenants.get(&tenant_id).cloned())
    }

    async fn create_api_key(
        &self,
        tenant_id: TenantId,
        key_hash: &str,
        _label: &str,
    ) -> AppResult<()> {
        let mut data = self.data.write().await;
        if data.api_keys.contains_key(key_hash) {
            return Err(AppError::conflict("API key already registered"));
        }
        data.api_keys.insert(key_hash.to_owned(), tenant_id);
        Ok(())
    }

    async fn find_tenant_by_api_key(&self, key_hash: &str) -> AppResult<Option<Tenant>> {
        let data = self.data.read().await;
        Ok(data
            .api_keys
            .get(key_hash)
            .and_then(|tenant_id| data.tenants.get(tenant_id))
            .cloned())
    }

    async fn find_user(
        &self,
        tenant_id: TenantId,
        external_id: &str,
    ) -> AppResult<Option<LaasUser>> {
        Ok(self
            .data
            .read()
            .await
            .users
            .iter()
            .find(|u| u.tenant_id == tenant_id && u.external_id == external_id)
            .cloned())
    }

    async fn create_user(&self, user: &LaasUser) -> AppResult<LaasUser> {
        let mut data = self.data.write().await;
        if let Some(existing) = data
            .users
            .iter()
            .find(|u| u.tenant_id == user.tenant_id && u.external_id == user.external_id)
        {
            return Ok(existing.clone());
        }
        data.users.push(user.clone());
        Ok(user.clone())
    }

    async fn create_product(&self, product: &Product) -> AppResult<()> {
        self.data.write().await.products.push(product.clone());
        Ok(())
    }

    async fn list_products(&self, tenant_id: TenantId) -> AppResult<Vec<Product>> {
        Ok(self
            .data
            .read()
            .await
            .products
            .iter()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: Uuid,
    ) -> AppResult<Option<Product>> {
        Ok(self
            .data
            .read()
            .await
            .products
            .iter()
            .find(|p| p.tenant_id == tenant_id && p.id == product_id)
            .cloned())
    }

    async fn create_plan(&self, plan: &Plan) -> AppResult<()> {
        self.data.write().await.plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn get_plan(&self, plan_id: Uuid) -> AppResult<Option<Plan>> {
        Ok(self.data.read().await.plans.get(&plan_id).cloned())
    }

    async fn create_license(&self, license: &License) -> AppResult<()> {
        self.data.write().await.licenses.push(license.clone());
        Ok(())
    }

    async fn get_license(
        &self,
        tenant_id: TenantId,
        license_id: Uuid,
    ) -> AppResult<Option<License>> {
        Ok(self
            .data
            .read()
            .await
            .licenses
            .iter()
            .find(|l| l.tenant_id == tenant_id && l.id == license_id)
            .cloned())
    }

    async fn list_licenses(&self, tenant_id: TenantId) -> AppResult<Vec<License>> {
        Ok(self
            .data
            .read()
            .await
            .licenses
            .iter()
            .filter(|l| l.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn delete_license(&self, tenant_id: TenantId, license_id: Uuid) -> AppResult<bool> {
        let mut data = self.data.write().await;
        let before = data.licenses.len();
        data.licenses
            .retain(|l| !(l.tenant_id == tenant_id && l.id == license_id));
        if data.licenses.len() == before {
            return Ok(false);
        }
        data.assignments.retain(|(_, l)| *l != license_id);
        data.activations.retain(|a| a.license_id != license_id);
        Ok(true)
    }

    async fn update_license_status(
        &self,
        license_id: Uuid,
        status: LicenseStatus,
    ) -> AppResult<()> {
        let mut data = self.data.write().await;
        let license = data
            .licenses
            .iter_mut()
            .find(|l| l.id == license_id)
            .ok_or_else(|| AppError::not_found("License"))?;
        license.status = status;
        Ok(())
    }

    async fn assign_license(&self, user_id: Uuid, license_id: Uuid) -> AppResult<()> {
        let mut data = self.data.write().await;
        if !data.assignments.contains(&(user_id, license_id)) {
            data.assignments.push((user_id, license_id));
        }
        Ok(())
    }

    async fn licenses_for_user(&self, user_id: Uuid) -> AppResult<Vec<License>> {
        let data = self.data.read().await;
        Ok(data
            .assignments
            .iter()
            .filter(|(u, _)| *u == user_id)
            .filter_map(|(_, license_id)| data.licenses.iter().find(|l| l.id == *license_id))
            .cloned()
            .collect())
    }

    async fn activations_for_license(&self, license_id: Uuid) -> AppResult<Vec<Activation>> {
        Ok(self
            .data
            .read()
            .await
            .activations
            .iter()
            .filter(|a| a.license_id == license_id)
            .cloned()
            .collect())
    }

    async fn find_activation(
        &self,
        user_id: Uuid,
        license_id: Uuid,
        device_id: Option<&str>,
    ) -> AppResult<Option<Activation>> {
        Ok(self
            .data
            .read()
            .await
            .activations
            .iter()
            .find(|a| {
                a.user_id == user_id
                    && a.license_id == license_id
                    && a.device_id.as_deref() == device_id
            })
            .cloned())
    }

    async fn create_activation(&self, activation: &Activation) -> AppResult<Activation> {
        let mut data = self.data.write().await;
        if let Some(existing) = data.activations.iter().find(|a| {
            a.user_id == activation.user_id
                && a.license_id == activation.license_id
                && a.device_id == activation.device_id
        }) {
            return Ok(existing.clone());
        }
        data.activations.push(activation.clone());
        Ok(activation.clone())
    }

    async fn touch_activation(
        &self,
        activation_id: Uuid,
        checked_at: DateTime<Utc>,
        device_info: Option<&Value>,
    ) -> AppResult<Activation> {
        let mut data = self.data.write().await;
        let activation = data
            .activations
            .iter_mut()
            .find(|a| a.id == activation_id)
            .ok_or_else(|| AppError::not_found("Activation"))?;
        activation.last_checked_at = checked_at;
        if let Some(info) = device_info {
            activation.device_info = Some(info.clone());
        }
        Ok(activation.clone())
    }

    async fn append_audit(&self, entry: &AuditLogEntry) -> AppResult<()> {
        self.data.write().await.audit.push(entry.clone());
        Ok(())
    }

    async fn list_audit(&self, tenant_id: TenantId, limit: u32) -> AppResult<Vec<AuditLogEntry>> {
        Ok(self
            .data
            .read()
            .await
            .audit
            .iter()
            .rev()
            .filter(|e| e.tenant_id == tenant_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_quota(&self, tenant_id: TenantId) -> AppResult<Option<SubscriptionQuota>> {
        Ok(self.data.read().await.quotas.get(&tenant_id).cloned())
    }

    async fn upsert_quota(&self, quota: &SubscriptionQuota) -> AppResult<()> {
        let mut data = self.data.write().await;
        let used_licenses = data
            .quotas
            .get(&quota.tenant_id)
            .map_or(quota.used_licenses, |existing| existing.used_licenses);
        data.quotas.insert(
            quota.tenant_id,
            SubscriptionQuota {
                used_licenses,
                ..quota.clone()
            },
        );
        Ok(())
    }

    async fn increment_used_licenses(&self, tenant_id: TenantId) -> AppResult<bool> {
        let mut data = self.data.write().await;
        let quota = data
            .quotas
            .get_mut(&tenant_id)
            .ok_or_else(|| AppError::not_found("Subscription quota"))?;
        if !quota.has_active_subscription || quota.used_licenses >= quota.max_licenses {
            return Ok(false);
        }
        quota.used_licenses += 1;
        quota.updated_at = Utc::now();
        Ok(true)
    }

    async fn decrement_used_licenses(&self, tenant_id: TenantId) -> AppResult<()> {
        let mut data = self.data.write().await;
        if let Some(quota) = data.quotas.get_mut(&tenant_id) {
            quota.used_licenses = (quota.used_licenses - 1).max(0);
            quota.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_plan_mapping(&self, price_id: &str) -> AppResult<Option<PlanMapping>> {
        Ok(self.data.read().await.plan_mappings.get(price_id).cloned())
    }

    async fn upsert_plan_mapping(&self, mapping: &PlanMapping) -> AppResult<()> {
        self.data
            .write()
            .await
            .plan_mappings
            .insert(mapping.price_id.clone(), mapping.clone());
        Ok(())
    }
}
