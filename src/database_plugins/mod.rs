// ABOUTME: Persistence abstraction for tenants, licenses, activations, audit, and quotas
// ABOUTME: Plugin architecture with SQLite and in-memory backends behind one object-safe trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use crate::errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use laas_core::models::{
    Activation, AuditLogEntry, LaasUser, License, LicenseStatus, Plan, PlanMapping, Product,
    SubscriptionQuota, Tenant, TenantId,
};
use serde_json::Value;
use uuid::Uuid;

pub mod factory;
pub mod memory;
pub mod sqlite;

/// Core persistence trait
///
/// All store implementations must implement this trait to provide a
/// consistent interface for the validation engine, quota guard, and routes.
/// Tenant-owned reads take the tenant id so one tenant never sees another's rows.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Create tables and indexes if they do not exist
    async fn migrate(&self) -> AppResult<()>;

    /// Verify the store is reachable
    async fn health_check(&self) -> AppResult<()>;

    // ================================
    // Tenants and API keys
    // ================================

    /// Insert a tenant
    async fn create_tenant(&self, tenant: &Tenant) -> AppResult<()>;

    /// Get a tenant by id
    async fn get_tenant(&self, tenant_id: TenantId) -> AppResult<Option<Tenant>>;

    /// Register an API key hash for a tenant
    async fn create_api_key(&self, tenant_id: TenantId, key_hash: &str, label: &str)
        -> AppResult<()>;

    /// Resolve the tenant owning an API key hash
    async fn find_tenant_by_api_key(&self, key_hash: &str) -> AppResult<Option<Tenant>>;

    // ================================
    // End users
    // ================================

    /// Find a user by the tenant's own identifier
    async fn find_user(&self, tenant_id: TenantId, external_id: &str)
        -> AppResult<Option<LaasUser>>;

    /// Insert a user, returning the stored row
    ///
    /// Idempotent on `(tenant_id, external_id)`: a concurrent insert of the
    /// same identifier returns the row that won.
    async fn create_user(&self, user: &LaasUser) -> AppResult<LaasUser>;

    // ================================
    // Products and plans
    // ================================

    /// Insert a product
    async fn create_product(&self, product: &Product) -> AppResult<()>;

    /// Products owned by a tenant, oldest first
    async fn list_products(&self, tenant_id: TenantId) -> AppResult<Vec<Product>>;

    /// Get a tenant's product
    async fn get_product(&self, tenant_id: TenantId, product_id: Uuid)
        -> AppResult<Option<Product>>;

    /// Insert a plan
    async fn create_plan(&self, plan: &Plan) -> AppResult<()>;

    /// Get a plan by id
    async fn get_plan(&self, plan_id: Uuid) -> AppResult<Option<Plan>>;

    // ================================
    // Licenses and assignments
    // ================================

    /// Insert a license
    async fn create_license(&self, license: &License) -> AppResult<()>;

    /// Get a tenant's license
    async fn get_license(&self, tenant_id: TenantId, license_id: Uuid)
        -> AppResult<Option<License>>;

    /// Licenses owned by a tenant, oldest first
    async fn list_licenses(&self, tenant_id: TenantId) -> AppResult<Vec<License>>;

    /// Delete a tenant's license with its assignments and activations
    ///
    /// Returns whether a license was deleted.
    async fn delete_license(&self, tenant_id: TenantId, license_id: Uuid) -> AppResult<bool>;

    /// Persist a status change
    async fn update_license_status(&self, license_id: Uuid, status: LicenseStatus)
        -> AppResult<()>;

    /// Assign a license to a user; assigning twice is a no-op
    async fn assign_license(&self, user_id: Uuid, license_id: Uuid) -> AppResult<()>;

    /// Licenses assigned to a user, in assignment order
    async fn licenses_for_user(&self, user_id: Uuid) -> AppResult<Vec<License>>;

    // ================================
    // Activations
    // ================================

    /// All activations on a license
    async fn activations_for_license(&self, license_id: Uuid) -> AppResult<Vec<Activation>>;

    /// The activation for one `(user, license, device)` slot
    async fn find_activation(
        &self,
        user_id: Uuid,
        license_id: Uuid,
        device_id: Option<&str>,
    ) -> AppResult<Option<Activation>>;

    /// Insert an activation, returning the stored row
    ///
    /// Idempotent on `(user_id, license_id, device_id)`.
    async fn create_activation(&self, activation: &Activation) -> AppResult<Activation>;

    /// Record a repeat validation; `device_info` replaces the stored value only when present
    async fn touch_activation(
        &self,
        activation_id: Uuid,
        checked_at: DateTime<Utc>,
        device_info: Option<&Value>,
    ) -> AppResult<Activation>;

    // ================================
    // Audit log
    // ================================

    /// Append an audit record
    async fn append_audit(&self, entry: &AuditLogEntry) -> AppResult<()>;

    /// Most recent audit records for a tenant, newest first
    async fn list_audit(&self, tenant_id: TenantId, limit: u32) -> AppResult<Vec<AuditLogEntry>>;

    // ================================
    // Subscription quota
    // ================================

    /// Current quota record
    async fn get_quota(&self, tenant_id: TenantId) -> AppResult<Option<SubscriptionQuota>>;

    /// Insert or update a quota record, never touching `used_licenses` of an existing row
    async fn upsert_quota(&self, quota: &SubscriptionQuota) -> AppResult<()>;

    /// Add one to `used_licenses` if the subscription is active and below its limit
    ///
    /// The check and the increment are one atomic step. Returns `false`
    /// when no slot was left; errors if the tenant has no quota record.
    async fn increment_used_licenses(&self, tenant_id: TenantId) -> AppResult<bool>;

    /// Subtract one from `used_licenses`, never going below zero
    async fn decrement_used_licenses(&self, tenant_id: TenantId) -> AppResult<()>;

    /// Resolve a billing price to its plan mapping
    async fn find_plan_mapping(&self, price_id: &str) -> AppResult<Option<PlanMapping>>;

    /// Insert or replace a plan mapping
    async fn upsert_plan_mapping(&self, mapping: &PlanMapping) -> AppResult<()>;
}
