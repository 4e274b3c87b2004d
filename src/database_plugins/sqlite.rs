// ABOUTME: SQLite LicenseStore implementation using sqlx runtime queries
// ABOUTME: Unique indexes make user creation, assignment, and activation upserts idempotent
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! SQLite database implementation
//!
//! UUIDs are stored as TEXT, timestamps as RFC 3339 TEXT, and JSON columns
//! as serialized TEXT. An activation without a device occupies the empty
//! `device_key`, giving each user one deviceless slot per license.

use super::LicenseStore;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use laas_core::models::{
    Activation, AuditLogEntry, LaasUser, License, LicenseStatus, Plan, PlanMapping, Product,
    SubscriptionQuota, Tenant, TenantId, TenantStatus,
};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteLicenseStore {
    pool: SqlitePool,
}

impl SqliteLicenseStore {
    /// Connect and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the file cannot be created, or migration fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let in_memory = database_url.contains(":memory:");
        if !in_memory {
            ensure_parent_dir(database_url).await?;
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("Invalid DATABASE_URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every pooled connection to :memory: would otherwise see its own empty database
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(db_error)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Underlying pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn execute(&self, sql: &str) -> AppResult<()> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(db_error)
    }

    async fn migrate_tenants(&self) -> AppResult<()> {
        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS tenants (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS api_keys (
                key_hash TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
                label TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .await
    }

    async fn migrate_catalog(&self) -> AppResult<()> {
        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS plans (
                id TEXT PRIMARY KEY,
                product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                max_seats INTEGER,
                max_devices INTEGER,
                expires_in_days INTEGER,
                features TEXT NOT NULL DEFAULT '{}'
            )
            ",
        )
        .await
    }

    async fn migrate_licenses(&self) -> AppResult<()> {
        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS laas_users (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
                external_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (tenant_id, external_id)
            )
            ",
        )
        .await?;

        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS licenses (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
                product_id TEXT NOT NULL,
                plan_id TEXT,
                status TEXT NOT NULL,
                max_seats INTEGER,
                max_devices INTEGER,
                expires_at TEXT,
                features TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS user_licenses (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL REFERENCES laas_users(id) ON DELETE CASCADE,
                license_id TEXT NOT NULL REFERENCES licenses(id) ON DELETE CASCADE,
                UNIQUE (user_id, license_id)
            )
            ",
        )
        .await?;

        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS activations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES laas_users(id) ON DELETE CASCADE,
                license_id TEXT NOT NULL REFERENCES licenses(id) ON DELETE CASCADE,
                device_id TEXT,
                device_key TEXT NOT NULL,
                device_info TEXT,
                activated_at TEXT NOT NULL,
                last_checked_at TEXT NOT NULL,
                UNIQUE (user_id, license_id, device_key)
            )
            ",
        )
        .await?;

        self.execute(
            "CREATE INDEX IF NOT EXISTS idx_activations_license ON activations(license_id)",
        )
        .await
    }

    async fn migrate_audit_and_quota(&self) -> AppResult<()> {
        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS audit_logs (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.execute(
            "CREATE INDEX IF NOT EXISTS idx_audit_logs_tenant ON audit_logs(tenant_id, created_at)",
        )
        .await?;

        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS subscription_quotas (
                tenant_id TEXT PRIMARY KEY,
                stripe_subscription_id TEXT,
                stripe_price_id TEXT,
                max_licenses INTEGER NOT NULL,
                used_licenses INTEGER NOT NULL DEFAULT 0,
                has_active_subscription BOOLEAN NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.execute(
            r"
            CREATE TABLE IF NOT EXISTS plan_mappings (
                price_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                max_licenses INTEGER NOT NULL
            )
            ",
        )
        .await
    }

    async fn fetch_activation_by_id(&self, activation_id: Uuid) -> AppResult<Activation> {
        let row = sqlx::query("SELECT * FROM activations WHERE id = ?")
            .bind(activation_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or_else(|| AppError::not_found("Activation"))?;
        row_to_activation(&row)
    }
}

#[async_trait]
impl LicenseStore for SqliteLicenseStore {
    async fn migrate(&self) -> AppResult<()> {
        self.migrate_tenants().await?;
        self.migrate_catalog().await?;
        self.migrate_licenses().await?;
        self.migrate_audit_and_quota().await
    }

    async fn health_check(&self) -> AppResult<()> {
        self.execute("SELECT 1").await
    }

    async fn create_tenant(&self, tenant: &Tenant) -> AppResult<()> {
        sqlx::query("INSERT INTO tenants (id, name, status, created_at) VALUES (?, ?, ?, ?)")
            .bind(tenant.id.to_string())
            .bind(&tenant.name)
            .bind(tenant.status.as_str())
            .bind(tenant.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: TenantId) -> AppResult<Option<Tenant>> {
        sqlx::query("SELECT * FROM tenants WHERE id = ?")
            .bind(tenant_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(row_to_tenant)
            .transpose()
    }

    async fn create_api_key(
        &self,
        tenant_id: TenantId,
        key_hash: &str,
        label: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO api_keys (key_hash, tenant_id, label, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(key_hash)
        .bind(tenant_id.to_string())
        .bind(label)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn find_tenant_by_api_key(&self, key_hash: &str) -> AppResult<Option<Tenant>> {
        sqlx::query(
            "SELECT t.* FROM api_keys k JOIN tenants t ON t.id = k.tenant_id WHERE k.key_hash = ?",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .as_ref()
        .map(row_to_tenant)
        .transpose()
    }

    async fn find_user(
        &self,
        tenant_id: TenantId,
        external_id: &str,
    ) -> AppResult<Option<LaasUser>> {
        sqlx::query("SELECT * FROM laas_users WHERE tenant_id = ? AND external_id = ?")
            .bind(tenant_id.to_string())
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(row_to_user)
            .transpose()
    }

    async fn create_user(&self, user: &LaasUser) -> AppResult<LaasUser> {
        sqlx::query(
            r"
            INSERT INTO laas_users (id, tenant_id, external_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (tenant_id, external_id) DO NOTHING
            ",
        )
        .bind(user.id.to_string())
        .bind(user.tenant_id.to_string())
        .bind(&user.external_id)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.find_user(user.tenant_id, &user.external_id)
            .await?
            .ok_or_else(|| AppError::database("User vanished after insert"))
    }

    async fn create_product(&self, product: &Product) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO products (id, tenant_id, name, description, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(product.id.to_string())
        .bind(product.tenant_id.to_string())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_products(&self, tenant_id: TenantId) -> AppResult<Vec<Product>> {
        sqlx::query("SELECT * FROM products WHERE tenant_id = ? ORDER BY rowid")
            .bind(tenant_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(row_to_product)
            .collect()
    }

    async fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: Uuid,
    ) -> AppResult<Option<Product>> {
        sqlx::query("SELECT * FROM products WHERE tenant_id = ? AND id = ?")
            .bind(tenant_id.to_string())
            .bind(product_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(row_to_product)
            .transpose()
    }

    async fn create_plan(&self, plan: &Plan) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO plans (id, product_id, name, max_seats, max_devices, expires_in_days, features)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(plan.id.to_string())
        .bind(plan.product_id.to_string())
        .bind(&plan.name)
        .bind(plan.max_seats)
        .bind(plan.max_devices)
        .bind(plan.expires_in_days)
        .bind(serde_json::to_string(&plan.features)?)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_plan(&self, plan_id: Uuid) -> AppResult<Option<Plan>> {
        sqlx::query("SELECT * FROM plans WHERE id = ?")
            .bind(plan_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(row_to_plan)
            .transpose()
    }

    async fn create_license(&self, license: &License) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO licenses (
                id, tenant_id, product_id, plan_id, status, max_seats, max_devices,
                expires_at, features, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(license.id.to_string())
        .bind(license.tenant_id.to_string())
        .bind(license.product_id.to_string())
        .bind(license.plan_id.map(|id| id.to_string()))
        .bind(license.status.as_str())
        .bind(license.max_seats)
        .bind(license.max_devices)
        .bind(license.expires_at)
        .bind(serde_json::to_string(&license.features)?)
        .bind(license.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_license(
        &self,
        tenant_id: TenantId,
        license_id: Uuid,
    ) -> AppResult<Option<License>> {
        sqlx::query("SELECT * FROM licenses WHERE tenant_id = ? AND id = ?")
            .bind(tenant_id.to_string())
            .bind(license_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(row_to_license)
            .transpose()
    }

    async fn list_licenses(&self, tenant_id: TenantId) -> AppResult<Vec<License>> {
        sqlx::query("SELECT * FROM licenses WHERE tenant_id = ? ORDER BY rowid")
            .bind(tenant_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(row_to_license)
            .collect()
    }

    async fn delete_license(&self, tenant_id: TenantId, license_id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let id = license_id.to_string();

        let deleted = sqlx::query("DELETE FROM licenses WHERE tenant_id = ? AND id = ?")
            .bind(tenant_id.to_string())
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();

        if deleted > 0 {
            for sql in [
                "DELETE FROM activations WHERE license_id = ?",
                "DELETE FROM user_licenses WHERE license_id = ?",
            ] {
                sqlx::query(sql)
                    .bind(&id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error)?;
            }
        }

        tx.commit().await.map_err(db_error)?;
        Ok(deleted > 0)
    }

    async fn update_license_status(
        &self,
        license_id: Uuid,
        status: LicenseStatus,
    ) -> AppResult<()> {
        let updated = sqlx::query("UPDATE licenses SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(license_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

        if updated == 0 {
            return Err(AppError::not_found("License"));
        }
        Ok(())
    }

    async fn assign_license(&self, user_id: Uuid, license_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO user_licenses (user_id, license_id) VALUES (?, ?)
            ON CONFLICT (user_id, license_id) DO NOTHING
            ",
        )
        .bind(user_id.to_string())
        .bind(license_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn licenses_for_user(&self, user_id: Uuid) -> AppResult<Vec<License>> {
        sqlx::query(
            r"
            SELECT l.* FROM user_licenses ul
            JOIN licenses l ON l.id = ul.license_id
            WHERE ul.user_id = ?
            ORDER BY ul.seq
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .iter()
        .map(row_to_license)
        .collect()
    }

    async fn activations_for_license(&self, license_id: Uuid) -> AppResult<Vec<Activation>> {
        sqlx::query("SELECT * FROM activations WHERE license_id = ? ORDER BY rowid")
            .bind(license_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(row_to_activation)
            .collect()
    }

    async fn find_activation(
        &self,
        user_id: Uuid,
        license_id: Uuid,
        device_id: Option<&str>,
    ) -> AppResult<Option<Activation>> {
        sqlx::query(
            "SELECT * FROM activations WHERE user_id = ? AND license_id = ? AND device_key = ?",
        )
        .bind(user_id.to_string())
        .bind(license_id.to_string())
        .bind(device_id.unwrap_or_default())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .as_ref()
        .map(row_to_activation)
        .transpose()
    }

    async fn create_activation(&self, activation: &Activation) -> AppResult<Activation> {
        let device_info = activation
            .device_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO activations (
                id, user_id, license_id, device_id, device_key, device_info,
                activated_at, last_checked_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, license_id, device_key) DO NOTHING
            ",
        )
        .bind(activation.id.to_string())
        .bind(activation.user_id.to_string())
        .bind(activation.license_id.to_string())
        .bind(&activation.device_id)
        .bind(activation.device_id.as_deref().unwrap_or_default())
        .bind(device_info)
        .bind(activation.activated_at)
        .bind(activation.last_checked_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.find_activation(
            activation.user_id,
            activation.license_id,
            activation.device_id.as_deref(),
        )
        .await?
        .ok_or_else(|| AppError::database("Activation vanished after insert"))
    }

    async fn touch_activation(
        &self,
        activation_id: Uuid,
        checked_at: DateTime<Utc>,
        device_info: Option<&Value>,
    ) -> AppResult<Activation> {
        let device_info = device_info.map(serde_json::to_string).transpose()?;

        sqlx::query(
            r"
            UPDATE activations
            SET last_checked_at = ?, device_info = COALESCE(?, device_info)
            WHERE id = ?
            ",
        )
        .bind(checked_at)
        .bind(device_info)
        .bind(activation_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.fetch_activation_by_id(activation_id).await
    }

    async fn append_audit(&self, entry: &AuditLogEntry) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO audit_logs (id, tenant_id, action, entity_type, entity_id, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(entry.id.to_string())
        .bind(entry.tenant_id.to_string())
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(serde_json::to_string(&entry.metadata)?)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_audit(&self, tenant_id: TenantId, limit: u32) -> AppResult<Vec<AuditLogEntry>> {
        sqlx::query(
            "SELECT * FROM audit_logs WHERE tenant_id = ? ORDER BY rowid DESC LIMIT ?",
        )
        .bind(tenant_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .iter()
        .map(row_to_audit)
        .collect()
    }

    async fn get_quota(&self, tenant_id: TenantId) -> AppResult<Option<SubscriptionQuota>> {
        sqlx::query("SELECT * FROM subscription_quotas WHERE tenant_id = ?")
            .bind(tenant_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(row_to_quota)
            .transpose()
    }

    async fn upsert_quota(&self, quota: &SubscriptionQuota) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO subscription_quotas (
                tenant_id, stripe_subscription_id, stripe_price_id, max_licenses,
                used_licenses, has_active_subscription, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (tenant_id) DO UPDATE SET
                stripe_subscription_id = excluded.stripe_subscription_id,
                stripe_price_id = excluded.stripe_price_id,
                max_licenses = excluded.max_licenses,
                has_active_subscription = excluded.has_active_subscription,
                updated_at = excluded.updated_at
            ",
        )
        .bind(quota.tenant_id.to_string())
        .bind(&quota.stripe_subscription_id)
        .bind(&quota.stripe_price_id)
        .bind(quota.max_licenses)
        .bind(quota.used_licenses)
        .bind(quota.has_active_subscription)
        .bind(quota.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn increment_used_licenses(&self, tenant_id: TenantId) -> AppResult<bool> {
        let updated = sqlx::query(
            r"
            UPDATE subscription_quotas
            SET used_licenses = used_licenses + 1, updated_at = ?
            WHERE tenant_id = ? AND has_active_subscription = 1 AND used_licenses < max_licenses
            ",
        )
        .bind(Utc::now())
        .bind(tenant_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?
        .rows_affected();

        if updated > 0 {
            return Ok(true);
        }
        if self.get_quota(tenant_id).await?.is_none() {
            return Err(AppError::not_found("Subscription quota"));
        }
        Ok(false)
    }

    async fn decrement_used_licenses(&self, tenant_id: TenantId) -> AppResult<()> {
        sqlx::query(
            "UPDATE subscription_quotas SET used_licenses = MAX(used_licenses - 1, 0), updated_at = ? WHERE tenant_id = ?",
        )
        .bind(Utc::now())
        .bind(tenant_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn find_plan_mapping(&self, price_id: &str) -> AppResult<Option<PlanMapping>> {
        sqlx::query("SELECT * FROM plan_mappings WHERE price_id = ?")
            .bind(price_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(|row| {
                Ok(PlanMapping {
                    price_id: get(row, "price_id")?,
                    name: get(row, "name")?,
                    max_licenses: get(row, "max_licenses")?,
                })
            })
            .transpose()
    }

    async fn upsert_plan_mapping(&self, mapping: &PlanMapping) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO plan_mappings (price_id, name, max_licenses) VALUES (?, ?, ?)
            ON CONFLICT (price_id) DO UPDATE SET
                name = excluded.name,
                max_licenses = excluded.max_licenses
            ",
        )
        .bind(&mapping.price_id)
        .bind(&mapping.name)
        .bind(mapping.max_licenses)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}

// ================================
// Row helpers
// ================================

fn db_error(e: sqlx::Error) -> AppError {
    AppError::database(format!("Database error: {e}"))
}

/// Create the directory holding a file-backed database
async fn ensure_parent_dir(database_url: &str) -> AppResult<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::database(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }
    Ok(())
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> AppResult<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column)
        .map_err(|e| AppError::database(format!("Failed to get {column} from row: {e}")))
}

fn get_uuid(row: &SqliteRow, column: &str) -> AppResult<Uuid> {
    let raw: String = get(row, column)?;
    Uuid::parse_str(&raw)
        .map_err(|e| AppError::database(format!("Invalid UUID in {column}: {e}")))
}

fn get_optional_uuid(row: &SqliteRow, column: &str) -> AppResult<Option<Uuid>> {
    let raw: Option<String> = get(row, column)?;
    raw.map(|value| {
        Uuid::parse_str(&value)
            .map_err(|e| AppError::database(format!("Invalid UUID in {column}: {e}")))
    })
    .transpose()
}

fn get_json(row: &SqliteRow, column: &str) -> AppResult<Value> {
    let raw: String = get(row, column)?;
    Ok(serde_json::from_str(&raw)?)
}

fn get_optional_json(row: &SqliteRow, column: &str) -> AppResult<Option<Value>> {
    let raw: Option<String> = get(row, column)?;
    raw.map(|value| serde_json::from_str(&value).map_err(AppError::from))
        .transpose()
}

fn row_to_tenant(row: &SqliteRow) -> AppResult<Tenant> {
    let status: String = get(row, "status")?;
    Ok(Tenant {
        id: TenantId(get_uuid(row, "id")?),
        name: get(row, "name")?,
        status: status.parse::<TenantStatus>().map_err(AppError::database)?,
        created_at: get(row, "created_at")?,
    })
}

fn row_to_user(row: &SqliteRow) -> AppResult<LaasUser> {
    Ok(LaasUser {
        id: get_uuid(row, "id")?,
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        external_id: get(row, "external_id")?,
        created_at: get(row, "created_at")?,
    })
}

fn row_to_product(row: &SqliteRow) -> AppResult<Product> {
    Ok(Product {
        id: get_uuid(row, "id")?,
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
        created_at: get(row, "created_at")?,
    })
}

fn row_to_plan(row: &SqliteRow) -> AppResult<Plan> {
    Ok(Plan {
        id: get_uuid(row, "id")?,
        product_id: get_uuid(row, "product_id")?,
        name: get(row, "name")?,
        max_seats: get(row, "max_seats")?,
        max_devices: get(row, "max_devices")?,
        expires_in_days: get(row, "expires_in_days")?,
        features: get_json(row, "features")?,
    })
}

fn row_to_license(row: &SqliteRow) -> AppResult<License> {
    let status: String = get(row, "status")?;
    Ok(License {
        id: get_uuid(row, "id")?,
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        product_id: get_uuid(row, "product_id")?,
        plan_id: get_optional_uuid(row, "plan_id")?,
        status: status.parse().map_err(AppError::database)?,
        max_seats: get(row, "max_seats")?,
        max_devices: get(row, "max_devices")?,
        expires_at: get(row, "expires_at")?,
        features: get_json(row, "features")?,
        created_at: get(row, "created_at")?,
    })
}

fn row_to_activation(row: &SqliteRow) -> AppResult<Activation> {
    Ok(Activation {
        id: get_uuid(row, "id")?,
        user_id: get_uuid(row, "user_id")?,
        license_id: get_uuid(row, "license_id")?,
        device_id: get(row, "device_id")?,
        device_info: get_optional_json(row, "device_info")?,
        activated_at: get(row, "activated_at")?,
        last_checked_at: get(row, "last_checked_at")?,
    })
}

fn row_to_audit(row: &SqliteRow) -> AppResult<AuditLogEntry> {
    Ok(AuditLogEntry {
        id: get_uuid(row, "id")?,
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        action: get(row, "action")?,
        entity_type: get(row, "entity_type")?,
        entity_id: get(row, "entity_id")?,
        metadata: get_json(row, "metadata")?,
        created_at: get(row, "created_at")?,
    })
}

fn row_to_quota(row: &SqliteRow) -> AppResult<SubscriptionQuota> {
    Ok(SubscriptionQuota {
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        stripe_subscription_id: get(row, "stripe_subscription_id")?,
        stripe_price_id: get(row, "stripe_price_id")?,
        max_licenses: get(row, "max_licenses")?,
        used_licenses: get(row, "used_licenses")?,
        has_active_subscription: get(row, "has_active_subscription")?,
        updated_at: get(row, "updated_at")?,
    })
}
