// ABOUTME: End-user and activation models
// ABOUTME: One activation per (user, license, device) slot, touched on every repeat validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An end user of a tenant, identified by the tenant's own user id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaasUser {
    /// Internal identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Tenant-supplied identifier, unique per tenant
    pub external_id: String,
    /// First time the user was seen
    pub created_at: DateTime<Utc>,
}

impl LaasUser {
    /// Creates a user record for a tenant-supplied identifier
    #[must_use]
    pub fn new(tenant_id: TenantId, external_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            external_id: external_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// A user actively using a license, optionally on a specific device
///
/// A missing `device_id` is the single "deviceless" slot for the
/// (user, license) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    /// Activation identifier
    pub id: Uuid,
    /// Activating user
    pub user_id: Uuid,
    /// Activated license
    pub license_id: Uuid,
    /// Device identifier, if supplied
    pub device_id: Option<String>,
    /// Last device metadata reported by the client
    pub device_info: Option<Value>,
    /// First activation
    pub activated_at: DateTime<Utc>,
    /// Most recent validation
    pub last_checked_at: DateTime<Utc>,
}

impl Activation {
    /// Creates a fresh activation for a slot
    #[must_use]
    pub fn new(
        user_id: Uuid,
        license_id: Uuid,
        device_id: Option<String>,
        device_info: Option<Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            license_id,
            device_id,
            device_info,
            activated_at: now,
            last_checked_at: now,
        }
    }
}
