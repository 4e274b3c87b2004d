// ABOUTME: Append-only audit log models
// ABOUTME: Records action, entity, and metadata for every validation and mutation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A persisted audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Record identifier
    pub id: Uuid,
    /// Tenant the action belongs to
    pub tenant_id: TenantId,
    /// Action name, e.g. `license.validated`
    pub action: String,
    /// Kind of entity acted on
    pub entity_type: String,
    /// Entity identifier, when one exists
    pub entity_id: Option<String>,
    /// Outcome and context
    pub metadata: Value,
    /// When the action happened
    pub created_at: DateTime<Utc>,
}

/// Audit record before persistence
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    /// Tenant the action belongs to
    pub tenant_id: TenantId,
    /// Action name
    pub action: &'static str,
    /// Kind of entity acted on
    pub entity_type: &'static str,
    /// Entity identifier, when one exists
    pub entity_id: Option<String>,
    /// Outcome and context
    pub metadata: Value,
}

impl NewAuditEntry {
    /// Build an entry for the given action
    #[must_use]
    pub const fn new(
        tenant_id: TenantId,
        action: &'static str,
        entity_type: &'static str,
        entity_id: Option<String>,
        metadata: Value,
    ) -> Self {
        Self {
            tenant_id,
            action,
            entity_type,
            entity_id,
            metadata,
        }
    }

    /// Stamp the entry for storage
    #[must_use]
    pub fn into_entry(self, now: DateTime<Utc>) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            action: self.action.to_owned(),
            entity_type: self.entity_type.to_owned(),
            entity_id: self.entity_id,
            metadata: self.metadata,
            created_at: now,
        }
    }
}
