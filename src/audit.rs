// ABOUTME: Best-effort audit trail writer for license and subscription events
// ABOUTME: A failed audit write is logged and never fails the operation being audited
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use crate::database_plugins::LicenseStore;
use chrono::Utc;
use laas_core::models::NewAuditEntry;
use std::sync::Arc;

/// Appends audit entries to the store
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn LicenseStore>,
}

impl AuditRecorder {
    /// Create a recorder over the given store
    #[must_use]
    pub fn new(store: Arc<dyn LicenseStore>) -> Self {
        Self { store }
    }

    /// Append an entry stamped with the current time
    pub async fn record(&self, entry: NewAuditEntry) {
        let entry = entry.into_entry(Utc::now());
        tracing::debug!(
            tenant.id = %entry.tenant_id,
            audit.action = %entry.action,
            audit.entity_type = %entry.entity_type,
            audit.entity_id = ?entry.entity_id,
            "Audit event"
        );

        if let Err(e) = self.store.append_audit(&entry).await {
            tracing::warn!(
                tenant.id = %entry.tenant_id,
                audit.action = %entry.action,
                error = %e,
                "Failed to write audit log entry"
            );
        }
    }
}
