// ABOUTME: Core data models for the license validation service
// ABOUTME: Re-exports tenant, license, activation, audit, and subscription types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! # Data Models
//!
//! Wire representations use camelCase field names, matching the JSON API.
//! Timestamps are UTC; identifiers are UUIDs except for the tenant-supplied
//! `external_id` of an end user.

mod activation;
mod audit;
mod license;
mod subscription;
mod tenant;

pub use activation::{Activation, LaasUser};
pub use audit::{AuditLogEntry, NewAuditEntry};
pub use license::{
    effective_status, License, LicenseStatus, NewLicense, NewProduct, Plan, Product,
};
pub use subscription::{PlanMapping, SubscriptionQuota, SubscriptionStatus};
pub use tenant::{Tenant, TenantId, TenantStatus};
