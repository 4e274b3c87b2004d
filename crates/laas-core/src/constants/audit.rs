// ABOUTME: Audit log action and entity names
// ABOUTME: Stable identifiers written to the append-only audit log
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

/// Every validation attempt, whatever the outcome
pub const LICENSE_VALIDATED: &str = "license.validated";
/// First activation of a (user, license, device) slot
pub const LICENSE_ACTIVATED: &str = "license.activated";
/// Lazy expiry discovered during validation
pub const LICENSE_EXPIRED: &str = "license.expired";
/// License created through the quota-gated path
pub const LICENSE_CREATED: &str = "license.created";
/// License deleted
pub const LICENSE_DELETED: &str = "license.deleted";
/// Operator status change
pub const LICENSE_STATUS_CHANGED: &str = "license.status_changed";
/// Subscription event applied to a quota
pub const SUBSCRIPTION_UPDATED: &str = "subscription.updated";

/// Entity type for licenses
pub const ENTITY_LICENSE: &str = "license";
/// Entity type for activations
pub const ENTITY_ACTIVATION: &str = "activation";
/// Entity type for subscription quotas
pub const ENTITY_SUBSCRIPTION: &str = "subscription";
