// ABOUTME: Product, plan, and license models with the license status state machine
// ABOUTME: effective_status decides lazy expiry as a pure function of status, expiry, and now
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A sellable product owned by a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
}

/// Template attributes a license is instantiated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Plan identifier
    pub id: Uuid,
    /// Owning product
    pub product_id: Uuid,
    /// Display name
    pub name: String,
    /// Seat ceiling copied into each license
    pub max_seats: Option<i64>,
    /// Device ceiling copied into each license
    pub max_devices: Option<i64>,
    /// License lifetime from issuance
    pub expires_in_days: Option<i64>,
    /// Feature flags copied into each license
    pub features: Value,
}

/// License lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// Usable
    Active,
    /// Temporarily disabled by an operator
    Suspended,
    /// Permanently withdrawn
    Revoked,
    /// Past its expiry date
    Expired,
}

impl LicenseStatus {
    /// Database / wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }

    /// Whether an operator may move a license from `self` to `next`
    ///
    /// `expired` and `revoked` are terminal unless `force` is set, which
    /// models an explicit operator reactivation.
    #[must_use]
    pub const fn can_transition_to(self, next: Self, force: bool) -> bool {
        match (self, next) {
            (Self::Active, Self::Suspended | Self::Revoked | Self::Expired)
            | (Self::Suspended, Self::Active | Self::Revoked) => true,
            (Self::Expired | Self::Revoked, Self::Active) => force,
            _ => false,
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "revoked" => Ok(Self::Revoked),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown license status '{other}'")),
        }
    }
}

/// A concrete grant instantiated from a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    /// License identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Product the license grants
    pub product_id: Uuid,
    /// Plan the license was instantiated from
    pub plan_id: Option<Uuid>,
    /// Stored status; see [`effective_status`] for the expiry-aware view
    pub status: LicenseStatus,
    /// Distinct users allowed to activate
    pub max_seats: Option<i64>,
    /// Distinct devices allowed to activate
    pub max_devices: Option<i64>,
    /// Absolute expiry
    pub expires_at: Option<DateTime<Utc>>,
    /// Snapshot of the plan features at issuance
    pub features: Value,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Input for creating a license
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLicense {
    /// Product the license grants
    pub product_id: Uuid,
    /// Plan to instantiate from
    #[serde(default)]
    pub plan_id: Option<Uuid>,
    /// Seat ceiling
    #[serde(default)]
    pub max_seats: Option<i64>,
    /// Device ceiling
    #[serde(default)]
    pub max_devices: Option<i64>,
    /// Absolute expiry
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Feature flags
    #[serde(default)]
    pub features: Option<Value>,
    /// End users (tenant external ids) to assign immediately
    #[serde(default)]
    pub assign_to: Vec<String>,
}

/// Expiry-aware status of a license at `now`
///
/// An active license whose `expires_at` is at or before `now` is expired.
/// Persisting that transition is the caller's decision.
#[must_use]
pub fn effective_status(license: &License, now: DateTime<Utc>) -> LicenseStatus {
    match (license.status, license.expires_at) {
        (LicenseStatus::Active, Some(expires_at)) if expires_at <= now => LicenseStatus::Expired,
        (status, _) => status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn license(status: LicenseStatus, expires_at: Option<DateTime<Utc>>) -> License {
        License {
            id: Uuid::new_v4(),
            tenant_id: TenantId::new(),
            product_id: Uuid::new_v4(),
            plan_id: None,
            status,
            max_seats: None,
            max_devices: None,
            expires_at,
            features: Value::Null,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_status_expires_lazily() {
        let now = Utc::now();
        let past = license(LicenseStatus::Active, Some(now - Duration::days(1)));
        let future = license(LicenseStatus::Active, Some(now + Duration::days(1)));
        let perpetual = license(LicenseStatus::Active, None);

        assert_eq!(effective_status(&past, now), LicenseStatus::Expired);
        assert_eq!(effective_status(&future, now), LicenseStatus::Active);
        assert_eq!(effective_status(&perpetual, now), LicenseStatus::Active);
    }

    #[test]
    fn test_effective_status_keeps_operator_states() {
        let now = Utc::now();
        let revoked = license(LicenseStatus::Revoked, Some(now - Duration::days(1)));
        let suspended = license(LicenseStatus::Suspended, None);

        assert_eq!(effective_status(&revoked, now), LicenseStatus::Revoked);
        assert_eq!(effective_status(&suspended, now), LicenseStatus::Suspended);
    }

    #[test]
    fn test_status_transitions() {
        use LicenseStatus::{Active, Expired, Revoked, Suspended};

        assert!(Active.can_transition_to(Suspended, false));
        assert!(Active.can_transition_to(Revoked, false));
        assert!(Suspended.can_transition_to(Active, false));
        assert!(!Suspended.can_transition_to(Expired, false));
        assert!(!Revoked.can_transition_to(Active, false));
        assert!(Revoked.can_transition_to(Active, true));
        assert!(Expired.can_transition_to(Active, true));
        assert!(!Expired.can_transition_to(Suspended, true));
    }
}
