// ABOUTME: Subscription quota models derived from billing events
// ABOUTME: Maps billing subscription status onto whether the tenant may issue licenses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Billing subscription state as reported by the payment provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and current
    Active,
    /// In a free trial
    Trialing,
    /// Payment failed, grace period
    PastDue,
    /// Ended
    Canceled,
    /// Payment failed permanently
    Unpaid,
    /// First payment pending
    Incomplete,
    /// First payment never completed
    IncompleteExpired,
    /// Anything this service does not recognize
    Unknown(String),
}

impl SubscriptionStatus {
    /// Whether this status entitles the tenant to create licenses
    #[must_use]
    pub const fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

impl FromStr for SubscriptionStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            other => Self::Unknown(other.to_owned()),
        })
    }
}

/// Association between a billing price and a license allowance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMapping {
    /// Billing price identifier
    pub price_id: String,
    /// Display name of the subscription plan
    pub name: String,
    /// Licenses the plan entitles a tenant to create
    pub max_licenses: i64,
}

/// A tenant's license allowance and current usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionQuota {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Billing subscription identifier
    pub stripe_subscription_id: Option<String>,
    /// Billing price identifier
    pub stripe_price_id: Option<String>,
    /// Licenses the tenant may hold
    pub max_licenses: i64,
    /// Licenses currently held
    pub used_licenses: i64,
    /// Derived from the subscription status
    pub has_active_subscription: bool,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionQuota {
    /// Licenses still available
    #[must_use]
    pub const fn remaining(&self) -> i64 {
        let remaining = self.max_licenses - self.used_licenses;
        if remaining < 0 {
            0
        } else {
            remaining
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_access_mapping() {
        let granting = ["active", "trialing"];
        let denying = [
            "past_due",
            "canceled",
            "unpaid",
            "incomplete",
            "incomplete_expired",
            "paused",
        ];

        for status in granting {
            let parsed: SubscriptionStatus = status.parse().unwrap();
            assert!(parsed.grants_access(), "{status} should grant access");
        }
        for status in denying {
            let parsed: SubscriptionStatus = status.parse().unwrap();
            assert!(!parsed.grants_access(), "{status} should deny access");
        }
    }
}
