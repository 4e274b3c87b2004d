// ABOUTME: License validation engine deciding whether an end user holds a usable license
// ABOUTME: Applies lazy expiry, seat and device limits, idempotent activation upserts, and audit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! # License Validation
//!
//! [`LicenseValidationEngine::validate`] answers "may this user use the
//! product right now?". Business non-validity is a [`Verdict::Invalid`],
//! never an error; only store failures surface as `Err`.
//!
//! The seat and device checks read current usage and then write the
//! activation. Two concurrent validations for new users on the same license
//! can both pass the check; that race is accepted.

use crate::audit::AuditRecorder;
use crate::database_plugins::LicenseStore;
use crate::errors::AppResult;
use crate::logging::AppLogger;
use chrono::{DateTime, Utc};
use laas_core::constants::audit;
use laas_core::models::{
    effective_status, Activation, LaasUser, License, LicenseStatus, NewAuditEntry, TenantId,
};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Why a validation did not grant access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// No usable license is assigned to the user
    NoLicense,
    /// The license has expired
    Expired,
    /// The license was revoked
    Revoked,
    /// The license is suspended
    Suspended,
    /// Every seat is taken by other users
    ExceededSeats,
    /// Every device slot is taken by other devices
    ExceededDevices,
}

impl InvalidReason {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoLicense => "no_license",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::Suspended => "suspended",
            Self::ExceededSeats => "exceeded_seats",
            Self::ExceededDevices => "exceeded_devices",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seat and device consumption on the granted license, including this request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseUsage {
    /// Distinct users with an activation
    pub seats_used: usize,
    /// Distinct devices with an activation
    pub devices_used: usize,
}

/// Outcome of a validation
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Access granted
    Valid {
        /// Granted license
        license: Box<License>,
        /// The activation slot this request used
        activation: Activation,
        /// Feature snapshot of the license
        features: Value,
        /// Consumption after this request
        usage: LicenseUsage,
    },
    /// Access denied
    Invalid {
        /// Why
        reason: InvalidReason,
    },
}

impl Verdict {
    const fn invalid(reason: InvalidReason) -> Self {
        Self::Invalid { reason }
    }

    /// Whether access was granted
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Denial reason, if any
    #[must_use]
    pub const fn reason(&self) -> Option<InvalidReason> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason } => Some(*reason),
        }
    }

    fn license_id(&self) -> Option<Uuid> {
        match self {
            Self::Valid { license, .. } => Some(license.id),
            Self::Invalid { .. } => None,
        }
    }
}

// Flattened with a `valid` discriminator: {valid:true, license, ...} or {valid:false, reason}
impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Valid {
                license,
                activation,
                features,
                usage,
            } => {
                let mut state = serializer.serialize_struct("Verdict", 5)?;
                state.serialize_field("valid", &true)?;
                state.serialize_field("license", license)?;
                state.serialize_field("activation", activation)?;
                state.serialize_field("features", features)?;
                state.serialize_field("usage", usage)?;
                state.end()
            }
            Self::Invalid { reason } => {
                let mut state = serializer.serialize_struct("Verdict", 2)?;
                state.serialize_field("valid", &false)?;
                state.serialize_field("reason", reason)?;
                state.end()
            }
        }
    }
}

/// Validation request body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// The tenant's own identifier for the end user
    pub user_id: String,
    /// Device identifier, if the client reports one
    #[serde(default)]
    pub device_id: Option<String>,
    /// Free-form device metadata
    #[serde(default)]
    pub device_info: Option<Value>,
}

impl ValidationRequest {
    /// Request for a user without device information
    #[must_use]
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            device_id: None,
            device_info: None,
        }
    }

    /// Attach a device identifier
    #[must_use]
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }
}

/// Decision engine over the license store
#[derive(Clone)]
pub struct LicenseValidationEngine {
    store: Arc<dyn LicenseStore>,
    audit: AuditRecorder,
}

impl LicenseValidationEngine {
    /// Create an engine over the given store
    #[must_use]
    pub fn new(store: Arc<dyn LicenseStore>) -> Self {
        Self {
            audit: AuditRecorder::new(store.clone()),
            store,
        }
    }

    /// Validate a user's access and record the attempt
    ///
    /// Every attempt, including failures, is audited as `license.validated`
    /// on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails
    pub async fn validate(
        &self,
        tenant_id: TenantId,
        request: &ValidationRequest,
    ) -> AppResult<Verdict> {
        let result = self.evaluate(tenant_id, request, Utc::now()).await;

        let metadata = match &result {
            Ok(verdict) => {
                AppLogger::log_validation(
                    &tenant_id.to_string(),
                    &request.user_id,
                    verdict.reason().map_or("valid", InvalidReason::as_str),
                );
                json!({
                    "userId": request.user_id,
                    "deviceId": request.device_id,
                    "valid": verdict.is_valid(),
                    "reason": verdict.reason(),
                })
            }
            Err(e) => json!({
                "userId": request.user_id,
                "deviceId": request.device_id,
                "valid": false,
                "error": e.code,
            }),
        };
        let license_id = result
            .as_ref()
            .ok()
            .and_then(Verdict::license_id)
            .map(|id| id.to_string());

        self.audit.record(NewAuditEntry::new(
            tenant_id,
            audit::LICENSE_VALIDATED,
            audit::ENTITY_LICENSE,
            license_id,
            metadata,
        ))
        .await;

        result
    }

    async fn evaluate(
        &self,
        tenant_id: TenantId,
        request: &ValidationRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Verdict> {
        let user = self.resolve_user(tenant_id, &request.user_id).await?;

        let licenses = self.store.licenses_for_user(user.id).await?;
        if licenses.is_empty() {
            return Ok(Verdict::invalid(InvalidReason::NoLicense));
        }

        let Some(license) = self.first_usable(tenant_id, licenses, now).await? else {
            return Ok(Verdict::invalid(InvalidReason::NoLicense));
        };

        let activations = self.store.activations_for_license(license.id).await?;

        let seats: HashSet<Uuid> = activations.iter().map(|a| a.user_id).collect();
        let new_seat = !seats.contains(&user.id);
        if new_seat && exceeds(license.max_seats, seats.len()) {
            return Ok(Verdict::invalid(InvalidReason::ExceededSeats));
        }

        let devices: HashSet<&str> = activations
            .iter()
            .filter_map(|a| a.device_id.as_deref())
            .collect();
        let new_device = request
            .device_id
            .as_deref()
            .is_some_and(|device| !devices.contains(device));
        if new_device && exceeds(license.max_devices, devices.len()) {
            return Ok(Verdict::invalid(InvalidReason::ExceededDevices));
        }

        let usage = LicenseUsage {
            seats_used: seats.len() + usize::from(new_seat),
            devices_used: devices.len() + usize::from(new_device),
        };
        let activation = self
            .upsert_activation(tenant_id, &user, &license, request, now)
            .await?;

        Ok(Verdict::Valid {
            features: license.features.clone(),
            license: Box::new(license),
            activation,
            usage,
        })
    }

    /// Find the user, provisioning it on first sight
    async fn resolve_user(&self, tenant_id: TenantId, external_id: &str) -> AppResult<LaasUser> {
        if let Some(user) = self.store.find_user(tenant_id, external_id).await? {
            return Ok(user);
        }
        self.store
            .create_user(&LaasUser::new(tenant_id, external_id))
            .await
    }

    /// First license in assignment order that is active at `now`
    ///
    /// Licenses found past their expiry are persisted as expired on the way.
    async fn first_usable(
        &self,
        tenant_id: TenantId,
        licenses: Vec<License>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<License>> {
        for license in licenses {
            match effective_status(&license, now) {
                LicenseStatus::Active => return Ok(Some(license)),
                LicenseStatus::Expired if license.status == LicenseStatus::Active => {
                    self.store
                        .update_license_status(license.id, LicenseStatus::Expired)
                        .await?;
                    self.audit.record(NewAuditEntry::new(
                        tenant_id,
                        audit::LICENSE_EXPIRED,
                        audit::ENTITY_LICENSE,
                        Some(license.id.to_string()),
                        json!({ "expiresAt": license.expires_at }),
                    ))
                    .await;
                }
                LicenseStatus::Expired | LicenseStatus::Revoked | LicenseStatus::Suspended => {}
            }
        }
        Ok(None)
    }

    /// Touch the existing activation for this slot or create it
    async fn upsert_activation(
        &self,
        tenant_id: TenantId,
        user: &LaasUser,
        license: &License,
        request: &ValidationRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Activation> {
        let device_id = request.device_id.as_deref();

        if let Some(existing) = self
            .store
            .find_activation(user.id, license.id, device_id)
            .await?
        {
            return self
                .store
                .touch_activation(existing.id, now, request.device_info.as_ref())
                .await;
        }

        let fresh = Activation::new(
            user.id,
            license.id,
            request.device_id.clone(),
            request.device_info.clone(),
            now,
        );
        let stored = self.store.create_activation(&fresh).await?;

        // A concurrent request may have won the insert; only the winner is audited
        if stored.id == fresh.id {
            self.audit.record(NewAuditEntry::new(
                tenant_id,
                audit::LICENSE_ACTIVATED,
                audit::ENTITY_ACTIVATION,
                Some(stored.id.to_string()),
                json!({
                    "licenseId": license.id,
                    "userId": user.external_id,
                    "deviceId": stored.device_id,
                }),
            ))
            .await;
            Ok(stored)
        } else {
            self.store
                .touch_activation(stored.id, now, request.device_info.as_ref())
                .await
        }
    }
}

/// Whether a limit is already reached by `used` distinct holders
fn exceeds(limit: Option<i64>, used: usize) -> bool {
    limit.is_some_and(|max| i64::try_from(used).unwrap_or(i64::MAX) >= max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_check() {
        assert!(!exceeds(None, 1_000));
        assert!(!exceeds(Some(2), 1));
        assert!(exceeds(Some(2), 2));
        assert!(exceeds(Some(0), 0));
    }

    #[test]
    fn test_invalid_verdict_serialization() {
        let verdict = Verdict::invalid(InvalidReason::ExceededSeats);
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json, json!({ "valid": false, "reason": "exceeded_seats" }));
    }
}
