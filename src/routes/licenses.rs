// ABOUTME: License management route handlers with quota-gated creation
// ABOUTME: Creates, lists, deletes, and transitions licenses; creation and deletion adjust quota usage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! License management routes
//!
//! Creation runs through the subscription quota guard. Deletion releases the
//! quota slot only after the store confirms the row was removed.

use super::{ApiJson, ApiResponse};
use crate::audit::AuditRecorder;
use crate::errors::{AppError, AppResult};
use crate::middleware::AuthenticatedTenant;
use crate::resources::ServerResources;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use laas_core::constants::audit;
use laas_core::models::{
    effective_status, Activation, License, LicenseStatus, NewAuditEntry, NewLicense, Plan,
    TenantId,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Request body for an operator status transition
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    /// Target status
    pub status: String,
    /// Allow reactivating an expired or revoked license
    #[serde(default)]
    pub force: bool,
}

/// License with its expiry-aware status and activations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDetails {
    /// Stored license
    #[serde(flatten)]
    pub license: License,
    /// Status after applying expiry at request time
    pub effective_status: LicenseStatus,
    /// Activations recorded against the license
    pub activations: Vec<Activation>,
}

/// Build a license from the request, filling unset attributes from the plan
///
/// # Errors
///
/// Returns an error if a numeric limit is negative or the plan belongs to another product
pub fn instantiate_license(
    tenant_id: TenantId,
    request: &NewLicense,
    plan: Option<&Plan>,
    now: DateTime<Utc>,
) -> AppResult<License> {
    if let Some(plan) = plan {
        if plan.product_id != request.product_id {
            return Err(AppError::invalid_input(
                "Plan does not belong to the requested product",
            ));
        }
    }

    let max_seats = request.max_seats.or_else(|| plan.and_then(|p| p.max_seats));
    let max_devices = request
        .max_devices
        .or_else(|| plan.and_then(|p| p.max_devices));
    for (field, value) in [("maxSeats", max_seats), ("maxDevices", max_devices)] {
        if value.is_some_and(|v| v < 0) {
            return Err(AppError::invalid_input(format!(
                "{field} must not be negative"
            )));
        }
    }

    let expires_at = request.expires_at.or_else(|| {
        plan.and_then(|p| p.expires_in_days)
            .map(|days| now + Duration::days(days))
    });
    let features = request
        .features
        .clone()
        .or_else(|| plan.map(|p| p.features.clone()))
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    Ok(License {
        id: Uuid::new_v4(),
        tenant_id,
        product_id: request.product_id,
        plan_id: plan.map(|p| p.id),
        status: LicenseStatus::Active,
        max_seats,
        max_devices,
        expires_at,
        features,
        created_at: now,
    })
}

/// License management routes
pub struct LicenseRoutes;

impl LicenseRoutes {
    /// Create all license routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/licenses",
                get(Self::handle_list_licenses).post(Self::handle_create_license),
            )
            .route(
                "/licenses/:license_id",
                get(Self::handle_get_license).delete(Self::handle_delete_license),
            )
            .route(
                "/licenses/:license_id/status",
                put(Self::handle_change_status),
            )
            .with_state(resources)
    }

    async fn handle_list_licenses(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
    ) -> Result<Json<ApiResponse<Vec<License>>>, AppError> {
        let licenses = resources.store.list_licenses(tenant.id).await?;
        Ok(Json(ApiResponse::ok(licenses)))
    }

    async fn handle_get_license(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
        Path(license_id): Path<Uuid>,
    ) -> Result<Json<ApiResponse<LicenseDetails>>, AppError> {
        let license = resources
            .store
            .get_license(tenant.id, license_id)
            .await?
            .ok_or_else(|| AppError::not_found("License"))?;
        let activations = resources.store.activations_for_license(license.id).await?;

        Ok(Json(ApiResponse::ok(LicenseDetails {
            effective_status: effective_status(&license, Utc::now()),
            license,
            activations,
        })))
    }

    async fn handle_create_license(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
        ApiJson(request): ApiJson<NewLicense>,
    ) -> Result<(StatusCode, Json<ApiResponse<License>>), AppError> {
        resources
            .store
            .get_product(tenant.id, request.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        let plan = match request.plan_id {
            Some(plan_id) => Some(
                resources
                    .store
                    .get_plan(plan_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Plan"))?,
            ),
            None => None,
        };

        let assign_to: Vec<String> = request
            .assign_to
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        let license = instantiate_license(tenant.id, &request, plan.as_ref(), Utc::now())?;
        resources
            .quota
            .create_license_guarded(&license, &assign_to)
            .await?;
        info!(tenant.id = %tenant.id, license.id = %license.id, "License created");

        Ok((StatusCode::CREATED, Json(ApiResponse::ok(license))))
    }

    async fn handle_delete_license(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
        Path(license_id): Path<Uuid>,
    ) -> Result<Json<ApiResponse<Value>>, AppError> {
        if !resources.quota.delete_license(tenant.id, license_id).await? {
            return Err(AppError::not_found("License"));
        }
        Ok(Json(ApiResponse::ok(
            json!({ "deleted": true, "id": license_id }),
        )))
    }

    async fn handle_change_status(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
        Path(license_id): Path<Uuid>,
        ApiJson(request): ApiJson<StatusChangeRequest>,
    ) -> Result<Json<ApiResponse<License>>, AppError> {
        let next: LicenseStatus = request.status.parse().map_err(AppError::invalid_input)?;
        let mut license = resources
            .store
            .get_license(tenant.id, license_id)
            .await?
            .ok_or_else(|| AppError::not_found("License"))?;

        let current = effective_status(&license, Utc::now());
        if current == next {
            return Ok(Json(ApiResponse::ok(license)));
        }
        if !current.can_transition_to(next, request.force) {
            return Err(AppError::conflict(format!(
                "Cannot change license status from {current} to {next}"
            )));
        }

        resources
            .store
            .update_license_status(license.id, next)
            .await?;
        AuditRecorder::new(resources.store.clone())
            .record(NewAuditEntry::new(
                tenant.id,
                audit::LICENSE_STATUS_CHANGED,
                audit::ENTITY_LICENSE,
                Some(license.id.to_string()),
                json!({ "from": current, "to": next, "force": request.force }),
            ))
            .await;
        info!(tenant.id = %tenant.id, license.id = %license.id, from = %current, to = %next, "License status changed");

        license.status = next;
        Ok(Json(ApiResponse::ok(license)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(product_id: Uuid) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            product_id,
            name: "Team".to_owned(),
            max_seats: Some(5),
            max_devices: Some(10),
            expires_in_days: Some(30),
            features: json!({ "export": true }),
        }
    }

    fn request(product_id: Uuid) -> NewLicense {
        NewLicense {
            product_id,
            plan_id: None,
            max_seats: None,
            max_devices: None,
            expires_at: None,
            features: None,
            assign_to: Vec::new(),
        }
    }

    #[test]
    fn test_plan_fills_unset_attributes() {
        let product_id = Uuid::new_v4();
        let plan = plan(product_id);
        let now = Utc::now();
        let mut req = request(product_id);
        req.max_seats = Some(2);

        let license = instantiate_license(TenantId::new(), &req, Some(&plan), now).unwrap();
        assert_eq!(license.max_seats, Some(2));
        assert_eq!(license.max_devices, Some(10));
        assert_eq!(license.expires_at, Some(now + Duration::days(30)));
        assert_eq!(license.features, json!({ "export": true }));
        assert_eq!(license.plan_id, Some(plan.id));
        assert_eq!(license.status, LicenseStatus::Active);
    }

    #[test]
    fn test_no_plan_means_unlimited() {
        let license =
            instantiate_license(TenantId::new(), &request(Uuid::new_v4()), None, Utc::now())
                .unwrap();
        assert_eq!(license.max_seats, None);
        assert_eq!(license.max_devices, None);
        assert_eq!(license.expires_at, None);
        assert_eq!(license.features, json!({}));
    }

    #[test]
    fn test_plan_from_other_product_rejected() {
        let plan = plan(Uuid::new_v4());
        let result =
            instantiate_license(TenantId::new(), &request(Uuid::new_v4()), Some(&plan), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_limit_rejected() {
        let mut req = request(Uuid::new_v4());
        req.max_devices = Some(-1);
        assert!(instantiate_license(TenantId::new(), &req, None, Utc::now()).is_err());
    }
}
