// ABOUTME: License validation route handler
// ABOUTME: POST /validate answers whether an end user may use the product and records the activation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::{ApiJson, ApiResponse};
use crate::errors::AppError;
use crate::middleware::AuthenticatedTenant;
use crate::resources::ServerResources;
use crate::validation::{ValidationRequest, Verdict};
use axum::{extract::State, routing::post, Extension, Json, Router};
use std::sync::Arc;

/// License validation routes
pub struct ValidationRoutes;

impl ValidationRoutes {
    /// Create the validation route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/validate", post(Self::handle_validate))
            .with_state(resources)
    }

    /// A negative verdict is still a 200 with `valid: false`
    async fn handle_validate(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
        ApiJson(request): ApiJson<ValidationRequest>,
    ) -> Result<Json<ApiResponse<Verdict>>, AppError> {
        if request.user_id.trim().is_empty() {
            return Err(AppError::missing_field("userId"));
        }
        if request.device_id.as_deref().is_some_and(|d| d.trim().is_empty()) {
            return Err(AppError::invalid_input("deviceId must not be empty"));
        }

        let verdict = resources.validation.validate(tenant.id, &request).await?;
        Ok(Json(ApiResponse::ok(verdict)))
    }
}
