// ABOUTME: Subscription quota route handler
// ABOUTME: Reports the tenant's license allowance, usage, and whether creation is currently allowed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::ApiResponse;
use crate::errors::AppError;
use crate::middleware::AuthenticatedTenant;
use crate::quota::QuotaCheck;
use crate::resources::ServerResources;
use axum::{extract::State, routing::get, Extension, Json, Router};
use std::sync::Arc;

/// Subscription quota routes
pub struct QuotaRoutes;

impl QuotaRoutes {
    /// Create the quota route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/quota", get(Self::handle_get_quota))
            .with_state(resources)
    }

    async fn handle_get_quota(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
    ) -> Result<Json<ApiResponse<QuotaCheck>>, AppError> {
        let check = resources.quota.check_limit(tenant.id).await?;
        Ok(Json(ApiResponse::ok(check)))
    }
}
