// ABOUTME: Product and plan catalog route handlers
// ABOUTME: Lists and creates tenant products, and attaches plans that licenses are instantiated from
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::{ApiJson, ApiResponse};
use crate::errors::AppError;
use crate::middleware::AuthenticatedTenant;
use crate::resources::ServerResources;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use laas_core::models::{NewProduct, Plan, Product};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Request body for creating a plan under a product
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    /// Display name
    pub name: String,
    /// Seat ceiling copied into each license
    #[serde(default)]
    pub max_seats: Option<i64>,
    /// Device ceiling copied into each license
    #[serde(default)]
    pub max_devices: Option<i64>,
    /// License lifetime from issuance
    #[serde(default)]
    pub expires_in_days: Option<i64>,
    /// Feature flags copied into each license
    #[serde(default)]
    pub features: Option<Value>,
}

/// Product catalog routes
pub struct ProductRoutes;

impl ProductRoutes {
    /// Create all product routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/products",
                get(Self::handle_list_products).post(Self::handle_create_product),
            )
            .route("/products/:product_id", get(Self::handle_get_product))
            .route("/products/:product_id/plans", post(Self::handle_create_plan))
            .with_state(resources)
    }

    async fn handle_list_products(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
    ) -> Result<Json<ApiResponse<Vec<Product>>>, AppError> {
        let products = resources.store.list_products(tenant.id).await?;
        Ok(Json(ApiResponse::ok(products)))
    }

    async fn handle_get_product(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
        Path(product_id): Path<Uuid>,
    ) -> Result<Json<ApiResponse<Product>>, AppError> {
        let product = resources
            .store
            .get_product(tenant.id, product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;
        Ok(Json(ApiResponse::ok(product)))
    }

    async fn handle_create_product(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
        ApiJson(request): ApiJson<NewProduct>,
    ) -> Result<(StatusCode, Json<ApiResponse<Product>>), AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::missing_field("name"));
        }

        let product = Product {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            name: name.to_owned(),
            description: request.description,
            created_at: Utc::now(),
        };
        resources.store.create_product(&product).await?;
        info!(tenant.id = %tenant.id, product.id = %product.id, "Product created");

        Ok((StatusCode::CREATED, Json(ApiResponse::ok(product))))
    }

    async fn handle_create_plan(
        State(resources): State<Arc<ServerResources>>,
        Extension(AuthenticatedTenant(tenant)): Extension<AuthenticatedTenant>,
        Path(product_id): Path<Uuid>,
        ApiJson(request): ApiJson<CreatePlanRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<Plan>>), AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::missing_field("name"));
        }
        for (field, value) in [
            ("maxSeats", request.max_seats),
            ("maxDevices", request.max_devices),
            ("expiresInDays", request.expires_in_days),
        ] {
            if value.is_some_and(|v| v < 0) {
                return Err(AppError::invalid_input(format!(
                    "{field} must not be negative"
                )));
            }
        }

        resources
            .store
            .get_product(tenant.id, product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        let plan = Plan {
            id: Uuid::new_v4(),
            product_id,
            name: name.to_owned(),
            max_seats: request.max_seats,
            max_devices: request.max_devices,
            expires_in_days: request.expires_in_days,
            features: request
                .features
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        };
        resources.store.create_plan(&plan).await?;

        Ok((StatusCode::CREATED, Json(ApiResponse::ok(plan))))
    }
}
