// ABOUTME: Route module organization and router assembly for the LaaS HTTP API
// ABOUTME: Wires the authenticated routes behind auth, rate limiting, and caching layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! Route module for the license service
//!
//! Each domain module contains only route definitions and thin handlers that
//! delegate to the validation engine, the quota guard, or the store.

/// Health check route
pub mod health;
/// License CRUD and status transitions
pub mod licenses;
/// Product and plan catalog
pub mod products;
/// Subscription quota view
pub mod quota;
/// License validation
pub mod validation;

pub use health::HealthRoutes;
pub use licenses::LicenseRoutes;
pub use products::ProductRoutes;
pub use quota::QuotaRoutes;
pub use validation::ValidationRoutes;

use crate::errors::AppError;
use crate::middleware::{enforce_rate_limit, require_api_key, response_cache};
use crate::resources::ServerResources;
use axum::{extract::FromRequest, http::Request, middleware, Router};
use laas_core::constants::headers::X_REQUEST_ID;
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Success envelope used by every handler
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always true
    pub success: bool,
    /// Payload
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a payload
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// JSON body extractor whose rejections render as 400 `INVALID_INPUT`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Build the complete application router
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let protected = Router::new()
        .merge(ValidationRoutes::routes(resources.clone()))
        .merge(ProductRoutes::routes(resources.clone()))
        .merge(LicenseRoutes::routes(resources.clone()))
        .merge(QuotaRoutes::routes(resources.clone()))
        .layer(middleware::from_fn_with_state(
            resources.clone(),
            response_cache,
        ))
        .layer(middleware::from_fn_with_state(
            resources.clone(),
            enforce_rate_limit,
        ))
        .layer(middleware::from_fn_with_state(
            resources.clone(),
            require_api_key,
        ));

    let request_timeout = resources.config.request_timeout;
    let header_name = axum::http::HeaderName::from_static(X_REQUEST_ID);

    Router::new()
        .merge(HealthRoutes::routes(resources))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

fn make_request_span<B>(request: &Request<B>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
        tenant_id = tracing::field::Empty,
    )
}
