// ABOUTME: Health check route handler for service monitoring
// ABOUTME: Reports store reachability, cache backend health, and the configured backend mode
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! Health check route for load balancers and monitoring.
//! Unauthenticated, not rate limited, never cached.

use super::ApiResponse;
use crate::cache::factory::BackendMode;
use crate::resources::ServerResources;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use laas_core::constants::service::SERVICE_NAME;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Health payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// `healthy` or `degraded`
    pub status: &'static str,
    /// Service name
    pub service: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Whether the durable store answered
    pub store: bool,
    /// Whether the cache backend answered
    pub cache: bool,
    /// Whether a shared backend is configured
    pub backend_mode: BackendMode,
    /// RFC 3339 check time
    pub timestamp: String,
}

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health check route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .with_state(resources)
    }

    async fn handle_health(
        State(resources): State<Arc<ServerResources>>,
    ) -> (StatusCode, Json<ApiResponse<HealthStatus>>) {
        let store = match resources.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Store health check failed");
                false
            }
        };
        let cache = resources.cache.health_check().await;

        let status = HealthStatus {
            status: if store { "healthy" } else { "degraded" },
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            store,
            cache,
            backend_mode: resources.backend_mode,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let code = if store {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (code, Json(ApiResponse::ok(status)))
    }
}
