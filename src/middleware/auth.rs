// ABOUTME: API key authentication middleware resolving the calling tenant
// ABOUTME: Accepts a Bearer token or x-api-key header and injects AuthenticatedTenant into extensions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use crate::api_keys::{hash_api_key, validate_key_format};
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::resources::ServerResources;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use laas_core::constants::headers::X_API_KEY;
use laas_core::models::Tenant;
use std::sync::Arc;

/// Tenant resolved from the request credentials
#[derive(Debug, Clone)]
pub struct AuthenticatedTenant(pub Tenant);

/// Pull the API key from `Authorization: Bearer` or `x-api-key`
#[must_use]
pub fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .or_else(|| headers.get(X_API_KEY).and_then(|h| h.to_str().ok()))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Resolve an API key to an active tenant
///
/// # Errors
///
/// Returns 401 for a missing or unknown key and 403 for an inactive tenant
pub async fn authenticate(resources: &ServerResources, api_key: Option<&str>) -> AppResult<Tenant> {
    let api_key = api_key.ok_or_else(AppError::auth_required)?;
    validate_key_format(api_key).inspect_err(|_| {
        AppLogger::log_auth_event(None, "api_key_malformed", false);
    })?;

    let Some(tenant) = resources
        .store
        .find_tenant_by_api_key(&hash_api_key(api_key))
        .await?
    else {
        AppLogger::log_auth_event(None, "api_key_unknown", false);
        return Err(AppError::auth_invalid("Invalid API key"));
    };

    let tenant_id = tenant.id.to_string();
    if !tenant.is_active() {
        AppLogger::log_auth_event(Some(&tenant_id), "tenant_inactive", false);
        return Err(AppError::tenant_suspended(format!(
            "Tenant is {}",
            tenant.status.as_str()
        )));
    }

    AppLogger::log_auth_event(Some(&tenant_id), "api_key", true);
    Ok(tenant)
}

/// Reject unauthenticated requests, otherwise attach the tenant to the request
///
/// # Errors
///
/// Returns the authentication failure as the response
pub async fn require_api_key(
    State(resources): State<Arc<ServerResources>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let tenant = authenticate(&resources, extract_api_key(req.headers())).await?;

    tracing::Span::current().record("tenant_id", tenant.id.to_string());
    req.extensions_mut().insert(AuthenticatedTenant(tenant));

    Ok(next.run(req).await)
}
