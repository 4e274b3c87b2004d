// ABOUTME: Read-through response cache middleware and tag invalidation on mutations
// ABOUTME: Serves cached GET bodies with X-Cache and Cache-Control, stores 200 JSON responses on miss
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::auth::AuthenticatedTenant;
use crate::cache::tags::{mutation_tags, read_tags, scoped};
use crate::cache::{CacheKey, CacheLookup, CachedResponse};
use crate::errors::AppError;
use crate::resources::ServerResources;
use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use laas_core::constants::{cache::MAX_CACHEABLE_BODY_BYTES, headers::X_CACHE};
use laas_core::models::TenantId;
use std::sync::Arc;
use tracing::debug;

const HIT: &str = "HIT";
const MISS: &str = "MISS";

/// Cache GET responses per tenant and invalidate tags after successful mutations
///
/// Must run inside the authentication layer.
pub async fn response_cache(
    State(resources): State<Arc<ServerResources>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(tenant_id) = req
        .extensions()
        .get::<AuthenticatedTenant>()
        .map(|auth| auth.0.id)
    else {
        return next.run(req).await;
    };

    let path = req.uri().path().to_owned();
    if req.method() == Method::GET {
        cached_read(&resources, tenant_id, req, next, &path).await
    } else {
        let response = next.run(req).await;
        if response.status().is_success() {
            let tags = scoped(tenant_id, mutation_tags(&path));
            if !tags.is_empty() {
                let removed = resources.cache.invalidate_by_tags(&tags).await;
                debug!(tenant.id = %tenant_id, path = %path, removed, "Invalidated cached responses");
            }
        }
        response
    }
}

async fn cached_read(
    resources: &ServerResources,
    tenant_id: TenantId,
    req: Request,
    next: Next,
    path: &str,
) -> Response {
    let Some(resource_tags) = read_tags(path) else {
        return next.run(req).await;
    };

    let key = CacheKey::new(
        Method::GET.as_str(),
        path,
        &tenant_id.to_string(),
        req.uri().query(),
    );

    if let CacheLookup::Hit(cached) = resources.cache.lookup(&key).await {
        return hit_response(cached);
    }

    let tags = scoped(tenant_id, resource_tags);
    let seen = resources.cache.tag_versions(&tags);
    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return with_cache_status(response, MISS);
    }

    let cacheable = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_CACHEABLE_BODY_BYTES as u64);
    if !cacheable {
        return with_cache_status(response, MISS);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHEABLE_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::internal(format!("Failed to buffer response body: {e}"))
                .into_response();
        }
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        resources
            .cache
            .store_unless_invalidated(&key, text.to_owned(), None, &tags, &seen)
            .await;
    }

    parts.headers.insert(X_CACHE, HeaderValue::from_static(MISS));
    if let Ok(value) = HeaderValue::from_str(&max_age(resources.cache.default_ttl().as_secs())) {
        parts.headers.insert(header::CACHE_CONTROL, value);
    }
    Response::from_parts(parts, Body::from(bytes))
}

fn hit_response(cached: CachedResponse) -> Response {
    let mut response = (StatusCode::OK, cached.body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(X_CACHE, HeaderValue::from_static(HIT));
    if let Ok(value) = HeaderValue::from_str(&max_age(cached.remaining_ttl.as_secs())) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    response
}

fn with_cache_status(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(status));
    response
}

fn max_age(seconds: u64) -> String {
    format!("public, max-age={seconds}")
}
