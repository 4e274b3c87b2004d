// ABOUTME: Rate limiting middleware for authenticated HTTP requests
// ABOUTME: Counts each request against the tenant window and emits X-RateLimit headers or a 429
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! # Rate Limiting Middleware with HTTP Headers
//!
//! Every admitted response carries `X-RateLimit-Limit`, `X-RateLimit-Remaining`
//! and `X-RateLimit-Reset`. A rejected request gets a 429 with `Retry-After`.

use super::auth::AuthenticatedTenant;
use crate::errors::AppError;
use crate::rate_limiting::RateLimitDecision;
use crate::resources::ServerResources;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{HeaderMap, HeaderValue};
use laas_core::constants::headers;
use std::sync::Arc;

/// Build the rate limit headers for a decision
#[must_use]
pub fn create_rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut map = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
        map.insert(headers::X_RATE_LIMIT_LIMIT, value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        map.insert(headers::X_RATE_LIMIT_REMAINING, value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.reset_at.timestamp().to_string()) {
        map.insert(headers::X_RATE_LIMIT_RESET, value);
    }
    if let Some(retry_after) = decision.retry_after_secs {
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            map.insert(headers::RETRY_AFTER, value);
        }
    }

    map
}

/// Admit or throttle the authenticated tenant
///
/// Must run inside the authentication layer. Requests without a tenant pass
/// through uncounted.
pub async fn enforce_rate_limit(
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

    let decision = resources.rate_limiter.admit(tenant_id).await;
    let rate_headers = create_rate_limit_headers(&decision);

    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        AppError::rate_limited(decision.limit, decision.retry_after_secs.unwrap_or(1))
            .into_response()
    };

    response.headers_mut().extend(rate_headers);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_headers_for_admitted_request() {
        let reset_at = Utc::now() + Duration::seconds(30);
        let decision = RateLimitDecision {
            allowed: true,
            limit: 100,
            remaining: 42,
            reset_at,
            retry_after_secs: None,
        };

        let map = create_rate_limit_headers(&decision);
        assert_eq!(map[headers::X_RATE_LIMIT_LIMIT], "100");
        assert_eq!(map[headers::X_RATE_LIMIT_REMAINING], "42");
        assert_eq!(
            map[headers::X_RATE_LIMIT_RESET],
            reset_at.timestamp().to_string().as_str()
        );
        assert!(map.get(headers::RETRY_AFTER).is_none());
    }

    #[test]
    fn test_headers_for_rejected_request() {
        let decision = RateLimitDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            reset_at: Utc::now() + Duration::seconds(9),
            retry_after_secs: Some(9),
        };

        let map = create_rate_limit_headers(&decision);
        assert_eq!(map[headers::X_RATE_LIMIT_REMAINING], "0");
        assert_eq!(map[headers::RETRY_AFTER], "9");
    }
}
