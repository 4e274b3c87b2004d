// ABOUTME: HTTP middleware for authentication, rate limiting, and response caching
// ABOUTME: Layers run in that order so throttling and caching always see a resolved tenant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

/// API key authentication
pub mod auth;
/// Read-through response cache and tag invalidation
pub mod cache;
/// Per-tenant fixed-window throttling
pub mod rate_limiting;

pub use auth::{require_api_key, AuthenticatedTenant};
pub use cache::response_cache;
pub use rate_limiting::{create_rate_limit_headers, enforce_rate_limit};
