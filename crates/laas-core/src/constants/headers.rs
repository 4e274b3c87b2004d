// ABOUTME: HTTP header names emitted by the request pipeline
// ABOUTME: Rate limit, cache status, and authentication headers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

/// Maximum requests allowed in the current window
pub const X_RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
/// Remaining requests in the current window
pub const X_RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
/// Unix timestamp (seconds) when the window resets
pub const X_RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";
/// Seconds to wait before retrying a throttled request
pub const RETRY_AFTER: &str = "Retry-After";
/// Cache status: HIT or MISS
pub const X_CACHE: &str = "X-Cache";
/// Alternative API key header
pub const X_API_KEY: &str = "x-api-key";
/// Request correlation header
pub const X_REQUEST_ID: &str = "x-request-id";
