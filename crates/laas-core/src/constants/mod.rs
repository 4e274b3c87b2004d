// ABOUTME: Application constants organized by domain
// ABOUTME: Cache, rate limiting, quota, audit, and HTTP header defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

/// Cache TTLs, capacity, and sweep intervals
pub mod cache;

/// Fixed-window rate limiting defaults
pub mod rate_limit;

/// HTTP header names exposed by the pipeline
pub mod headers;

/// Audit log action names
pub mod audit;

/// Subscription quota defaults
pub mod quota {
    /// License allowance granted when a billing price has no plan mapping
    pub const FALLBACK_MAX_LICENSES: i64 = 1;
}

/// Service identification used in logs and health responses
pub mod service {
    /// Service name reported by logging and health checks
    pub const SERVICE_NAME: &str = "laas-server";
}
