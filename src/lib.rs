// ABOUTME: Main library entry point for the multi-tenant License-as-a-Service backend
// ABOUTME: License validation, subscription quota gating, response caching, and rate limiting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

#![deny(unsafe_code)]

//! # LaaS Server
//!
//! Validation and resilience layer of a multi-tenant licensing platform.
//! Tenants authenticate with API keys and ask whether their end users hold a
//! usable license; the answer is recorded as an activation and audited.
//!
//! ## Features
//!
//! - **License validation**: lazy expiry, seat and device limits, idempotent activations
//! - **Subscription quota**: license creation gated by the tenant's billing allowance
//! - **Response cache**: per-tenant read-through cache with tag invalidation
//! - **Rate limiting**: per-tenant fixed window with atomic counting
//! - **Dual backends**: Redis when configured, an in-process fallback always
//!
//! ## Architecture
//!
//! - **`laas_core`**: errors, constants, and models shared by every layer
//! - **`cache`**: backends, failover composition, cache store, and tags
//! - **`database_plugins`**: the `LicenseStore` trait with SQLite and memory stores
//! - **`routes`** / **`middleware`**: the axum HTTP surface

/// Best-effort audit trail writer
pub mod audit;

/// API key generation and hashing
pub mod api_keys;

/// Response cache, shared and in-process backends, and failover
pub mod cache;

/// Environment-driven configuration
pub mod config;

/// `LicenseStore` trait and its SQLite and in-memory implementations
pub mod database_plugins;

/// Error types re-exported from `laas_core`
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Authentication, rate limiting, and cache middleware
pub mod middleware;

/// Subscription quota guard
pub mod quota;

/// Fixed-window per-tenant rate limiter
pub mod rate_limiting;

/// Shared server resources
pub mod resources;

/// HTTP routes and router assembly
pub mod routes;

/// License validation engine
pub mod validation;

pub use laas_core::{constants, models};
