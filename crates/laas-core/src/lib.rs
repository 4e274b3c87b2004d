// ABOUTME: Core types and constants for the license-as-a-service backend
// ABOUTME: Foundation crate with error handling, domain models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

#![deny(unsafe_code)]

//! # LaaS Core
//!
//! Foundation crate providing shared types and constants for the multi-tenant
//! license validation service. This crate is designed to change infrequently,
//! enabling incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `AppResult`
//! - **constants**: Defaults for cache, rate limiting, quota, and HTTP headers
//! - **models**: Tenants, licenses, activations, audit entries, and subscription quotas

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants and configuration defaults organized by domain
pub mod constants;

/// Core data models (Tenant, License, Activation, `SubscriptionQuota`, etc.)
pub mod models;
