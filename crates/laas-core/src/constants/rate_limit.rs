// ABOUTME: Fixed-window rate limiting defaults
// ABOUTME: Window length and request ceiling applied per tenant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

/// Requests allowed per tenant per window
pub const DEFAULT_MAX_REQUESTS: u64 = 100;

/// Window length in milliseconds
pub const DEFAULT_WINDOW_MS: u64 = 60_000;
