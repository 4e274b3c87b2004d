// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Re-exports the environment-resolved server, backend, cache, and rate limit settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

/// Environment and server configuration
pub mod environment;

pub use environment::{
    CacheSettings, RateLimitSettings, RedisConnectionConfig, ServerConfig, SharedBackendConfig,
};
