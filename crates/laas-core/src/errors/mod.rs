// ABOUTME: Unified error type and error codes shared by every layer of the service
// ABOUTME: Maps each failure class to a stable code and HTTP status without leaking internals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! # Unified Error Handling System
//!
//! Business non-validity (an expired or revoked license, an exhausted seat
//! count) is never an `AppError`: it is a successful verdict. `AppError` is
//! reserved for failures of the request itself (authentication, input,
//! throttling, quota) and for infrastructure failures.

/// Axum `IntoResponse` integration
#[cfg(feature = "http-response")]
pub mod http;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication & Authorization
    /// No credentials were supplied
    AuthRequired,
    /// Credentials were supplied but do not resolve to a tenant
    AuthInvalid,
    /// Caller is authenticated but not allowed to perform the action
    PermissionDenied,
    /// Tenant exists but is suspended or inactive
    TenantSuspended,

    // Throttling & Quota
    /// Per-tenant request window exhausted
    RateLimitExceeded,
    /// Subscription license quota exhausted or missing
    QuotaExceeded,

    // Validation
    /// Malformed request payload
    InvalidInput,
    /// A required field is absent
    MissingRequiredField,

    // Resources
    /// Entity does not exist for this tenant
    ResourceNotFound,
    /// Entity state does not allow the requested change
    ResourceConflict,

    // Infrastructure
    /// Shared cache / rate-limit backend failed
    CacheUnavailable,
    /// A downstream dependency is unavailable
    ExternalServiceUnavailable,
    /// Durable store failed
    DatabaseError,
    /// Configuration could not be resolved
    ConfigError,
    /// Payload could not be (de)serialized
    SerializationError,
    /// Anything else
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput | Self::MissingRequiredField => 400,
            Self::AuthRequired | Self::AuthInvalid => 401,
            Self::PermissionDenied | Self::TenantSuspended | Self::QuotaExceeded => 403,
            Self::ResourceNotFound => 404,
            Self::ResourceConflict => 409,
            Self::RateLimitExceeded => 429,
            Self::CacheUnavailable | Self::ExternalServiceUnavailable => 503,
            Self::DatabaseError | Self::ConfigError | Self::SerializationError | Self::InternalError => 500,
        }
    }

    /// Get a user-facing description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required to access this resource",
            Self::AuthInvalid => "The provided API key is invalid",
            Self::PermissionDenied => "You do not have permission to perform this action",
            Self::TenantSuspended => "The tenant account is not active",
            Self::RateLimitExceeded => "Rate limit exceeded. Please slow down your requests",
            Self::QuotaExceeded => "License quota exceeded for your current subscription",
            Self::InvalidInput => "The provided input is invalid",
            Self::MissingRequiredField => "A required field is missing from the request",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ResourceConflict => "The resource is in a state that does not allow this change",
            Self::CacheUnavailable => "The cache backend is unavailable",
            Self::ExternalServiceUnavailable => "An external service is currently unavailable",
            Self::DatabaseError => "Database operation failed",
            Self::ConfigError => "Configuration error encountered",
            Self::SerializationError => "Data serialization/deserialization failed",
            Self::InternalError => "An internal server error occurred",
        }
    }

    /// Whether the message of this error is safe to show to API callers
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        self.http_status() < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Structured details returned alongside client errors
    pub details: Option<serde_json::Value>,
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Missing API key")
    }

    /// Invalid authentication
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Tenant is not allowed to use the service
    pub fn tenant_suspended(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TenantSuspended, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// A required field is missing
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Missing required field: {field}"),
        )
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Illegal state change
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceConflict, message)
    }

    /// Rate limit exceeded, carrying the number of seconds the caller should wait
    #[must_use]
    pub fn rate_limited(limit: u64, retry_after_secs: u64) -> Self {
        Self::new(
            ErrorCode::RateLimitExceeded,
            format!("Rate limit of {limit} requests exceeded"),
        )
        .with_details(serde_json::json!({ "retryAfter": retry_after_secs }))
    }

    /// License quota denied, carrying the quota snapshot if one exists
    pub fn quota_exceeded(message: impl Into<String>, quota: Option<serde_json::Value>) -> Self {
        let error = Self::new(ErrorCode::QuotaExceeded, message);
        match quota {
            Some(snapshot) => error.with_details(serde_json::json!({ "quota": snapshot })),
            None => error,
        }
    }

    /// Shared backend failure
    pub fn cache_backend(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CacheUnavailable, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Message that may be shown to the API caller
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.code.is_client_error() {
            self.message.clone()
        } else {
            self.code.description().to_owned()
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string())
    }
}

/// JSON body returned for every error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Human-readable message
    pub error: String,
    /// Stable error code
    pub code: ErrorCode,
    /// Seconds to wait before retrying (rate limiting only)
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Structured details for client errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        let retry_after = error
            .details
            .as_ref()
            .and_then(|d| d.get("retryAfter"))
            .and_then(serde_json::Value::as_u64);
        let details = if error.code.is_client_error() && retry_after.is_none() {
            error.details.clone()
        } else {
            None
        };
        Self {
            success: false,
            error: error.public_message(),
            code: error.code,
            retry_after,
            details,
        }
    }
}
