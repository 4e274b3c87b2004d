// ABOUTME: Error types for the server crate
// ABOUTME: Re-exports the unified error model from laas-core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

pub use laas_core::errors::{AppError, AppResult, ErrorCode, ErrorResponse};
