// ABOUTME: Store factory selecting the LicenseStore backend from the connection string
// ABOUTME: sqlite: URLs open SQLite; memory: selects the process-local store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use super::memory::MemoryLicenseStore;
use super::sqlite::SqliteLicenseStore;
use super::LicenseStore;
use crate::errors::{AppError, AppResult};
use std::sync::Arc;
use tracing::info;

/// Supported store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// SQLite via sqlx
    Sqlite,
    /// Process-local, lost on restart
    Memory,
}

/// Detect the backend from a connection string
///
/// # Errors
///
/// Returns an error for unsupported schemes
pub fn detect_store_type(database_url: &str) -> AppResult<StoreType> {
    if database_url.starts_with("sqlite:") {
        Ok(StoreType::Sqlite)
    } else if database_url == "memory:" {
        Ok(StoreType::Memory)
    } else {
        Err(AppError::config(format!(
            "Unsupported DATABASE_URL scheme: {}",
            database_url.split(':').next().unwrap_or_default()
        )))
    }
}

/// Open and migrate the store named by `database_url`
///
/// # Errors
///
/// Returns an error if the scheme is unsupported or the store cannot be opened
pub async fn open_store(database_url: &str) -> AppResult<Arc<dyn LicenseStore>> {
    match detect_store_type(database_url)? {
        StoreType::Sqlite => {
            info!("Opening SQLite license store");
            Ok(Arc::new(SqliteLicenseStore::new(database_url).await?))
        }
        StoreType::Memory => {
            info!("Using in-memory license store (data is lost on restart)");
            Ok(Arc::new(MemoryLicenseStore::new()))
        }
    }
}
