// ABOUTME: Tenant API key generation, format checks, and hashing
// ABOUTME: Only the SHA-256 hash of a key is stored; the plaintext is shown once at creation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! # API Key Management
//!
//! Tenant integrations authenticate with a `laas_live_` key. The key is
//! returned once at creation time and looked up afterwards by its hash.

use crate::errors::{AppError, AppResult};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

/// Prefix of every tenant API key
pub const KEY_PREFIX: &str = "laas_live_";

const RANDOM_PART_LEN: usize = 32;

/// A freshly generated key
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    /// Plaintext key, shown to the tenant once
    pub full_key: String,
    /// First characters of the key, safe to display
    pub key_prefix: String,
    /// Hex SHA-256 of the full key, persisted for lookup
    pub key_hash: String,
}

/// Generate a new tenant API key
#[must_use]
pub fn generate_api_key() -> GeneratedApiKey {
    let random_part: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_PART_LEN)
        .map(char::from)
        .collect();

    let full_key = format!("{KEY_PREFIX}{random_part}");
    let key_prefix = full_key.chars().take(KEY_PREFIX.len() + 4).collect();
    let key_hash = hash_api_key(&full_key);

    GeneratedApiKey {
        full_key,
        key_prefix,
        key_hash,
    }
}

/// Hash an API key for storage and comparison
#[must_use]
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Reject strings that cannot be a key before touching the store
///
/// # Errors
///
/// Returns an authentication error if the key is malformed
pub fn validate_key_format(api_key: &str) -> AppResult<()> {
    let Some(random_part) = api_key.strip_prefix(KEY_PREFIX) else {
        return Err(AppError::auth_invalid("Invalid API key format"));
    };
    if random_part.len() != RANDOM_PART_LEN || !random_part.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(AppError::auth_invalid("Invalid API key format"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_is_well_formed() {
        let key = generate_api_key();
        assert!(key.full_key.starts_with(KEY_PREFIX));
        assert_eq!(key.full_key.len(), KEY_PREFIX.len() + RANDOM_PART_LEN);
        assert!(validate_key_format(&key.full_key).is_ok());
        assert_eq!(key.key_hash, hash_api_key(&key.full_key));
        assert!(key.full_key.starts_with(&key.key_prefix));
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = hash_api_key("laas_live_example");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_api_key("laas_live_example"));
        assert_ne!(hash, hash_api_key("laas_live_other"));
    }

    #[test]
    fn test_malformed_keys_rejected() {
        assert!(validate_key_format("pk_live_abc").is_err());
        assert!(validate_key_format("laas_live_short").is_err());
        assert!(validate_key_format(&format!("laas_live_{}", "!".repeat(32))).is_err());
    }
}
