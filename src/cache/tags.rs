// ABOUTME: Tenant-scoped cache tag names and the route-to-tag mapping
// ABOUTME: Reads are stored under resource tags; mutations invalidate every tag they can affect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

use laas_core::models::TenantId;

/// Tag resource names
pub mod resources {
    /// Product list and details
    pub const PRODUCTS: &str = "products";
    /// Plans belonging to products
    pub const PLANS: &str = "plans";
    /// License list and details
    pub const LICENSES: &str = "licenses";
    /// Subscription quota view
    pub const QUOTA: &str = "quota";
    /// End users
    pub const USERS: &str = "users";
    /// Activations
    pub const ACTIVATIONS: &str = "activations";
}

/// Tenant-scoped tag, e.g. `tenant:T:products`
#[must_use]
pub fn tenant_tag(tenant_id: TenantId, resource: &str) -> String {
    format!("tenant:{tenant_id}:{resource}")
}

fn first_segment(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or_default()
}

/// Tags a cacheable read is stored under; `None` means the path is not cached
#[must_use]
pub fn read_tags(path: &str) -> Option<&'static [&'static str]> {
    match first_segment(path) {
        "products" => Some(&[resources::PRODUCTS]),
        "licenses" => Some(&[resources::LICENSES]),
        _ => None,
    }
}

/// Tags invalidated by a successful mutation on `path`
#[must_use]
pub fn mutation_tags(path: &str) -> &'static [&'static str] {
    match first_segment(path) {
        "products" => &[resources::PRODUCTS, resources::PLANS],
        "licenses" => &[resources::LICENSES, resources::QUOTA, resources::USERS],
        "validate" => &[
            resources::LICENSES,
            resources::ACTIVATIONS,
            resources::USERS,
        ],
        _ => &[],
    }
}

/// Scope resource names to a tenant
#[must_use]
pub fn scoped(tenant_id: TenantId, resources: &[&str]) -> Vec<String> {
    resources
        .iter()
        .map(|resource| tenant_tag(tenant_id, resource))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_mutation_invalidates_product_reads() {
        let reads = read_tags("/products").unwrap();
        let mutations = mutation_tags("/products");
        assert!(reads.iter().all(|tag| mutations.contains(tag)));
    }

    #[test]
    fn test_license_reads_invalidated_by_validation() {
        let reads = read_tags("/licenses/abc").unwrap();
        assert!(reads.iter().all(|tag| mutation_tags("/validate").contains(tag)));
    }

    #[test]
    fn test_uncached_paths() {
        assert!(read_tags("/quota").is_none());
        assert!(read_tags("/health").is_none());
        assert!(mutation_tags("/health").is_empty());
    }

    #[test]
    fn test_tags_are_tenant_scoped() {
        let tenant = TenantId::new();
        assert_eq!(
            tenant_tag(tenant, resources::PRODUCTS),
            format!("tenant:{tenant}:products")
        );
    }
}
