// ABOUTME: LaaS server binary: HTTP API plus operator commands for tenants and billing mappings
// ABOUTME: Configuration comes from the environment with a few CLI overrides
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LaaS Platform Contributors

//! # LaaS Server Binary
//!
//! Usage:
//! ```bash
//! # Run the HTTP API (default)
//! laas-server serve --http-port 8081
//!
//! # Provision a tenant and print its API key
//! laas-server create-tenant --name "Acme Corp"
//!
//! # Map a billing price to a license allowance
//! laas-server map-price --price-id price_team --name Team --max-licenses 25
//!
//! # Apply a verified billing event
//! laas-server apply-subscription --tenant-id <uuid> --price-id price_team --status active
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use laas_server::{
    api_keys::generate_api_key,
    config::ServerConfig,
    database_plugins::factory::open_store,
    logging,
    models::{PlanMapping, Tenant, TenantId},
    quota::{QuotaPolicy, SubscriptionEvent, SubscriptionQuotaGuard},
    resources::ServerResources,
    routes::build_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "laas-server")]
#[command(about = "Multi-tenant License-as-a-Service validation backend")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Override HTTP port
    #[arg(long, global = true)]
    http_port: Option<u16>,

    /// Override database URL
    #[arg(long, global = true)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Create a tenant and print its API key
    CreateTenant {
        /// Tenant display name
        #[arg(long)]
        name: String,
    },
    /// Map a billing price to a license allowance
    MapPrice {
        /// Billing price id
        #[arg(long)]
        price_id: String,
        /// Plan display name
        #[arg(long)]
        name: String,
        /// Licenses the plan allows
        #[arg(long)]
        max_licenses: i64,
    },
    /// Apply a billing subscription event to a tenant's quota
    ApplySubscription {
        /// Tenant id
        #[arg(long)]
        tenant_id: TenantId,
        /// Billing subscription id
        #[arg(long)]
        subscription_id: Option<String>,
        /// Billing price id
        #[arg(long)]
        price_id: Option<String>,
        /// Billing status, e.g. active, trialing, canceled
        #[arg(long)]
        status: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env().context("Failed to load configuration")?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    logging::init_from_env()?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::CreateTenant { name } => create_tenant(&config, &name).await,
        Command::MapPrice {
            price_id,
            name,
            max_licenses,
        } => map_price(&config, price_id, name, max_licenses).await,
        Command::ApplySubscription {
            tenant_id,
            subscription_id,
            price_id,
            status,
        } => {
            let event = SubscriptionEvent {
                tenant_id,
                subscription_id,
                price_id,
                status,
            };
            apply_subscription(&config, &event).await
        }
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    info!("Starting LaaS server");
    info!("{}", config.summary());

    let port = config.http_port;
    let resources = Arc::new(ServerResources::from_config(config).await?);
    let app = build_router(resources);

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {port}"))?;
    info!("HTTP server listening on port {port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}

async fn create_tenant(config: &ServerConfig, name: &str) -> Result<()> {
    let store = open_store(&config.database_url).await?;
    let tenant = Tenant::new(name);
    store.create_tenant(&tenant).await?;

    let key = generate_api_key();
    store
        .create_api_key(tenant.id, &key.key_hash, &key.key_prefix)
        .await?;

    info!(tenant.id = %tenant.id, "Tenant created");
    println!("Tenant created");
    println!("   ID:      {}", tenant.id);
    println!("   Name:    {}", tenant.name);
    println!("   API key: {}", key.full_key);
    println!("Store the API key now; it cannot be shown again.");
    Ok(())
}

async fn map_price(
    config: &ServerConfig,
    price_id: String,
    name: String,
    max_licenses: i64,
) -> Result<()> {
    anyhow::ensure!(max_licenses >= 0, "--max-licenses must not be negative");

    let store = open_store(&config.database_url).await?;
    store
        .upsert_plan_mapping(&PlanMapping {
            price_id,
            name,
            max_licenses,
        })
        .await?;
    println!("Plan mapping saved");
    Ok(())
}

async fn apply_subscription(config: &ServerConfig, event: &SubscriptionEvent) -> Result<()> {
    let store = open_store(&config.database_url).await?;
    store
        .get_tenant(event.tenant_id)
        .await?
        .with_context(|| format!("Tenant {} not found", event.tenant_id))?;

    let guard = SubscriptionQuotaGuard::new(store, QuotaPolicy::default());
    let quota = guard.apply_subscription_event(event).await?;
    println!(
        "Quota updated: {}/{} licenses used, subscription active: {}",
        quota.used_licenses, quota.max_licenses, quota.has_active_subscription
    );
    Ok(())
}
