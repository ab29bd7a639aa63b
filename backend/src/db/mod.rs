//! Database connection and credential store construction
//!
//! Picks the credential store configured in `database.backend`. For
//! PostgreSQL this creates the pool and, when asked, applies the embedded
//! migrations.

use crate::config::{DatabaseConfig, StoreBackend};
use crate::repositories::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};
use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Pool tuning that isn't exposed through configuration
const MIN_CONNECTIONS: u32 = 1;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Build the credential store described by the configuration
pub async fn build_store(
    config: &DatabaseConfig,
    apply_migrations: bool,
) -> Result<Arc<dyn CredentialStore>> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory credential store; accounts are lost on restart");
            Ok(Arc::new(InMemoryCredentialStore::new()))
        }
        StoreBackend::Postgres => {
            info!("Connecting to database...");
            let pool = create_pool(config).await?;
            if apply_migrations {
                run_migrations(&pool).await?;
            }
            Ok(Arc::new(PgCredentialStore::new(pool)))
        }
    }
}

/// Create a PostgreSQL connection pool
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let connect_options = PgConnectOptions::from_str(&config.url)
        .context("Invalid database URL")?
        .application_name("auth-service");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(MIN_CONNECTIONS.min(config.max_connections))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
        .context("Failed to connect to database")?;

    info!(max = config.max_connections, "Database pool created");

    Ok(pool)
}

/// Apply the users/user_roles migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed successfully");
    Ok(())
}

/// Check database health
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| {
            warn!("Database health check failed: {}", e);
            e.into()
        })
}
