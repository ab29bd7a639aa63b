//! Auth Service Backend
//!
//! Issues signed bearer tokens for valid credentials and authenticates
//! every inbound request from the token it carries.
//!
//! ## Architecture
//!
//! - Routes: HTTP request handling and routing
//! - Auth: token service, password hashing, request middleware
//! - Services: login and registration
//! - Repositories: credential storage (PostgreSQL or in-memory)

use anyhow::Result;
use auth_service_backend::{config, db, routes, state::AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if config::AppConfig::is_production() { "production" } else { "development" },
        store = ?config.database.backend,
        "Starting Auth Service"
    );

    if config::AppConfig::is_production() {
        validate_production_config(&config)?;
    }

    // Skip migrations in production (separate migration job)
    let store = db::build_store(&config.database, !config::AppConfig::is_production()).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(store, config);
    let app = routes::create_router(state);

    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config::AppConfig::is_production() {
            "auth_service_backend=info,tower_http=info".into()
        } else {
            "auth_service_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config::AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Refuse to start in production with an unsafe configuration
fn validate_production_config(config: &config::AppConfig) -> Result<()> {
    let issues = config.production_issues();

    if !issues.is_empty() {
        for issue in &issues {
            error!("Configuration error: {}", issue);
        }
        anyhow::bail!("Invalid production configuration");
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
