//! # TaskForge API Server
//!
//! Task management backend built with Axum:
//! - User registration, login, and JWT session management
//! - Refresh token revocation on logout
//! - Per-user task CRUD with filtering, search, and pagination
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskforge-api
//! ```

use std::sync::Arc;

use axum::{extract::Request, ServiceExt};
use taskforge_api::{
    app::{build_app, AppState},
    config::Config,
};
use taskforge_shared::auth::{revocation::PgRevocationStore, tokens::TokenService};
use taskforge_shared::db::{
    migrations::{ensure_database_exists, run_migrations},
    pool,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskforge_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskForge API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    ensure_database_exists(&config.database.url).await?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&db).await?;

    let tokens = TokenService::new(
        config.jwt.secret.clone(),
        config.jwt.access_ttl_minutes,
        config.jwt.refresh_ttl_days,
        Arc::new(PgRevocationStore::new(db.clone())),
    );

    let bind_address = config.bind_address();
    let state = AppState::new(db, config, tokens);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
