//! Content Store Kernel
//!
//! Authoritative write path for the shared content repository: path
//! arbitration, atomic create-or-replace persistence, and confirmed
//! change-event publishing.

mod arbiter;
mod config;
mod db;
mod error;
mod metrics;
mod models;
mod paths;
mod presenter;
mod queue;
mod routes;
mod state;
mod store;
mod update;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    info!("Starting content store kernel");

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;
    info!(port = config.port, "Configuration loaded");

    // Initialize application state (store, registry client, publisher)
    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    // Build the router
    let app = Router::new()
        .merge(routes::content_item::router())
        .merge(routes::health::router())
        .merge(routes::metrics::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
