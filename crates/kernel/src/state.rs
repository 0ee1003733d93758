//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::arbiter::{HttpPathArbiter, PathArbiter};
use crate::config::Config;
use crate::db;
use crate::metrics::Metrics;
use crate::presenter::UrlBuilder;
use crate::queue::{AmqpPublisher, MessagePublisher, NoopPublisher};
use crate::store::{ContentStore, MemoryContentStore, PostgresContentStore};
use crate::update::UpdateCoordinator;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Content store (Postgres in production, in-memory without DATABASE_URL).
    store: Arc<dyn ContentStore>,

    /// Update coordinator driving the reserve → persist → publish sequence.
    coordinator: UpdateCoordinator,

    /// Absolute URL construction for presenters.
    urls: UrlBuilder,

    /// Prometheus metrics.
    metrics: Arc<Metrics>,

    /// Read-path freshness window in seconds.
    default_ttl_secs: u64,
}

impl AppState {
    /// Create new application state from configuration.
    ///
    /// Connects to PostgreSQL (when configured) and the message broker
    /// (unless `queue_noop` is set); both connections are established once
    /// here and passed by reference thereafter.
    pub async fn new(config: &Config) -> Result<Self> {
        let metrics = Arc::new(Metrics::new());

        let store: Arc<dyn ContentStore> = match &config.database_url {
            Some(database_url) => {
                let pool = db::create_pool(database_url, config.database_max_connections)
                    .await
                    .context("failed to create database pool")?;
                db::run_migrations(&pool)
                    .await
                    .context("failed to run migrations")?;
                info!("PostgreSQL connection established");
                Arc::new(PostgresContentStore::new(pool))
            }
            None => {
                info!("DATABASE_URL not set, using in-memory content store");
                Arc::new(MemoryContentStore::new())
            }
        };

        let publisher: Arc<dyn MessagePublisher> = if config.queue_noop {
            info!("queue in noop mode, broker I/O disabled");
            Arc::new(NoopPublisher)
        } else {
            let publisher = AmqpPublisher::connect(
                &config.amqp_url,
                &config.exchange_name,
                Arc::clone(&metrics),
            )
            .await
            .context("failed to connect to message broker")?;
            info!(exchange = %config.exchange_name, "broker connection established");
            Arc::new(publisher)
        };

        let arbiter: Arc<dyn PathArbiter> = Arc::new(HttpPathArbiter::new(
            &config.url_arbiter_url,
            Duration::from_secs(config.arbiter_timeout_secs),
        ));

        Ok(Self::with_components(
            arbiter,
            store,
            publisher,
            metrics,
            UrlBuilder::new(&config.site_url),
            config.default_ttl_secs,
        ))
    }

    /// Assemble state from explicit components.
    ///
    /// This is the seam the integration tests use to substitute doubles for
    /// the registry, store, and publisher.
    pub fn with_components(
        arbiter: Arc<dyn PathArbiter>,
        store: Arc<dyn ContentStore>,
        publisher: Arc<dyn MessagePublisher>,
        metrics: Arc<Metrics>,
        urls: UrlBuilder,
        default_ttl_secs: u64,
    ) -> Self {
        let coordinator = UpdateCoordinator::new(
            arbiter,
            Arc::clone(&store),
            publisher,
            Arc::clone(&metrics),
        );

        Self {
            inner: Arc::new(AppStateInner {
                store,
                coordinator,
                urls,
                metrics,
                default_ttl_secs,
            }),
        }
    }

    /// Content store.
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.inner.store
    }

    /// Update coordinator.
    pub fn coordinator(&self) -> &UpdateCoordinator {
        &self.inner.coordinator
    }

    /// URL builder for presenters.
    pub fn urls(&self) -> &UrlBuilder {
        &self.inner.urls
    }

    /// Prometheus metrics.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Read-path freshness window in seconds.
    pub fn default_ttl_secs(&self) -> u64 {
        self.inner.default_ttl_secs
    }

    /// Whether the backing store is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.inner.store.healthy().await
    }
}
