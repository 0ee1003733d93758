//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL. When None, the in-memory store is used.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Base URL of the external path registry.
    pub url_arbiter_url: String,

    /// Timeout for reservation calls in seconds (default: 5).
    pub arbiter_timeout_secs: u64,

    /// AMQP broker connection URL.
    pub amqp_url: String,

    /// Target exchange for change events. Must already exist on the broker.
    pub exchange_name: String,

    /// Disable all broker I/O (default: false).
    pub queue_noop: bool,

    /// Read-path freshness window in seconds (default: 900).
    pub default_ttl_secs: u64,

    /// Public site URL for building absolute API URLs.
    pub site_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL").ok();

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let url_arbiter_url = env::var("URL_ARBITER_URL")
            .context("URL_ARBITER_URL environment variable is required")?;

        let arbiter_timeout_secs = env::var("ARBITER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("ARBITER_TIMEOUT_SECS must be a valid u64")?;

        let amqp_url =
            env::var("AMQP_URL").unwrap_or_else(|_| "amqp://127.0.0.1:5672/%2f".to_string());

        let exchange_name =
            env::var("EXCHANGE_NAME").unwrap_or_else(|_| "content_updates".to_string());

        let queue_noop = env::var("QUEUE_NOOP")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let default_ttl_secs = env::var("DEFAULT_TTL_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .context("DEFAULT_TTL_SECS must be a valid u64")?;

        let site_url = env::var("SITE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            url_arbiter_url,
            arbiter_timeout_secs,
            amqp_url,
            exchange_name,
            queue_noop,
            default_ttl_secs,
            site_url,
        })
    }
}
