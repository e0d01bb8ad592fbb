//! Server state management and orchestration.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::routes::RouteTable;
use jaggrab_cache::{CacheStore, ChecksumTable};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Shared state for every connection.
#[derive(Debug)]
pub struct AppState {
    /// Cache store (loaded once at startup)
    store: Arc<CacheStore>,

    /// Keyword routing
    routes: RouteTable,

    /// CRC table recipe
    checksums: ChecksumTable,

    /// Request line read timeout
    read_timeout: Duration,

    /// Server start time
    started_at: SystemTime,
}

impl AppState {
    /// Create application state from configuration, opening the cache.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the cache cannot be loaded or the route
    /// table is invalid.
    pub fn new(config: &ServerConfig) -> Result<Self, ServerError> {
        tracing::info!("Loading cache from {}", config.cache_dir.display());

        let routes = config.route_table()?;
        let store = CacheStore::open_with_config(&config.cache_dir, config.store_config())?;

        Ok(Self::from_parts(
            Arc::new(store),
            routes,
            config.checksum_table(),
            config.read_timeout(),
        ))
    }

    /// Assemble state from an already opened store.
    pub fn from_parts(
        store: Arc<CacheStore>,
        routes: RouteTable,
        checksums: ChecksumTable,
        read_timeout: Duration,
    ) -> Self {
        Self {
            store,
            routes,
            checksums,
            read_timeout,
            started_at: SystemTime::now(),
        }
    }

    /// Get reference to the cache store.
    #[must_use]
    pub const fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Get the route table.
    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Get the CRC table recipe.
    #[must_use]
    pub const fn checksums(&self) -> &ChecksumTable {
        &self.checksums
    }

    /// Request line read timeout.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Get server uptime in seconds.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.started_at)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Server orchestration.
pub struct Server {
    /// Shared application state
    state: Arc<AppState>,
    /// Server configuration
    config: ServerConfig,
}

impl Server {
    /// Create new server with configuration.
    ///
    /// Opens the cache and prepares shared state.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the cache cannot be loaded.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let state = AppState::new(&config)?;

        tracing::info!(
            "Server initialized with {} archives and {} routes",
            state.store().index_count()?,
            state.routes().len()
        );

        Ok(Self {
            state: Arc::new(state),
            config,
        })
    }

    /// Run the server until Ctrl-C, then close the cache.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the listener stops.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Starting JAGGRAB server on {}", self.config.bind);

        tokio::select! {
            result = crate::tcp::start_server(self.config.bind, Arc::clone(&self.state)) => {
                result?;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| {
                    ServerError::Shutdown(format!("Failed to listen for shutdown signal: {e}"))
                })?;
                tracing::info!("Shutdown signal received, stopping server");
            }
        }

        self.state.store().close()?;
        tracing::info!(
            "Server stopped after {} seconds",
            self.state.uptime_seconds()
        );
        Ok(())
    }

    /// Get shared application state.
    #[must_use]
    pub const fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}
