//! Error types for the JAGGRAB server.

use jaggrab_cache::CacheError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required configuration value
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// A value is present but unusable
    #[error("Invalid {field}: {reason}")]
    InvalidValue {
        /// Option name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Route table could not be loaded
    #[error("Route table error: {0}")]
    Routes(#[from] RouteError),
}

/// Route table errors.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Failed to read the route table file
    #[error("Failed to read routes from {path}: {source}")]
    ReadFailed {
        /// Path to the routes file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid JSON in the route table
    #[error("Invalid JSON in route table: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A route has an empty keyword, which would match every request
    #[error("Route keywords must not be empty")]
    EmptyKeyword,

    /// The table has no routes at all
    #[error("Route table is empty")]
    Empty,
}

/// Server runtime errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listener
    #[error("Failed to bind TCP server to {addr}: {source}")]
    BindFailed {
        /// Address that failed to bind
        addr: std::net::SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Cache could not be loaded or closed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server shutdown error
    #[error("Server shutdown error: {0}")]
    Shutdown(String),
}

/// Per-connection errors. Every one of them ends the connection without a
/// response.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Request line does not start with `JAGGRAB /`
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request line exceeded the length limit
    #[error("Request line exceeds {limit} bytes")]
    RequestTooLong {
        /// Maximum accepted line length
        limit: usize,
    },

    /// No route matches the requested path
    #[error("No route for path: {0}")]
    UnknownRoute(String),

    /// The cache failed to produce the file
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// I/O error during protocol handling
    #[error("Protocol I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No request line arrived in time
    #[error("Connection timeout after {millis} ms")]
    Timeout {
        /// Read timeout in milliseconds
        millis: u64,
    },

    /// Blocking cache task failed to complete
    #[error("Cache task failed: {0}")]
    Task(String),
}

impl ProtocolError {
    /// Whether the error was caused by the client rather than the server.
    pub const fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::RequestTooLong { .. }
                | Self::UnknownRoute(_)
                | Self::Timeout { .. }
        ) || matches!(self, Self::Cache(CacheError::OutOfRange { .. }))
    }
}
