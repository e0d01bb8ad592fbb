//! Server configuration management.
//!
//! Configuration comes from CLI arguments (`--bind`, `--cache-dir`, ...),
//! environment variables (`JAGGRAB_BIND`, `JAGGRAB_CACHE_DIR`, ...) or
//! defaults, in that order of precedence.
//!
//! # Example
//!
//! ```no_run
//! use jaggrab_server::ServerConfig;
//!
//! let config = ServerConfig::from_args();
//! config.validate().expect("Invalid configuration");
//!
//! println!("Serving {} on {}", config.cache_dir.display(), config.bind);
//! ```

use crate::error::ConfigError;
use crate::routes::RouteTable;
use clap::{Parser, ValueEnum};
use jaggrab_cache::{ChecksumTable, HeaderPolicy, StoreConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Server configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jaggrab-server",
    about = "JAGGRAB asset server for pre-built game caches",
    version
)]
pub struct ServerConfig {
    /// TCP bind address
    #[arg(long, env = "JAGGRAB_BIND", default_value = "0.0.0.0:43595")]
    pub bind: SocketAddr,

    /// Directory holding main_file_cache.dat and its index stores
    #[arg(long, env = "JAGGRAB_CACHE_DIR", default_value = "./data/cache")]
    pub cache_dir: PathBuf,

    /// How long a client may take to send its request line
    #[arg(long, env = "JAGGRAB_READ_TIMEOUT_MS", default_value_t = 5000)]
    pub read_timeout_ms: u64,

    /// Client version placed in the first CRC table slot
    #[arg(
        long,
        env = "JAGGRAB_CLIENT_VERSION",
        default_value_t = 377,
        allow_negative_numbers = true
    )]
    pub client_version: i32,

    /// Seed of the CRC table rolling hash
    #[arg(
        long,
        env = "JAGGRAB_CRC_SEED",
        default_value_t = 1234,
        allow_negative_numbers = true
    )]
    pub crc_seed: i32,

    /// JSON route table replacing the built-in keywords
    #[arg(long, env = "JAGGRAB_ROUTES")]
    pub routes: Option<PathBuf>,

    /// Follow sector links without checking owner and chunk fields
    #[arg(long, env = "JAGGRAB_LENIENT_CHAINS")]
    pub lenient_chains: bool,

    /// Log output format
    #[arg(long, env = "JAGGRAB_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Request line read timeout.
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Cache store configuration.
    pub fn store_config(&self) -> StoreConfig {
        let policy = if self.lenient_chains {
            HeaderPolicy::Lenient
        } else {
            HeaderPolicy::Strict
        };
        StoreConfig::new().with_header_policy(policy)
    }

    /// CRC table recipe.
    pub fn checksum_table(&self) -> ChecksumTable {
        ChecksumTable::default()
            .with_client_version(self.client_version)
            .with_seed(self.crc_seed)
    }

    /// Route table from `--routes`, or the built-in table.
    pub fn route_table(&self) -> Result<RouteTable, ConfigError> {
        match &self.routes {
            Some(path) => Ok(RouteTable::from_file(path)?),
            None => Ok(RouteTable::default()),
        }
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The cache directory doesn't exist
    /// - The read timeout is zero
    /// - A routes file is given but doesn't exist
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cache_dir.is_dir() {
            return Err(ConfigError::MissingRequired(format!(
                "cache directory not found: {}",
                self.cache_dir.display()
            )));
        }

        if self.read_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "read_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        if let Some(routes) = &self.routes
            && !routes.is_file()
        {
            return Err(ConfigError::MissingRequired(format!(
                "routes file not found: {}",
                routes.display()
            )));
        }

        Ok(())
    }
}
