//! JAGGRAB server binary entry point.
//!
//! Thin wrapper around the jaggrab-server library: parses configuration,
//! installs logging, validates, then runs the server.

use anyhow::Result;
use jaggrab_server::{LogFormat, Server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_args();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    tracing::info!(
        "Configuration loaded: bind={}, cache={}, timeout={}ms",
        config.bind,
        config.cache_dir.display(),
        config.read_timeout_ms
    );

    config.validate()?;

    let server = Server::new(config)?;
    server.run().await?;

    Ok(())
}
