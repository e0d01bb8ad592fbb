//! JAGGRAB asset server.
//!
//! Serves files out of a pre-built game cache to connecting clients. A client
//! opens a TCP connection, sends one request line such as
//! `JAGGRAB /title` or `JAGGRAB /crc12345`, and receives the raw bytes of the
//! matching cache file (or the CRC reference table) before the server closes
//! the connection.
//!
//! # Architecture
//!
//! - `config`: CLI and environment configuration
//! - `routes`: request keyword to cache file mapping
//! - `server`: shared state and server orchestration
//! - `tcp`: connection handling and request parsing
//!
//! Storage itself lives in the `jaggrab-cache` crate.
//!
//! # Example
//!
//! ```no_run
//! use jaggrab_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     tracing_subscriber::fmt::init();
//!
//!     let config = ServerConfig::from_args();
//!     config.validate()?;
//!
//!     let server = Server::new(config)?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod tcp;

pub use config::{LogFormat, ServerConfig};
pub use error::{ConfigError, ProtocolError, RouteError, ServerError};
pub use routes::{Route, RouteTable};
pub use server::{AppState, Server};
