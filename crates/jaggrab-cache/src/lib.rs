//! Read-only cache storage engine for JAGGRAB asset servers.
//!
//! A cache directory holds one main block store and up to 255 index stores:
//!
//! - `main_file_cache.dat`: a flat run of 520-byte sectors. Each sector has an
//!   8-byte header (owning file, chunk sequence, next sector, archive tag)
//!   followed by 512 bytes of payload.
//! - `main_file_cache.idx{N}`: a flat array of 6-byte records, one per file id,
//!   giving the file's total length and its first sector.
//!
//! A logical file is rebuilt by walking its sector chain until the declared
//! length has been collected. The store is built offline; this crate only
//! reads it.
//!
//! # Example
//!
//! ```no_run
//! use jaggrab_cache::{CacheStore, ChecksumTable};
//!
//! # fn example() -> jaggrab_cache::Result<()> {
//! let store = CacheStore::open("./data/cache")?;
//!
//! let title = store.get_file(0, 1)?;
//! println!("title archive: {} bytes", title.len());
//!
//! let digest = ChecksumTable::default().compute(&store)?;
//! assert_eq!(digest.to_bytes().len(), 40);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

// Sector chain traversal
pub mod chain;

// CRC reference table sent to clients
pub mod checksum;

// Configuration
pub mod config;

// Error types
pub mod error;

// Read-only file mappings
mod mapped;

// Index store records
pub mod record;

// Main store sectors
pub mod sector;

// Store lifecycle and file lookup
pub mod store;

pub use chain::{BlockChainReader, ChainRead};
pub use checksum::{ChecksumDigest, ChecksumTable};
pub use config::{HeaderPolicy, StoreConfig};
pub use error::{CacheError, ChainFault, OutOfRangeKind, Result};
pub use record::IndexRecord;
pub use sector::SectorHeader;
pub use store::{AssembledFile, CacheStore, Lifecycle};

/// Version information for the storage engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the main block store inside a cache directory.
pub const MAIN_STORE_FILE: &str = "main_file_cache.dat";

/// File name prefix shared by every index store; the archive number follows.
pub const INDEX_STORE_PREFIX: &str = "main_file_cache.idx";

/// Maximum number of index stores a cache directory may hold.
pub const MAX_INDEX_STORES: usize = 0xFF;

/// Build the file name of the index store for `archive`.
pub fn index_store_name(archive: u32) -> String {
    format!("{INDEX_STORE_PREFIX}{archive}")
}
