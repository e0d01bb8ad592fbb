//! Error types for cache storage operations.

use crate::store::Lifecycle;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur while loading or reading the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Required store files are missing or unreadable. Fatal at startup.
    #[error("Cache unavailable at {path}: {reason}")]
    CacheUnavailable {
        /// Cache directory or store file that failed to load
        path: PathBuf,
        /// Why the cache could not be loaded
        reason: String,
    },

    /// The store was used before it was loaded or after it was closed.
    #[error("Store not ready: {state}")]
    StoreNotReady {
        /// Lifecycle state at the time of the call
        state: Lifecycle,
    },

    /// A lifecycle transition was requested from the wrong state.
    #[error("Invalid store transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: Lifecycle,
        /// Requested state
        to: Lifecycle,
    },

    /// A requested archive or file lies outside the loaded stores.
    #[error("{kind} {value} out of range (limit {limit})")]
    OutOfRange {
        /// Which identifier was out of range
        kind: OutOfRangeKind,
        /// The requested value
        value: u64,
        /// Exclusive upper bound
        limit: u64,
    },

    /// A sector chain failed to reproduce the declared file.
    #[error("Corrupt chain for file {file_id} in archive {archive} at block {block}: {fault}")]
    CorruptChain {
        /// Archive the file was requested from
        archive: u32,
        /// Requested file id
        file_id: u32,
        /// Block being read when the fault was detected
        block: u32,
        /// What went wrong
        fault: ChainFault,
    },

    /// Underlying storage read failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fixed-size record could not be decoded.
    #[error("Format error: {0}")]
    Format(#[from] binrw::Error),
}

impl CacheError {
    /// Whether this error was caused by a request outside the loaded stores.
    pub const fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }

    /// Whether this error reports damaged cache data.
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptChain { .. } | Self::Format(_))
    }
}

/// Identifier kind reported by [`CacheError::OutOfRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfRangeKind {
    /// Archive (index store) number
    Archive,
    /// File id within an archive
    File,
}

impl fmt::Display for OutOfRangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive => f.write_str("archive"),
            Self::File => f.write_str("file"),
        }
    }
}

/// Reason a sector chain was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainFault {
    /// The sector lies (partly) past the end of the main store and too little
    /// of it remains to hold a header.
    #[error("sector truncated to {available} bytes")]
    TruncatedSector {
        /// Bytes of the sector present in the store
        available: usize,
    },

    /// The sector header is present but its payload is shorter than needed.
    #[error("payload truncated: need {needed} bytes, {available} available")]
    TruncatedPayload {
        /// Bytes required from this sector
        needed: usize,
        /// Payload bytes present in the store
        available: usize,
    },

    /// The chain ended before the declared length was collected.
    #[error("chain ended with {remaining} bytes outstanding")]
    PrematureEnd {
        /// Bytes still owed when the end-of-chain marker was reached
        remaining: u32,
    },

    /// The sector belongs to another file.
    #[error("sector owned by file {found}, expected {expected}")]
    OwnerMismatch {
        /// Owner expected from the request
        expected: u16,
        /// Owner recorded in the sector header
        found: u16,
    },

    /// The sector's chunk number is out of sequence.
    #[error("sector holds chunk {found}, expected {expected}")]
    SequenceMismatch {
        /// Chunk number expected at this point of the walk
        expected: u16,
        /// Chunk number recorded in the sector header
        found: u16,
    },

    /// The chain visited more sectors than the declared length allows.
    #[error("chain exceeded {limit} blocks")]
    Runaway {
        /// Maximum number of sectors allowed for the declared length
        limit: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = CacheError::OutOfRange {
            kind: OutOfRangeKind::Archive,
            value: 7,
            limit: 5,
        };
        assert_eq!(err.to_string(), "archive 7 out of range (limit 5)");
        assert!(err.is_out_of_range());
        assert!(!err.is_corrupt());
    }

    #[test]
    fn test_corrupt_chain_message() {
        let err = CacheError::CorruptChain {
            archive: 0,
            file_id: 5,
            block: 3,
            fault: ChainFault::PrematureEnd { remaining: 488 },
        };
        assert_eq!(
            err.to_string(),
            "Corrupt chain for file 5 in archive 0 at block 3: chain ended with 488 bytes outstanding"
        );
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_not_ready_message() {
        let err = CacheError::StoreNotReady {
            state: Lifecycle::Closed,
        };
        assert_eq!(err.to_string(), "Store not ready: closed");
    }
}
