//! Sector chain traversal.
//!
//! A file's bytes are spread over a singly linked list of sectors in the main
//! store. The walk starts at the sector named by the file's index record and
//! follows each header's next-sector field, taking up to 512 payload bytes
//! from every sector until the declared length has been collected.
//!
//! The last sector of a store may be physically short: only the bytes the
//! file needs have to be present. Anything shorter than that is rejected as
//! a corrupt chain rather than padded or returned partially.

use crate::config::HeaderPolicy;
use crate::error::{CacheError, ChainFault, Result};
use crate::sector::{
    SECTOR_HEADER_SIZE, SECTOR_PAYLOAD_SIZE, SECTOR_SIZE, SectorHeader, sector_offset, sectors_for,
};
use tracing::{trace, warn};

/// Bytes collected by one chain walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRead {
    /// Reassembled file contents, exactly the declared length
    pub data: Vec<u8>,
    /// Number of sectors visited
    pub blocks: u32,
}

/// Walks sector chains in a main store image.
#[derive(Debug, Clone, Copy)]
pub struct BlockChainReader<'a> {
    store: &'a [u8],
    policy: HeaderPolicy,
    archive: u32,
}

impl<'a> BlockChainReader<'a> {
    /// Create a reader over the bytes of a main store with strict header checks.
    pub const fn new(store: &'a [u8]) -> Self {
        Self {
            store,
            policy: HeaderPolicy::Strict,
            archive: 0,
        }
    }

    /// Set the header validation policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: HeaderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the archive reported in errors.
    #[must_use]
    pub const fn for_archive(mut self, archive: u32) -> Self {
        self.archive = archive;
        self
    }

    /// Reassemble `length` bytes of `file_id` starting at `start_block`.
    ///
    /// A zero length returns immediately without touching the store.
    pub fn read(&self, start_block: u32, length: u32, file_id: u32) -> Result<ChainRead> {
        let limit = sectors_for(length) + 1;
        let expected_owner = file_id as u16;

        let mut data = Vec::with_capacity(length as usize);
        let mut remaining = length;
        let mut block = start_block;
        let mut chunk: u16 = 0;
        let mut blocks: u32 = 0;

        while remaining > 0 {
            if blocks >= limit {
                return Err(self.fault(file_id, block, ChainFault::Runaway { limit }));
            }
            blocks += 1;

            let sector = self.sector(block);
            if sector.len() < SECTOR_HEADER_SIZE {
                return Err(self.fault(
                    file_id,
                    block,
                    ChainFault::TruncatedSector {
                        available: sector.len(),
                    },
                ));
            }

            let header = SectorHeader::parse(&sector[..SECTOR_HEADER_SIZE])?;

            if self.policy == HeaderPolicy::Strict {
                if header.file_id != expected_owner {
                    return Err(self.fault(
                        file_id,
                        block,
                        ChainFault::OwnerMismatch {
                            expected: expected_owner,
                            found: header.file_id,
                        },
                    ));
                }
                if header.chunk != chunk {
                    return Err(self.fault(
                        file_id,
                        block,
                        ChainFault::SequenceMismatch {
                            expected: chunk,
                            found: header.chunk,
                        },
                    ));
                }
            }

            let needed = (remaining as usize).min(SECTOR_PAYLOAD_SIZE);
            let payload = &sector[SECTOR_HEADER_SIZE..];
            if payload.len() < needed {
                return Err(self.fault(
                    file_id,
                    block,
                    ChainFault::TruncatedPayload {
                        needed,
                        available: payload.len(),
                    },
                ));
            }

            data.extend_from_slice(&payload[..needed]);
            remaining -= needed as u32;
            chunk = chunk.wrapping_add(1);

            if remaining > 0 && header.is_last() {
                return Err(self.fault(file_id, block, ChainFault::PrematureEnd { remaining }));
            }

            block = header.next_block;
        }

        trace!(
            "Read file {file_id} from archive {}: {length} bytes in {blocks} sectors",
            self.archive
        );

        Ok(ChainRead { data, blocks })
    }

    /// Up to one sector at `block`, cut short at the end of the store.
    fn sector(&self, block: u32) -> &'a [u8] {
        let Ok(start) = usize::try_from(sector_offset(block)) else {
            return &[];
        };
        if start >= self.store.len() {
            return &[];
        }
        let end = start.saturating_add(SECTOR_SIZE).min(self.store.len());
        &self.store[start..end]
    }

    fn fault(&self, file_id: u32, block: u32, fault: ChainFault) -> CacheError {
        warn!(
            "Corrupt chain for file {file_id} in archive {} at block {block}: {fault}",
            self.archive
        );
        CacheError::CorruptChain {
            archive: self.archive,
            file_id,
            block,
            fault,
        }
    }
}
