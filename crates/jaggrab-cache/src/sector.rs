//! Main store sectors.
//!
//! The main store is a run of fixed 520-byte sectors; sector `n` starts at
//! byte offset `n * 520`.
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00   | 2    | Owning file id (BE) |
//! | 0x02   | 2    | Chunk sequence within the file (BE) |
//! | 0x04   | 3    | Next sector id, 0 on the last sector (BE) |
//! | 0x07   | 1    | Archive tag |
//! | 0x08   | 512  | Payload |

use crate::Result;
use binrw::BinRead;
use binrw::io::Cursor;

/// Size of a sector header in bytes.
pub const SECTOR_HEADER_SIZE: usize = 8;

/// Size of a sector payload in bytes.
pub const SECTOR_PAYLOAD_SIZE: usize = 512;

/// Size of a whole sector in bytes.
pub const SECTOR_SIZE: usize = SECTOR_HEADER_SIZE + SECTOR_PAYLOAD_SIZE;

/// Next-sector value marking the last sector of a chain.
pub const END_OF_CHAIN: u32 = 0;

/// Header preceding every sector payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct SectorHeader {
    /// Id of the file this sector belongs to
    pub file_id: u16,

    /// Position of this sector within the file's chain, starting at 0
    pub chunk: u16,

    /// Id of the following sector (24-bit)
    #[br(map = |x: [u8; 3]| u32::from_be_bytes([0, x[0], x[1], x[2]]))]
    pub next_block: u32,

    /// Archive tag written by the cache packer
    pub archive_tag: u8,
}

impl SectorHeader {
    /// Decode a header from the first 8 bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        Ok(Self::read(&mut cursor)?)
    }

    /// Whether this is the last sector of its chain.
    pub const fn is_last(&self) -> bool {
        self.next_block == END_OF_CHAIN
    }
}

/// Byte offset of sector `block` inside the main store.
pub const fn sector_offset(block: u32) -> u64 {
    block as u64 * SECTOR_SIZE as u64
}

/// Number of sectors needed to hold `length` bytes.
pub const fn sectors_for(length: u32) -> u32 {
    length.div_ceil(SECTOR_PAYLOAD_SIZE as u32)
}
