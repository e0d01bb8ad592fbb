//! Index store records.
//!
//! Each index store is a flat array of 6-byte records; the record for file
//! `n` lives at byte offset `n * 6`.
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00   | 3    | Total file length in bytes (BE) |
//! | 0x03   | 3    | First sector id (BE) |

use crate::Result;
use binrw::BinRead;
use binrw::io::Cursor;

/// Size of one index record in bytes.
pub const INDEX_RECORD_SIZE: usize = 6;

/// Location of a file inside the main store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead)]
#[br(big)]
pub struct IndexRecord {
    /// Total length of the file in bytes (24-bit)
    #[br(map = |x: [u8; 3]| u32::from_be_bytes([0, x[0], x[1], x[2]]))]
    pub length: u32,

    /// Id of the first sector in the file's chain (24-bit)
    #[br(map = |x: [u8; 3]| u32::from_be_bytes([0, x[0], x[1], x[2]]))]
    pub start_block: u32,
}

impl IndexRecord {
    /// Decode a record from the first 6 bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        Ok(Self::read(&mut cursor)?)
    }

    /// Byte offset of the record for `file_id` inside an index store.
    pub const fn offset_of(file_id: u32) -> u64 {
        file_id as u64 * INDEX_RECORD_SIZE as u64
    }

    /// Whether the record describes an empty file with no sector chain.
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}
