//! Test utilities for jaggrab-rs
//!
//! Builds cache directories on disk for tests. The encoder here is written
//! independently of `jaggrab-cache` so that tests exercise the reader against
//! bytes it did not produce itself.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Main store file name.
pub const MAIN_STORE: &str = "main_file_cache.dat";

/// Sector header size.
pub const HEADER: usize = 8;

/// Sector payload size.
pub const PAYLOAD: usize = 512;

/// Whole sector size.
pub const SECTOR: usize = HEADER + PAYLOAD;

/// Index store file name for `archive`.
pub fn index_store(archive: u32) -> String {
    format!("main_file_cache.idx{archive}")
}

/// Encode one sector. `payload` is zero-padded to 512 bytes.
///
/// # Panics
///
/// Panics if `payload` is longer than a sector payload.
pub fn encode_sector(
    file_id: u16,
    chunk: u16,
    next_block: u32,
    archive_tag: u8,
    payload: &[u8],
) -> Vec<u8> {
    assert!(payload.len() <= PAYLOAD, "payload exceeds one sector");
    let mut out = Vec::with_capacity(SECTOR);
    out.extend_from_slice(&file_id.to_be_bytes());
    out.extend_from_slice(&chunk.to_be_bytes());
    out.extend_from_slice(&next_block.to_be_bytes()[1..]);
    out.push(archive_tag);
    out.extend_from_slice(payload);
    out.resize(SECTOR, 0);
    out
}

/// Encode one 6-byte index record.
pub fn encode_record(length: u32, start_block: u32) -> [u8; 6] {
    let length = length.to_be_bytes();
    let start = start_block.to_be_bytes();
    [length[1], length[2], length[3], start[1], start[2], start[3]]
}

/// Deterministic byte pattern of `len` bytes starting at `seed`.
pub fn pattern(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

/// Overwrite bytes of an existing file at `offset`.
pub fn overwrite(path: &Path, offset: u64, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)?;
    file.flush()
}

/// Cut a file down to `len` bytes.
pub fn truncate(path: &Path, len: u64) -> io::Result<()> {
    OpenOptions::new().write(true).open(path)?.set_len(len)
}

/// Where a fixture file landed in the main store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Archive the file belongs to
    pub archive: u32,
    /// File id within the archive
    pub file_id: u32,
    /// Declared length
    pub length: u32,
    /// First sector; 0 for empty files
    pub start_block: u32,
    /// Sectors used
    pub blocks: u32,
}

/// Builder for an on-disk cache directory.
///
/// Files are packed in archive then file id order, each into consecutive
/// sectors starting at block 0. Gaps in file ids get zero records and gaps in
/// archive numbers get empty index stores.
#[derive(Debug, Clone, Default)]
pub struct CacheFixture {
    files: BTreeMap<(u32, u32), Vec<u8>>,
    min_archives: u32,
    short_tail: bool,
}

impl CacheFixture {
    /// Empty fixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    #[must_use]
    pub fn file(mut self, archive: u32, file_id: u32, data: impl Into<Vec<u8>>) -> Self {
        self.files.insert((archive, file_id), data.into());
        self
    }

    /// Write at least `count` index stores.
    #[must_use]
    pub fn archives(mut self, count: u32) -> Self {
        self.min_archives = count;
        self
    }

    /// Leave the last sector of the main store physically short.
    #[must_use]
    pub fn short_tail(mut self) -> Self {
        self.short_tail = true;
        self
    }

    /// Write the cache into `dir`.
    pub fn write_to(&self, dir: &Path) -> io::Result<Vec<Placement>> {
        let mut main = Vec::new();
        let mut indices: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
        let mut placements = Vec::with_capacity(self.files.len());
        let mut next_free = 0u32;

        for archive in 0..self.min_archives {
            indices.entry(archive).or_default();
        }

        for (&(archive, file_id), data) in &self.files {
            let length = data.len() as u32;
            let blocks = data.len().div_ceil(PAYLOAD) as u32;
            let start_block = if blocks == 0 { 0 } else { next_free };

            for (chunk, piece) in data.chunks(PAYLOAD).enumerate() {
                let block = start_block + chunk as u32;
                let next = if chunk as u32 + 1 == blocks { 0 } else { block + 1 };
                main.extend(encode_sector(
                    file_id as u16,
                    chunk as u16,
                    next,
                    (archive + 1) as u8,
                    piece,
                ));
            }
            next_free += blocks;

            let index = indices.entry(archive).or_default();
            let offset = file_id as usize * 6;
            if index.len() < offset + 6 {
                index.resize(offset + 6, 0);
            }
            index[offset..offset + 6].copy_from_slice(&encode_record(length, start_block));

            placements.push(Placement {
                archive,
                file_id,
                length,
                start_block,
                blocks,
            });
        }

        if self.short_tail
            && let Some(last) = self.files.values().rev().find(|data| !data.is_empty())
        {
            let tail = match last.len() % PAYLOAD {
                0 => PAYLOAD,
                rem => rem,
            };
            main.truncate(main.len() - (PAYLOAD - tail));
        }

        let highest = indices.keys().next_back().copied().unwrap_or(0);
        for archive in 0..=highest {
            indices.entry(archive).or_default();
        }

        fs::write(dir.join(MAIN_STORE), &main)?;
        for (archive, index) in &indices {
            fs::write(dir.join(index_store(*archive)), index)?;
        }

        Ok(placements)
    }

    /// Write the cache into a fresh temporary directory.
    pub fn build(&self) -> io::Result<BuiltCache> {
        let dir = tempfile::tempdir()?;
        let placements = self.write_to(dir.path())?;
        Ok(BuiltCache { dir, placements })
    }
}

/// A fixture written to a temporary directory, removed on drop.
#[derive(Debug)]
pub struct BuiltCache {
    dir: TempDir,
    placements: Vec<Placement>,
}

impl BuiltCache {
    /// Cache directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Main store path.
    pub fn main_store(&self) -> PathBuf {
        self.dir.path().join(MAIN_STORE)
    }

    /// Index store path for `archive`.
    pub fn index_store(&self, archive: u32) -> PathBuf {
        self.dir.path().join(index_store(archive))
    }

    /// Placement of a packed file.
    pub fn placement(&self, archive: u32, file_id: u32) -> Option<Placement> {
        self.placements
            .iter()
            .find(|p| p.archive == archive && p.file_id == file_id)
            .copied()
    }

    /// Byte offset of sector `block` in the main store.
    pub fn sector_offset(block: u32) -> u64 {
        u64::from(block) * SECTOR as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        assert_eq!(encode_record(1000, 0x010203), [0, 0x03, 0xE8, 1, 2, 3]);
    }

    #[test]
    fn test_sector_layout() {
        let sector = encode_sector(5, 1, 42, 1, b"hi");
        assert_eq!(sector.len(), SECTOR);
        assert_eq!(&sector[..10], &[0, 5, 0, 1, 0, 0, 42, 1, b'h', b'i']);
    }

    #[test]
    fn test_packing() {
        let built = CacheFixture::new()
            .file(0, 1, pattern(0, 1000))
            .file(0, 3, Vec::new())
            .file(2, 0, pattern(9, 10))
            .build()
            .unwrap();

        let first = built.placement(0, 1).unwrap();
        assert_eq!((first.start_block, first.blocks), (0, 2));
        let empty = built.placement(0, 3).unwrap();
        assert_eq!((empty.start_block, empty.blocks), (0, 0));
        let last = built.placement(2, 0).unwrap();
        assert_eq!((last.start_block, last.blocks), (2, 1));

        assert_eq!(fs::metadata(built.main_store()).unwrap().len(), 3 * SECTOR as u64);
        assert_eq!(fs::metadata(built.index_store(0)).unwrap().len(), 24);
        assert_eq!(fs::metadata(built.index_store(1)).unwrap().len(), 0);
        assert_eq!(fs::metadata(built.index_store(2)).unwrap().len(), 6);
    }

    #[test]
    fn test_short_tail() {
        let built = CacheFixture::new()
            .file(0, 1, pattern(0, 600))
            .short_tail()
            .build()
            .unwrap();
        let len = fs::metadata(built.main_store()).unwrap().len();
        assert_eq!(len, (SECTOR + HEADER + 88) as u64);
    }
}
