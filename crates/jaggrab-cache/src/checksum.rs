//! CRC reference table sent to clients.
//!
//! Clients compare this table against their own copy of the reference
//! archives to decide what to download again. The table is a client version
//! slot, one CRC32 slot per reference file, and a rolling hash over all slots,
//! each written as a big-endian `i32`.

use crate::Result;
use crate::store::CacheStore;
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client version placed in the first slot by default.
pub const DEFAULT_CLIENT_VERSION: i32 = 377;

/// Rolling hash seed used by default.
pub const DEFAULT_SEED: i32 = 1234;

/// Recipe for the checksum table: which files to hash and how to fold them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumTable {
    /// Value of slot 0
    pub client_version: i32,
    /// Initial value of the rolling hash
    pub seed: i32,
    /// Archive the reference files are read from
    pub archive: u32,
    /// Reference file ids, in slot order
    pub reference_files: Vec<u32>,
}

impl Default for ChecksumTable {
    fn default() -> Self {
        Self {
            client_version: DEFAULT_CLIENT_VERSION,
            seed: DEFAULT_SEED,
            archive: 0,
            reference_files: (1..=8).collect(),
        }
    }
}

impl ChecksumTable {
    /// Set the client version slot.
    #[must_use]
    pub const fn with_client_version(mut self, client_version: i32) -> Self {
        self.client_version = client_version;
        self
    }

    /// Set the rolling hash seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: i32) -> Self {
        self.seed = seed;
        self
    }

    /// Set the archive and reference files to hash.
    #[must_use]
    pub fn with_reference_files(
        mut self,
        archive: u32,
        files: impl IntoIterator<Item = u32>,
    ) -> Self {
        self.archive = archive;
        self.reference_files = files.into_iter().collect();
        self
    }

    /// Read every reference file and build the table.
    ///
    /// Any failure to read a reference file aborts the computation.
    pub fn compute(&self, store: &CacheStore) -> Result<ChecksumDigest> {
        let mut slots = Vec::with_capacity(self.reference_files.len() + 1);
        slots.push(self.client_version);

        for &file_id in &self.reference_files {
            let file = store.get_file(self.archive, file_id)?;
            let mut hasher = Hasher::new();
            hasher.update(file.data());
            slots.push(hasher.finalize() as i32);
        }

        let digest = ChecksumDigest::new(self.seed, slots);
        debug!("Computed checksum table: hash {}", digest.hash());
        Ok(digest)
    }
}

/// Computed checksum table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumDigest {
    slots: Vec<i32>,
    hash: i32,
}

impl ChecksumDigest {
    /// Fold `slots` into a rolling hash starting from `seed`.
    pub fn new(seed: i32, slots: Vec<i32>) -> Self {
        let hash = slots
            .iter()
            .fold(seed, |hash, &slot| hash.wrapping_shl(1).wrapping_add(slot));
        Self { slots, hash }
    }

    /// Slot values in order, client version first.
    pub fn slots(&self) -> &[i32] {
        &self.slots
    }

    /// Final rolling hash.
    pub const fn hash(&self) -> i32 {
        self.hash
    }

    /// Wire form: every slot then the hash, big-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.slots
            .iter()
            .chain(std::iter::once(&self.hash))
            .flat_map(|value| value.to_be_bytes())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_of_empty_files() {
        // CRC32 of an empty file is 0, so only the version slot contributes.
        let digest = ChecksumDigest::new(DEFAULT_SEED, vec![377, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(digest.hash(), 728_320);
    }

    #[test]
    fn test_fold_wraps() {
        let digest = ChecksumDigest::new(i32::MAX, vec![i32::MAX]);
        assert_eq!(digest.hash(), i32::MAX.wrapping_mul(2).wrapping_add(i32::MAX));
    }

    #[test]
    fn test_wire_layout() {
        let digest = ChecksumDigest::new(0, vec![1, -1]);
        assert_eq!(digest.hash(), 1);
        assert_eq!(
            digest.to_bytes(),
            vec![0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 1]
        );
    }

    #[test]
    fn test_default_table() {
        let table = ChecksumTable::default();
        assert_eq!(table.client_version, 377);
        assert_eq!(table.seed, 1234);
        assert_eq!(table.archive, 0);
        assert_eq!(table.reference_files, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_builder() {
        let table = ChecksumTable::default()
            .with_client_version(317)
            .with_seed(0)
            .with_reference_files(2, [4, 5]);
        assert_eq!(table.client_version, 317);
        assert_eq!(table.seed, 0);
        assert_eq!(table.archive, 2);
        assert_eq!(table.reference_files, vec![4, 5]);
    }

    #[test]
    fn test_crc_is_standard() {
        let mut hasher = Hasher::new();
        hasher.update(b"123456789");
        assert_eq!(hasher.finalize(), 0xCBF4_3926);
    }
}
