//! Read-only memory-mapped store files.
//!
//! Every read addresses the mapping with an explicit offset, so one handle can
//! serve any number of concurrent readers without a shared cursor.

use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A store file mapped into memory for positional reads.
#[derive(Debug)]
pub(crate) struct MappedStore {
    /// Path the store was opened from
    path: PathBuf,
    /// Mapping of the whole file; `None` for zero-length files
    mmap: Option<Mmap>,
}

impl MappedStore {
    /// Open and map `path` read-only.
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        let mmap = if size == 0 {
            None
        } else {
            // The cache is built offline and never modified while served.
            #[allow(unsafe_code)]
            let mmap = unsafe { MmapOptions::new().map(&file)? };
            Some(mmap)
        };

        debug!("Mapped {} ({size} bytes)", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Path the store was opened from.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Whole contents of the store.
    pub(crate) fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Size of the store in bytes.
    pub(crate) fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    /// Exactly `length` bytes at `offset`, or `None` if they do not all fit.
    pub(crate) fn slice(&self, offset: u64, length: usize) -> Option<&[u8]> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(length)?;
        self.bytes().get(start..end)
    }
}
