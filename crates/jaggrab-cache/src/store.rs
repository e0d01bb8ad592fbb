//! Cache store lifecycle and file lookup.
//!
//! [`CacheStore`] owns the mapped main store and every index store of one
//! cache directory. It moves through three states, once each:
//!
//! ```text
//! Uninitialized --load--> Ready --close--> Closed
//! ```
//!
//! Loading is all-or-nothing: if any store is missing or unreadable the call
//! fails with [`CacheError::CacheUnavailable`] and the store stays
//! uninitialized. Once ready the stores are never modified, so lookups take a
//! shared reference to them and run concurrently without further locking.

use crate::chain::{BlockChainReader, ChainRead};
use crate::config::StoreConfig;
use crate::error::{CacheError, OutOfRangeKind, Result};
use crate::mapped::MappedStore;
use crate::record::{INDEX_RECORD_SIZE, IndexRecord};
use crate::{INDEX_STORE_PREFIX, MAIN_STORE_FILE, MAX_INDEX_STORES, index_store_name};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Lifecycle state of a [`CacheStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created but not loaded
    Uninitialized,
    /// Loaded and serving reads
    Ready,
    /// Closed; no further reads
    Closed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Ready => f.write_str("ready"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// A file rebuilt from the cache by [`CacheStore::get_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledFile {
    archive: u32,
    file_id: u32,
    data: Vec<u8>,
}

impl AssembledFile {
    /// Archive the file was read from.
    pub const fn archive(&self) -> u32 {
        self.archive
    }

    /// File id within the archive.
    pub const fn file_id(&self) -> u32 {
        self.file_id
    }

    /// File contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length of the file in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take ownership of the file contents.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Store handles of a loaded cache directory.
#[derive(Debug)]
struct LoadedStores {
    root: PathBuf,
    main: MappedStore,
    indices: Vec<MappedStore>,
}

impl LoadedStores {
    fn load(root: &Path) -> Result<Self> {
        let main_path = root.join(MAIN_STORE_FILE);
        if !main_path.is_file() {
            return Err(unavailable(&main_path, "main store not found"));
        }

        let count = discover_index_stores(root)?;

        let main = MappedStore::open(&main_path)
            .map_err(|e| unavailable(&main_path, format!("failed to open main store: {e}")))?;

        let indices = (0..count)
            .map(|archive| {
                let path = root.join(index_store_name(archive));
                MappedStore::open(&path)
                    .map_err(|e| unavailable(&path, format!("failed to open index store: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root: root.to_path_buf(),
            main,
            indices,
        })
    }

    fn index(&self, archive: u32) -> Result<&MappedStore> {
        self.indices
            .get(archive as usize)
            .ok_or(CacheError::OutOfRange {
                kind: OutOfRangeKind::Archive,
                value: u64::from(archive),
                limit: self.indices.len() as u64,
            })
    }

    fn record_count(&self, archive: u32) -> Result<u32> {
        let index = self.index(archive)?;
        Ok((index.len() / INDEX_RECORD_SIZE as u64) as u32)
    }

    fn record(&self, archive: u32, file_id: u32) -> Result<IndexRecord> {
        let index = self.index(archive)?;
        let data = index
            .slice(IndexRecord::offset_of(file_id), INDEX_RECORD_SIZE)
            .ok_or(CacheError::OutOfRange {
                kind: OutOfRangeKind::File,
                value: u64::from(file_id),
                limit: index.len() / INDEX_RECORD_SIZE as u64,
            })?;
        IndexRecord::parse(data)
    }
}

/// Read-only cache of one main store and its index stores.
#[derive(Debug)]
pub struct CacheStore {
    config: StoreConfig,
    state: RwLock<State>,
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Ready(Arc<LoadedStores>),
    Closed,
}

impl State {
    const fn lifecycle(&self) -> Lifecycle {
        match self {
            Self::Uninitialized => Lifecycle::Uninitialized,
            Self::Ready(_) => Lifecycle::Ready,
            Self::Closed => Lifecycle::Closed,
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl CacheStore {
    /// Create an uninitialized store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State::Uninitialized),
        }
    }

    /// Open the cache in `root` with the default configuration.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(root, StoreConfig::default())
    }

    /// Open the cache in `root`.
    pub fn open_with_config(root: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let store = Self::new(config);
        store.load(root)?;
        Ok(store)
    }

    /// Load every store in `root` and become ready.
    ///
    /// Only valid on an uninitialized store. On failure the store stays
    /// uninitialized.
    pub fn load(&self, root: impl AsRef<Path>) -> Result<()> {
        let root = root.as_ref();
        let mut state = self.state.write();

        if !matches!(*state, State::Uninitialized) {
            return Err(CacheError::InvalidTransition {
                from: state.lifecycle(),
                to: Lifecycle::Ready,
            });
        }

        let stores = LoadedStores::load(root)?;

        info!(
            "Loaded cache from {}: {} ({} bytes), {} index stores",
            root.display(),
            stores.main.path().display(),
            stores.main.len(),
            stores.indices.len()
        );

        *state = State::Ready(Arc::new(stores));
        Ok(())
    }

    /// Close the store. Reads already in progress finish normally.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.write();

        if !matches!(*state, State::Ready(_)) {
            return Err(CacheError::InvalidTransition {
                from: state.lifecycle(),
                to: Lifecycle::Closed,
            });
        }

        *state = State::Closed;
        info!("Cache store closed");
        Ok(())
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.read().lifecycle()
    }

    /// Store configuration.
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn loaded(&self) -> Result<Arc<LoadedStores>> {
        match &*self.state.read() {
            State::Ready(stores) => Ok(Arc::clone(stores)),
            other => Err(CacheError::StoreNotReady {
                state: other.lifecycle(),
            }),
        }
    }

    /// Directory the cache was loaded from.
    pub fn root(&self) -> Result<PathBuf> {
        Ok(self.loaded()?.root.clone())
    }

    /// Number of index stores (archives) loaded.
    pub fn index_count(&self) -> Result<usize> {
        Ok(self.loaded()?.indices.len())
    }

    /// Number of whole records in the index store of `archive`.
    pub fn record_count(&self, archive: u32) -> Result<u32> {
        self.loaded()?.record_count(archive)
    }

    /// Size of the main store in bytes.
    pub fn main_store_len(&self) -> Result<u64> {
        Ok(self.loaded()?.main.len())
    }

    /// Index record of `file_id` in `archive`.
    pub fn record(&self, archive: u32, file_id: u32) -> Result<IndexRecord> {
        self.loaded()?.record(archive, file_id)
    }

    /// Walk the chain of `file_id` in `archive`, reporting the sectors visited.
    pub fn read_chain(&self, archive: u32, file_id: u32) -> Result<ChainRead> {
        let stores = self.loaded()?;
        let record = stores.record(archive, file_id)?;

        trace!(
            "Reading file {file_id} from archive {archive}: {} bytes from block {}",
            record.length,
            record.start_block
        );

        if record.is_empty() {
            return Ok(ChainRead {
                data: Vec::new(),
                blocks: 0,
            });
        }

        BlockChainReader::new(stores.main.bytes())
            .with_policy(self.config.header_policy)
            .for_archive(archive)
            .read(record.start_block, record.length, file_id)
    }

    /// Rebuild `file_id` of `archive` from the cache.
    pub fn get_file(&self, archive: u32, file_id: u32) -> Result<AssembledFile> {
        let read = self.read_chain(archive, file_id)?;
        Ok(AssembledFile {
            archive,
            file_id,
            data: read.data,
        })
    }
}

/// Count the index stores in `root`, requiring them to be numbered `0..count`.
fn discover_index_stores(root: &Path) -> Result<u32> {
    let entries = std::fs::read_dir(root)
        .map_err(|e| unavailable(root, format!("failed to read cache directory: {e}")))?;

    let mut found = BTreeSet::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| unavailable(root, format!("failed to read directory entry: {e}")))?;
        let name = entry.file_name();
        if let Some(name) = name.to_str()
            && let Some(suffix) = name.strip_prefix(INDEX_STORE_PREFIX)
            && let Ok(archive) = suffix.parse::<u32>()
        {
            debug!("Found index store {name}");
            found.insert(archive);
        }
    }

    if found.is_empty() {
        return Err(unavailable(root, "no index stores found"));
    }
    if found.len() > MAX_INDEX_STORES {
        return Err(unavailable(
            root,
            format!(
                "{} index stores found, at most {MAX_INDEX_STORES} supported",
                found.len()
            ),
        ));
    }

    let count = found.len() as u32;
    if let Some(missing) = (0..count).find(|archive| !found.contains(archive)) {
        return Err(unavailable(
            root,
            format!("index stores are not contiguous: {} missing", index_store_name(missing)),
        ));
    }

    Ok(count)
}

fn unavailable(path: &Path, reason: impl Into<String>) -> CacheError {
    CacheError::CacheUnavailable {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
