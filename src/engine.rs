//! Engine Module
//!
//! The ordered store that drives the file, the blocks and the directory.
//!
//! ## Responsibilities
//! - Validate keys/values against their fixed-width fields
//! - Point lookups: directory pruning + in-block binary search
//! - Sorted inserts with block splitting on overflow
//! - Removal by shifting, update as remove-then-insert
//! - Full and prefix scans in global key order

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use crate::block::{Block, BlockOffset};
use crate::config::Config;
use crate::directory::{Directory, DirectoryEntry};
use crate::error::{ChainError, Result};
use crate::record::{Key, KvPair, Record, Value, MAX_KEY_LEN};
use crate::storage::BlockFile;

/// Summary of a chain walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainStats {
    /// Blocks in the chain
    pub blocks: usize,
    /// Blocks holding no records (never reclaimed)
    pub empty_blocks: usize,
    /// Live records across all blocks
    pub records: usize,
}

/// The ordered block-chain store
///
/// ## Concurrency Model
///
/// The file handle and the directory sit behind one `Mutex`, and every
/// public operation holds it from start to finish. Compound steps
/// (duplicate check + insert, remove + insert for update, the two writes of
/// a split) therefore never interleave with another caller. The store still
/// assumes it is the only process touching its file.
pub struct ChainStore {
    /// Store configuration
    config: Config,

    /// File + directory, mutated together
    state: Mutex<StoreState>,
}

/// Everything an operation needs, owned by the store's lock
struct StoreState {
    /// Backing file (authoritative)
    file: BlockFile,

    /// In-memory mirror of the chain
    directory: Directory,
}

impl ChainStore {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Open/create the file (a new file gets a header and an empty head block)
    /// 3. Walk the chain to build the directory
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = BlockFile::open(&config.path, config.block_capacity, config.sync_strategy)?;
        let directory = Directory::build(&mut file)?;

        tracing::info!(
            "Opened store {} ({} block(s), capacity {})",
            config.path.display(),
            directory.len(),
            config.block_capacity
        );

        Ok(Self {
            config,
            state: Mutex::new(StoreState { file, directory }),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified file
    pub fn open_path(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.path = path.to_path_buf();
        Self::open(config)
    }

    // =========================================================================
    // Public Operations
    // =========================================================================

    /// Insert a new key
    ///
    /// Returns `Ok(false)` if the key already exists; the stored value is
    /// left untouched.
    pub fn insert(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let record = Record::new(Key::new(key)?, Value::new(value)?);
        self.state.lock().insert(record)
    }

    /// Replace the value of `key` by removing it and inserting it again.
    ///
    /// An absent key is simply inserted.
    pub fn update(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let record = Record::new(Key::new(key)?, Value::new(value)?);
        self.state.lock().update(record)
    }

    /// Remove `key`; `Ok(false)` if it was not present
    pub fn remove(&self, key: &[u8]) -> Result<bool> {
        let key = Key::new(key)?;
        self.state.lock().remove(&key)
    }

    /// Look up the value stored under `key`
    pub fn find(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let key = Key::new(key)?;
        let value = self.state.lock().find(&key)?;
        Ok(value.map(Value::into_vec))
    }

    /// Every record, in ascending key order
    pub fn find_all(&self) -> Result<Vec<KvPair>> {
        self.state.lock().find_all()
    }

    /// Every record whose key starts with `prefix`, in ascending key order.
    ///
    /// An empty prefix matches every record. A prefix longer than the widest
    /// key matches nothing and yields an empty list; a NUL byte in the prefix
    /// is rejected with `InvalidKey`, like in a key.
    pub fn find_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>> {
        if prefix.contains(&0) {
            return Err(ChainError::InvalidKey("NUL byte in prefix".to_string()));
        }
        if prefix.len() > MAX_KEY_LEN {
            return Ok(Vec::new());
        }
        self.state.lock().find_prefix(prefix)
    }

    /// Update `key` if present, insert it otherwise
    pub fn insert_or_update(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let record = Record::new(Key::new(key)?, Value::new(value)?);
        let mut state = self.state.lock();
        if state.find(record.key())?.is_some() {
            state.update(record)
        } else {
            state.insert(record)
        }
    }

    /// Check every chain invariant against the file and the directory
    pub fn verify(&self) -> Result<ChainStats> {
        self.state.lock().verify()
    }

    /// Sync the file and close the store
    ///
    /// Writes are already durable per operation; this only adds a final fsync.
    pub fn close(self) -> Result<()> {
        let mut state = self.state.into_inner();
        state.file.sync()?;
        tracing::debug!("Closed store {}", self.config.path.display());
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of blocks in the chain
    pub fn block_count(&self) -> usize {
        self.state.lock().directory.len()
    }

    /// Block offsets in directory order
    pub fn directory_offsets(&self) -> Vec<BlockOffset> {
        self.state.lock().directory.offsets()
    }

    /// Snapshot of the directory entries
    pub fn directory_entries(&self) -> Vec<DirectoryEntry> {
        self.state.lock().directory.entries().to_vec()
    }

    /// Block offsets found by walking the on-disk chain from the head
    pub fn chain_offsets(&self) -> Result<Vec<BlockOffset>> {
        let mut state = self.state.lock();
        Ok(Directory::build(&mut state.file)?.offsets())
    }

    /// Number of live records
    pub fn len(&self) -> Result<usize> {
        self.state.lock().record_count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Current size of the backing file in bytes
    pub fn file_len(&self) -> u64 {
        self.state.lock().file.size()
    }

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl StoreState {
    // =========================================================================
    // Lookup
    // =========================================================================

    /// First exact match among the candidate blocks
    fn find(&mut self, key: &Key) -> Result<Option<Value>> {
        for offset in self.directory.candidates(key.as_bytes()) {
            let block = self.file.read_block(offset)?;
            if let Ok(index) = block.search(key.as_bytes()) {
                return Ok(Some(block.records()[index].value().clone()));
            }
        }
        Ok(None)
    }

    /// Every (block, index) holding `key`.
    ///
    /// Uniqueness should make this at most one position; all of them are
    /// collected anyway so a stray duplicate is removed too.
    fn positions(&mut self, key: &Key) -> Result<Vec<(BlockOffset, usize)>> {
        let mut positions = Vec::new();
        for offset in self.directory.candidates(key.as_bytes()) {
            let block = self.file.read_block(offset)?;
            let start = block.lower_bound(key.as_bytes());
            positions.extend(
                block.records()[start..]
                    .iter()
                    .take_while(|r| r.key() == key)
                    .enumerate()
                    .map(|(i, _)| (offset, start + i)),
            );
        }
        Ok(positions)
    }

    fn find_all(&mut self) -> Result<Vec<KvPair>> {
        let mut result = Vec::new();
        for offset in self.directory.offsets() {
            let block = self.file.read_block(offset)?;
            result.extend(block.into_records().into_iter().map(Record::into_pair));
        }
        Ok(result)
    }

    fn find_prefix(&mut self, prefix: &[u8]) -> Result<Vec<KvPair>> {
        let mut result = Vec::new();
        for offset in self.directory.prefix_candidates(prefix) {
            let block = self.file.read_block(offset)?;
            result.extend(
                block
                    .into_records()
                    .into_iter()
                    .filter(|r| r.key().as_bytes().starts_with(prefix))
                    .map(Record::into_pair),
            );
        }
        Ok(result)
    }

    fn record_count(&mut self) -> Result<usize> {
        let mut count = 0;
        for offset in self.directory.offsets() {
            count += self.file.read_block(offset)?.len();
        }
        Ok(count)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    fn insert(&mut self, record: Record) -> Result<bool> {
        if self.find(record.key())?.is_some() {
            tracing::trace!("Insert rejected, {:?} already present", record.key());
            return Ok(false);
        }

        let offset = self
            .directory
            .target_for_insert(record.key().as_bytes())
            .ok_or_else(|| ChainError::Directory("directory has no blocks".to_string()))?;
        let mut block = self.file.read_block(offset)?;

        let index = match block.search(record.key().as_bytes()) {
            Ok(_) => {
                tracing::warn!(
                    "{:?} found in block @{} but missed by lookup",
                    record.key(),
                    offset
                );
                return Ok(false);
            }
            Err(index) => index,
        };

        tracing::trace!("Insert {:?} into block @{} at {}", record.key(), offset, index);
        block.insert_at(index, record);
        block.update_boundaries();

        if block.is_full() {
            self.split(offset, block)?;
        } else {
            self.file.write_block(offset, &block)?;
            self.directory.patch(offset, &block)?;
        }
        Ok(true)
    }

    /// Divide a full block with a freshly allocated sibling placed right
    /// after it in the chain.
    ///
    /// Not atomic: the shrunken block is written before the sibling, so a
    /// crash in between links to a sibling that is still empty and the
    /// moved upper half is lost.
    fn split(&mut self, offset: BlockOffset, mut block: Block) -> Result<()> {
        let sibling_offset = self.file.allocate()?;
        let sibling = block.split_off();
        block.set_next(Some(sibling_offset));

        self.file.write_block(offset, &block)?;
        self.file.write_block(sibling_offset, &sibling)?;

        self.directory.patch(offset, &block)?;
        self.directory
            .insert_after(offset, DirectoryEntry::from_block(sibling_offset, &sibling))?;

        tracing::debug!(
            "Split block @{} ({} records) -> @{} ({} records), chain now {} blocks",
            offset,
            block.len(),
            sibling_offset,
            sibling.len(),
            self.directory.len()
        );
        Ok(())
    }

    fn remove(&mut self, key: &Key) -> Result<bool> {
        let mut positions = self.positions(key)?;
        if positions.is_empty() {
            return Ok(false);
        }
        if positions.len() > 1 {
            tracing::warn!("{:?} stored {} times, removing all", key, positions.len());
        }

        // Highest (offset, index) first so earlier indices stay valid
        positions.sort_unstable_by(|a, b| b.cmp(a));

        for (offset, index) in positions {
            let mut block = self.file.read_block(offset)?;
            if index >= block.len() {
                return Err(ChainError::Directory(format!(
                    "record {} of block @{} vanished during remove",
                    index, offset
                )));
            }
            block.remove_at(index);
            block.update_boundaries();
            self.file.write_block(offset, &block)?;
            self.directory.patch(offset, &block)?;
        }

        tracing::trace!("Removed {:?}", key);
        Ok(true)
    }

    /// Remove then insert; the insert alone decides the result
    fn update(&mut self, record: Record) -> Result<bool> {
        self.remove(record.key())?;
        self.insert(record)
    }

    // =========================================================================
    // Consistency Check
    // =========================================================================

    fn verify(&mut self) -> Result<ChainStats> {
        let entries = self.directory.entries();
        let mut stats = ChainStats::default();
        let mut seen = HashSet::new();
        let mut previous_key: Option<Key> = None;
        let mut current = Some(self.file.head());

        while let Some(offset) = current {
            if !seen.insert(offset) {
                return Err(ChainError::InvariantViolation(format!(
                    "chain revisits block @{}",
                    offset
                )));
            }
            let block = self.file.read_block(offset)?;

            let entry = entries.get(stats.blocks).ok_or_else(|| {
                ChainError::InvariantViolation(format!(
                    "block @{} at chain position {} has no directory entry",
                    offset, stats.blocks
                ))
            })?;
            if entry.offset != offset {
                return Err(ChainError::InvariantViolation(format!(
                    "directory position {} is @{}, chain has @{}",
                    stats.blocks, entry.offset, offset
                )));
            }
            if *entry != DirectoryEntry::from_block(offset, &block) {
                return Err(ChainError::InvariantViolation(format!(
                    "directory bounds for block @{} are stale",
                    offset
                )));
            }
            if !block.boundaries_consistent() {
                return Err(ChainError::InvariantViolation(format!(
                    "cached bounds of block @{} do not match its records",
                    offset
                )));
            }

            for record in block.records() {
                if let Some(previous) = &previous_key {
                    if record.key() <= previous {
                        return Err(ChainError::InvariantViolation(format!(
                            "{:?} in block @{} does not follow {:?}",
                            record.key(),
                            offset,
                            previous
                        )));
                    }
                }
                previous_key = Some(record.key().clone());
            }

            stats.blocks += 1;
            stats.records += block.len();
            if block.is_empty() {
                stats.empty_blocks += 1;
            }
            current = block.next();
        }

        if stats.blocks != entries.len() {
            return Err(ChainError::InvariantViolation(format!(
                "directory has {} entries, chain has {} blocks",
                entries.len(),
                stats.blocks
            )));
        }

        Ok(stats)
    }
}
