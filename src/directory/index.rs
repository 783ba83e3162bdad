//! Directory implementation
//!
//! Vec of entries kept in chain order; lookups scan it front to back.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::block::{Block, BlockOffset};
use crate::error::{ChainError, Result};
use crate::record::compare_prefix;
use crate::storage::BlockFile;

/// Cached bounds of one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Where the block lives in the file
    pub offset: BlockOffset,
    /// Smallest key in the block (empty if the block is empty)
    pub first_key: Vec<u8>,
    /// Largest key in the block (empty if the block is empty)
    pub last_key: Vec<u8>,
}

impl DirectoryEntry {
    pub fn from_block(offset: BlockOffset, block: &Block) -> Self {
        Self {
            offset,
            first_key: block.first_key().to_vec(),
            last_key: block.last_key().to_vec(),
        }
    }

    /// An empty block has no bounds
    pub fn is_empty(&self) -> bool {
        self.last_key.is_empty()
    }

    /// Whether `key` falls inside `[first_key, last_key]`
    pub fn contains(&self, key: &[u8]) -> bool {
        !self.is_empty() && key >= self.first_key.as_slice() && key <= self.last_key.as_slice()
    }
}

/// In-memory mirror of the block chain
///
/// Never authoritative: it can always be rebuilt from the file with `build`.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: Vec<DirectoryEntry>,
}

impl Directory {
    /// Walk the chain from the head block and record every block's bounds
    pub fn build(file: &mut BlockFile) -> Result<Self> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(file.head());

        while let Some(offset) = current {
            if !seen.insert(offset) {
                return Err(ChainError::Corruption(format!(
                    "chain revisits block @{} after {} blocks",
                    offset,
                    entries.len()
                )));
            }
            let block = file.read_block(offset)?;
            entries.push(DirectoryEntry::from_block(offset, &block));
            current = block.next();
        }

        tracing::debug!("Directory built: {} block(s)", entries.len());
        Ok(Self { entries })
    }

    /// Build from entries already in chain order
    pub fn from_entries(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Block offsets in chain order
    pub fn offsets(&self) -> Vec<BlockOffset> {
        self.entries.iter().map(|e| e.offset).collect()
    }

    /// Index of the entry for `offset`
    pub fn position(&self, offset: BlockOffset) -> Option<usize> {
        self.entries.iter().position(|e| e.offset == offset)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Copy a block's fresh bounds into its entry
    pub fn patch(&mut self, offset: BlockOffset, block: &Block) -> Result<()> {
        let index = self.position(offset).ok_or_else(|| {
            ChainError::Directory(format!("no entry for block @{}", offset))
        })?;
        let entry = &mut self.entries[index];
        entry.first_key.clear();
        entry.first_key.extend_from_slice(block.first_key());
        entry.last_key.clear();
        entry.last_key.extend_from_slice(block.last_key());
        Ok(())
    }

    /// Insert `entry` right after `parent`, mirroring a split's relink
    pub fn insert_after(&mut self, parent: BlockOffset, entry: DirectoryEntry) -> Result<()> {
        let index = self.position(parent).ok_or_else(|| {
            ChainError::Directory(format!("no entry for split parent @{}", parent))
        })?;
        self.entries.insert(index + 1, entry);
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Choose the block a new `key` belongs in.
    ///
    /// Walking in chain order, the first non-empty block whose `last_key` is
    /// not below `key` takes it. An empty block is used instead when it sits
    /// in the gap between the previous non-empty block and the key's
    /// position, and past the end the key goes to the last non-empty block
    /// (or a trailing empty one). Any of these keeps the chain ascending.
    ///
    /// Returns `None` only for an empty directory.
    pub fn target_for_insert(&self, key: &[u8]) -> Option<BlockOffset> {
        let mut gap_empty: Option<BlockOffset> = None;
        let mut last_non_empty: Option<BlockOffset> = None;

        for entry in &self.entries {
            if entry.is_empty() {
                gap_empty.get_or_insert(entry.offset);
                continue;
            }
            if key <= entry.last_key.as_slice() {
                if key < entry.first_key.as_slice() {
                    if let Some(empty) = gap_empty {
                        return Some(empty);
                    }
                }
                return Some(entry.offset);
            }
            gap_empty = None;
            last_non_empty = Some(entry.offset);
        }

        gap_empty.or(last_non_empty)
    }

    /// Blocks whose range could hold `key`, in chain order.
    ///
    /// Stops at the first non-empty block starting above `key`.
    pub fn candidates<'a>(&'a self, key: &'a [u8]) -> impl Iterator<Item = BlockOffset> + 'a {
        self.entries
            .iter()
            .filter(|e| !e.is_empty())
            .take_while(move |e| key >= e.first_key.as_slice())
            .filter(move |e| key <= e.last_key.as_slice())
            .map(|e| e.offset)
    }

    /// Blocks that may hold keys starting with `prefix`, in chain order.
    ///
    /// Both checks compare only the first `prefix.len()` bytes: a block is
    /// skipped while it lies wholly below the prefix, and the scan ends at
    /// the first block that starts above it. A run of matching keys can
    /// straddle a block boundary, so a block whose tail leaves the prefix
    /// does not end the scan.
    pub fn prefix_candidates<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = BlockOffset> + 'a {
        self.entries
            .iter()
            .take_while(move |e| compare_prefix(prefix, &e.first_key) != Ordering::Less)
            .filter(move |e| compare_prefix(prefix, &e.last_key) != Ordering::Greater)
            .map(|e| e.offset)
    }
}
