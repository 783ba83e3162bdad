//! Block File
//!
//! The single backing file: a 4-byte header holding the head block offset,
//! followed by block slots allocated one after another at end-of-file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BytesMut};

use crate::block::{slot_size, Block, BlockOffset, BLOCK_HEADER_SIZE};
use crate::config::SyncStrategy;
use crate::error::{ChainError, Result};
use crate::record::RECORD_SIZE;

use super::HEADER_SIZE;

/// Random-access block storage over one file
///
/// Every write goes straight to the file (no buffering), and is fsynced
/// when the sync strategy asks for it. Slots are never freed.
pub struct BlockFile {
    /// Path of the backing file
    path: PathBuf,
    /// Open read/write handle
    file: File,
    /// Records per block, fixes the slot size
    capacity: usize,
    /// Durability of each write
    sync_strategy: SyncStrategy,
    /// Offset of the first block in the chain (persisted in the header)
    head: BlockOffset,
    /// Current end of file; the next slot is allocated here
    end: u64,
}

impl BlockFile {
    /// Open or create a block file
    ///
    /// A missing or zero-length file is initialized with a header and one
    /// empty head block. Otherwise the header is read and checked.
    pub fn open(path: &Path, capacity: usize, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();

        let mut block_file = Self {
            path: path.to_path_buf(),
            file,
            capacity,
            sync_strategy,
            head: BlockOffset::new(HEADER_SIZE)?,
            end: len,
        };

        if len == 0 {
            block_file.initialize()?;
        } else {
            block_file.load_header()?;
        }

        Ok(block_file)
    }

    /// Write a placeholder header, allocate the head block, then point the
    /// header at it
    fn initialize(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&BlockOffset::to_raw(None).to_le_bytes())?;
        self.end = HEADER_SIZE;

        let head = self.allocate()?;
        self.write_head(head)?;

        tracing::debug!(
            "Created store file {} (head block @{}, capacity {})",
            self.path.display(),
            head,
            self.capacity
        );
        Ok(())
    }

    fn load_header(&mut self) -> Result<()> {
        if self.end < HEADER_SIZE {
            return Err(ChainError::Corruption(format!(
                "file is {} bytes, shorter than its {}-byte header",
                self.end, HEADER_SIZE
            )));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut header)?;

        let raw = (&header[..]).get_i32_le();
        let head = BlockOffset::from_raw(raw)?
            .ok_or_else(|| ChainError::Corruption("header has no head block".to_string()))?;
        self.check_offset(head)?;
        self.head = head;

        tracing::debug!(
            "Opened store file {} ({} bytes, head block @{})",
            self.path.display(),
            self.end,
            head
        );
        Ok(())
    }

    // =========================================================================
    // Header
    // =========================================================================

    /// Offset of the first block in the chain
    pub fn head(&self) -> BlockOffset {
        self.head
    }

    /// Persist a new head offset
    pub fn write_head(&mut self, head: BlockOffset) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file
            .write_all(&BlockOffset::to_raw(Some(head)).to_le_bytes())?;
        self.finish_write()?;
        self.head = head;
        Ok(())
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Reserve a new slot at end-of-file and write an empty block into it
    pub fn allocate(&mut self) -> Result<BlockOffset> {
        let offset = BlockOffset::new(self.end)?;
        let slot = slot_size(self.capacity) as usize;

        let mut buf = BytesMut::with_capacity(slot);
        buf.extend_from_slice(&Block::new(self.capacity).encode());
        buf.resize(slot, 0);

        self.file.seek(SeekFrom::Start(offset.get()))?;
        self.file.write_all(&buf)?;
        self.finish_write()?;
        self.end += slot as u64;

        tracing::debug!("Allocated block @{} (file now {} bytes)", offset, self.end);
        Ok(offset)
    }

    /// Read the block at `offset`: its header, then exactly `record_count`
    /// records
    pub fn read_block(&mut self, offset: BlockOffset) -> Result<Block> {
        self.check_offset(offset)?;

        let mut buf = vec![0u8; BLOCK_HEADER_SIZE];
        self.file.seek(SeekFrom::Start(offset.get()))?;
        self.file.read_exact(&mut buf)?;

        // Only pull in the live records; a bad count is left for decode to report
        let count = (&buf[..4]).get_i32_le();
        if count > 0 && (count as usize) < self.capacity {
            buf.resize(BLOCK_HEADER_SIZE + count as usize * RECORD_SIZE, 0);
            self.file.read_exact(&mut buf[BLOCK_HEADER_SIZE..])?;
        }

        Block::decode(&buf, self.capacity).map_err(|e| match e {
            ChainError::Corruption(msg) => {
                tracing::warn!("Corrupt block @{}: {}", offset, msg);
                ChainError::Corruption(format!("block @{}: {}", offset, msg))
            }
            other => other,
        })
    }

    /// Overwrite the block at `offset` in place
    pub fn write_block(&mut self, offset: BlockOffset, block: &Block) -> Result<()> {
        self.check_offset(offset)?;
        if block.len() >= self.capacity {
            return Err(ChainError::Corruption(format!(
                "refusing to write {} records into a block of capacity {} (full blocks split first)",
                block.len(),
                self.capacity
            )));
        }

        self.file.seek(SeekFrom::Start(offset.get()))?;
        self.file.write_all(&block.encode())?;
        self.finish_write()
    }

    /// Force everything to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file length in bytes
    pub fn size(&self) -> u64 {
        self.end
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// A valid offset starts after the header and has a whole slot before EOF
    fn check_offset(&self, offset: BlockOffset) -> Result<()> {
        let start = offset.get();
        if start < HEADER_SIZE || start + slot_size(self.capacity) > self.end {
            return Err(ChainError::Corruption(format!(
                "block offset {} outside file (len {}, slot {} bytes)",
                start,
                self.end,
                slot_size(self.capacity)
            )));
        }
        Ok(())
    }

    fn finish_write(&mut self) -> Result<()> {
        self.file.flush()?;
        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }
}
