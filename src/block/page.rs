//! Block page
//!
//! Sorted record array with cached boundary keys and in-place shifting.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ChainError, Result};
use crate::record::field::{decode_field, encode_field};
use crate::record::{Record, KEY_FIELD_SIZE, RECORD_SIZE};

use super::{BlockOffset, BLOCK_HEADER_SIZE};

/// A fixed-capacity sorted page of records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Maximum number of records before the block must split
    capacity: usize,
    /// Live records, strictly ascending by key
    records: Vec<Record>,
    /// Next block in the chain
    next: Option<BlockOffset>,
    /// Cached key of `records[0]` (empty when the block is empty)
    first_key: Vec<u8>,
    /// Cached key of the last record (empty when the block is empty)
    last_key: Vec<u8>,
}

impl Block {
    /// Create an empty, unlinked block
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: Vec::with_capacity(capacity),
            next: None,
            first_key: Vec::new(),
            last_key: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True once the block holds `capacity` records and has to split
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Take the live records out of the block
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn next(&self) -> Option<BlockOffset> {
        self.next
    }

    pub fn set_next(&mut self, next: Option<BlockOffset>) {
        self.next = next;
    }

    pub fn first_key(&self) -> &[u8] {
        &self.first_key
    }

    pub fn last_key(&self) -> &[u8] {
        &self.last_key
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Binary search for `key`.
    ///
    /// `Ok(i)` if `records[i]` has the key, `Err(i)` with the index it would
    /// be inserted at otherwise.
    pub fn search(&self, key: &[u8]) -> std::result::Result<usize, usize> {
        self.records
            .binary_search_by(|record| record.key().as_bytes().cmp(key))
    }

    /// Index of the first record whose key is not below `key`
    pub fn lower_bound(&self, key: &[u8]) -> usize {
        self.records
            .partition_point(|record| record.key().as_bytes() < key)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Shift `records[index..]` one slot right and place `record` at `index`.
    ///
    /// Boundaries are not refreshed; call `update_boundaries` afterwards.
    pub fn insert_at(&mut self, index: usize, record: Record) {
        debug_assert!(self.records.len() < self.capacity, "insert into a full block");
        self.records.insert(index, record);
    }

    /// Remove `records[index]`, shifting later records one slot left
    pub fn remove_at(&mut self, index: usize) -> Record {
        self.records.remove(index)
    }

    /// Refresh the cached first/last keys from the boundary records
    pub fn update_boundaries(&mut self) {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => {
                self.first_key = first.key().as_bytes().to_vec();
                self.last_key = last.key().as_bytes().to_vec();
            }
            _ => {
                self.first_key.clear();
                self.last_key.clear();
            }
        }
    }

    /// Whether the cached bounds match the boundary records
    pub fn boundaries_consistent(&self) -> bool {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => {
                self.first_key == first.key().as_bytes() && self.last_key == last.key().as_bytes()
            }
            _ => self.first_key.is_empty() && self.last_key.is_empty(),
        }
    }

    /// Move the upper half of the records (from `len / 2`) into a new block.
    ///
    /// The new block inherits this block's `next` link and both boundary
    /// caches are refreshed. The caller must point `self.next` at wherever
    /// the returned block gets written.
    pub fn split_off(&mut self) -> Block {
        let mid = self.records.len() / 2;
        let mut upper = Vec::with_capacity(self.capacity);
        upper.extend(self.records.drain(mid..));

        let mut sibling = Block {
            capacity: self.capacity,
            records: upper,
            next: self.next,
            first_key: Vec::new(),
            last_key: Vec::new(),
        };

        self.update_boundaries();
        sibling.update_boundaries();
        sibling
    }

    // =========================================================================
    // Codec
    // =========================================================================

    /// Encoded length of this block (header plus live records only)
    pub fn encoded_len(&self) -> usize {
        BLOCK_HEADER_SIZE + self.records.len() * RECORD_SIZE
    }

    /// Serialize the header and the live records
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());

        buf.put_i32_le(self.records.len() as i32);
        buf.put_i32_le(BlockOffset::to_raw(self.next));
        encode_field(&mut buf, &self.first_key, KEY_FIELD_SIZE);
        encode_field(&mut buf, &self.last_key, KEY_FIELD_SIZE);

        for record in &self.records {
            record.encode_into(&mut buf);
        }

        buf.freeze()
    }

    /// Parse a block, trusting nothing past `record_count` records.
    ///
    /// `data` may be longer than the encoded block (e.g. a whole slot).
    /// A stored block always holds fewer than `capacity` records, since a
    /// block splits the moment it fills; a count of `capacity` or more means
    /// the file was written with a larger capacity or is damaged.
    pub fn decode(mut data: &[u8], capacity: usize) -> Result<Self> {
        if data.len() < BLOCK_HEADER_SIZE {
            return Err(ChainError::Corruption(format!(
                "block header needs {} bytes, got {}",
                BLOCK_HEADER_SIZE,
                data.len()
            )));
        }

        let count = data.get_i32_le();
        if count < 0 || count as usize >= capacity {
            return Err(ChainError::Corruption(format!(
                "record count {} outside 0..{}",
                count, capacity
            )));
        }
        let count = count as usize;

        let next = BlockOffset::from_raw(data.get_i32_le())?;
        let first_key = decode_field(&mut data, KEY_FIELD_SIZE)?;
        let last_key = decode_field(&mut data, KEY_FIELD_SIZE)?;

        if data.remaining() < count * RECORD_SIZE {
            return Err(ChainError::Corruption(format!(
                "block claims {} records but only {} bytes follow the header",
                count,
                data.remaining()
            )));
        }

        let mut records = Vec::with_capacity(capacity);
        for _ in 0..count {
            records.push(Record::decode_from(&mut data)?);
        }

        Ok(Self {
            capacity,
            records,
            next,
            first_key,
            last_key,
        })
    }
}
