//! Block Module
//!
//! A block is a fixed-capacity page of records kept in ascending key order,
//! plus a forward link to the next block in the chain.
//!
//! ## Block Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Header (138 bytes)                                          │
//! │   RecordCount: i32 (4) | NextBlock: i32 (4, -1 = none)      │
//! │   FirstKey: [u8; 65]   | LastKey: [u8; 65]                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Records (RecordCount × 1089 bytes)                          │
//! │   [Key: 65][Value: 1024]                                    │
//! │   ... only the live records are written ...                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Unused capacity (reserved, never written or read)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian.

mod page;

use std::fmt;

use crate::error::{ChainError, Result};
use crate::record::{KEY_FIELD_SIZE, RECORD_SIZE};

pub use page::Block;

// =============================================================================
// Shared Constants
// =============================================================================

/// On-disk sentinel for "no next block"
pub(crate) const NO_BLOCK: i32 = -1;

/// Header size: RecordCount (4) + NextBlock (4) + FirstKey (65) + LastKey (65)
pub const BLOCK_HEADER_SIZE: usize = 4 + 4 + KEY_FIELD_SIZE + KEY_FIELD_SIZE;

/// Bytes reserved on disk for one block of the given capacity.
///
/// Blocks are rewritten in place as they grow, so every slot is sized for a
/// full block even though only the live records are ever written.
pub fn slot_size(capacity: usize) -> u64 {
    (BLOCK_HEADER_SIZE + capacity * RECORD_SIZE) as u64
}

// =============================================================================
// Block Offset
// =============================================================================

/// Byte offset of a block within the store file.
///
/// Blocks are linked by offset, so this is the chain's pointer type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockOffset(u32);

impl BlockOffset {
    /// Largest representable offset (the link field is a signed 32-bit int)
    pub const MAX: u64 = i32::MAX as u64;

    /// Wrap a file position, failing if it does not fit the on-disk link field
    pub fn new(offset: u64) -> Result<Self> {
        if offset > Self::MAX {
            return Err(ChainError::FileFull { offset });
        }
        Ok(Self(offset as u32))
    }

    pub fn get(self) -> u64 {
        self.0 as u64
    }

    /// Encode an optional link the way it is stored on disk
    pub(crate) fn to_raw(link: Option<BlockOffset>) -> i32 {
        match link {
            Some(offset) => offset.0 as i32,
            None => NO_BLOCK,
        }
    }

    /// Decode an on-disk link; negative values other than -1 are corruption
    pub(crate) fn from_raw(raw: i32) -> Result<Option<BlockOffset>> {
        match raw {
            NO_BLOCK => Ok(None),
            r if r < 0 => Err(ChainError::Corruption(format!("invalid block link {}", r))),
            r => Ok(Some(BlockOffset(r as u32))),
        }
    }
}

impl fmt::Debug for BlockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl fmt::Display for BlockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
