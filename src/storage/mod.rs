//! Storage Module
//!
//! Single-file block storage plus a manager for a directory of named stores.
//!
//! ## Responsibilities
//! - Bootstrap a store file (header + empty head block)
//! - Append-only block allocation at end-of-file
//! - Random-access block reads and flush-on-write block writes
//! - Open one store file per name inside a data directory
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Header (4 bytes)                       │
//! │ ┌────────────────────────────────────┐ │
//! │ │ HeadBlock: i32 (offset of block 0) │ │
//! │ └────────────────────────────────────┘ │
//! ├────────────────────────────────────────┤
//! │ Block slot                             │
//! │ (see block module for layout)          │
//! ├────────────────────────────────────────┤
//! │ Block slot                             │
//! │ ... allocated at EOF, never freed ...  │
//! └────────────────────────────────────────┘
//! ```
//! Chain order follows each block's `next` link, not file order.

mod file;
mod manager;

pub use file::BlockFile;
pub use manager::StoreManager;

/// Header size: HeadBlock offset (4)
pub const HEADER_SIZE: u64 = 4;
