//! Directory Module
//!
//! In-memory block index mirroring the on-disk chain.
//!
//! ## Responsibilities
//! - One entry per block, in chain order: offset + cached first/last key
//! - Rebuilt by walking the chain at open time (the file is authoritative)
//! - Patched after every mutation that moves a block's boundaries
//! - Prunes blocks for point lookups, prefix scans and insert placement
//!
//! ## Layout
//! ```text
//!  header ──► [@4: a..f] ──► [@35k: g..m] ──► [@17k: n..z] ──► none
//!                 │               │                │
//!  directory:  entry 0         entry 1          entry 2
//! ```
//! Entry order is chain order, which is not file order once blocks split.

mod index;

pub use index::{Directory, DirectoryEntry};
