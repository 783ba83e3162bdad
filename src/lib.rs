//! # chainkv
//!
//! A single-file, ordered key-value store with:
//! - Fixed-width records (keys ≤ 64 bytes, values ≤ 1023 bytes)
//! - A linked chain of fixed-capacity sorted blocks
//! - An in-memory directory for pruning lookups and prefix scans
//! - Page splitting on overflow, flush-on-write durability
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ChainStore                            │
//! │   insert / update / remove / find / find_all / find_prefix   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Directory  │          │  BlockFile  │
//!   │ (in memory) │◄─build───│ header+slots│
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                     ┌──────────────────────────┐
//!                     │ Block ─► Block ─► Block  │
//!                     │   (sorted Records)       │
//!                     └──────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod block;
pub mod storage;
pub mod directory;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ChainError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::{ChainStats, ChainStore};
pub use record::KvPair;
pub use storage::StoreManager;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of chainkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
