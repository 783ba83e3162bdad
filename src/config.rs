//! Configuration for chainkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{ChainError, Result};

/// Default number of records per block
pub const DEFAULT_BLOCK_CAPACITY: usize = 16;

/// Smallest capacity that still leaves both halves of a split non-empty
pub const MIN_BLOCK_CAPACITY: usize = 2;

/// Largest accepted capacity (one block slot stays around 1 MiB)
pub const MAX_BLOCK_CAPACITY: usize = 1024;

/// Main configuration for a chainkv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Backing file for the store. Layout:
    ///   [head offset: i32][block][block]...
    pub path: PathBuf,

    /// Records per block; a block splits as soon as it reaches this count.
    /// Not recorded in the file, so a store must be reopened with the
    /// capacity it was created with.
    pub block_capacity: usize,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// How each block/header write is made durable
    pub sync_strategy: SyncStrategy,
}

/// Sync strategy for block writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// Hand writes to the OS without fsync (survives process exit, not power loss)
    OsBuffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./chainkv.db"),
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            sync_strategy: SyncStrategy::EveryWrite,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the settings before a store is opened with them
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BLOCK_CAPACITY..=MAX_BLOCK_CAPACITY).contains(&self.block_capacity) {
            return Err(ChainError::Config(format!(
                "block_capacity must be in {}..={}, got {}",
                MIN_BLOCK_CAPACITY, MAX_BLOCK_CAPACITY, self.block_capacity
            )));
        }
        if self.path.as_os_str().is_empty() {
            return Err(ChainError::Config("path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backing file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the number of records per block
    pub fn block_capacity(mut self, capacity: usize) -> Self {
        self.config.block_capacity = capacity;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
