//! Error types for chainkv
//!
//! Provides a unified error type for all operations.
//!
//! Duplicate inserts and missing keys are not errors: the store reports them
//! as `Ok(false)` / `Ok(None)`. Everything here is either an I/O failure, a
//! malformed file, or an input that does not fit its fixed-width field.

use thiserror::Error;

/// Result type alias using ChainError
pub type Result<T> = std::result::Result<T, ChainError>;

/// Unified error type for chainkv operations
#[derive(Debug, Error)]
pub enum ChainError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Input Errors (fixed-width fields reject instead of truncating)
    // -------------------------------------------------------------------------
    #[error("Key must not be empty")]
    EmptyKey,

    #[error("Key too long: {len} bytes (max {max})")]
    KeyTooLong { len: usize, max: usize },

    #[error("Value too long: {len} bytes (max {max})")]
    ValueTooLong { len: usize, max: usize },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt store file: {0}")]
    Corruption(String),

    #[error("Store file full: next block at offset {offset} exceeds the 32-bit offset range")]
    FileFull { offset: u64 },

    #[error("Directory out of sync with chain: {0}")]
    Directory(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid store name: {0}")]
    InvalidStoreName(String),
}
