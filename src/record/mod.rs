//! Record Module
//!
//! Fixed-width binary encoding of a single key/value pair.
//!
//! ## Record Format
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────┐
//! │ Key (65 bytes)           │ Value (1024 bytes)               │
//! │ null-padded, ≤64 live    │ null-padded, ≤1023 live          │
//! └──────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! Each field keeps at least one trailing NUL, and a NUL ends the field on
//! decode. Inputs that would not survive that round trip (too long, or
//! containing NUL) are rejected up front rather than truncated.

mod entry;
pub(crate) mod field;

use std::cmp::Ordering;

pub use entry::{KvPair, Record};
pub use field::{Key, Value};

// =============================================================================
// Shared Constants
// =============================================================================

/// On-disk width of a key field
pub const KEY_FIELD_SIZE: usize = 65;

/// On-disk width of a value field
pub const VALUE_FIELD_SIZE: usize = 1024;

/// Longest key that fits its field with a terminating NUL
pub const MAX_KEY_LEN: usize = KEY_FIELD_SIZE - 1;

/// Longest value that fits its field with a terminating NUL
pub const MAX_VALUE_LEN: usize = VALUE_FIELD_SIZE - 1;

/// On-disk width of one record: key field + value field
pub const RECORD_SIZE: usize = KEY_FIELD_SIZE + VALUE_FIELD_SIZE;

/// Compare `prefix` with the first `prefix.len()` bytes of `key`.
///
/// A key shorter than the prefix compares as its whole self, so `"ab"`
/// sorts below the prefix `"abc"`. `Equal` means `key` starts with `prefix`.
pub fn compare_prefix(prefix: &[u8], key: &[u8]) -> Ordering {
    let n = prefix.len().min(key.len());
    prefix.cmp(&key[..n])
}
