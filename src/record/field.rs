//! Fixed-width fields
//!
//! `Key` and `Value` are byte strings whose length is checked against the
//! field they are stored in.

use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::{ChainError, Result};

use super::{KEY_FIELD_SIZE, MAX_KEY_LEN, MAX_VALUE_LEN, VALUE_FIELD_SIZE};

// =============================================================================
// Key
// =============================================================================

/// A record key: 1..=64 bytes, no NUL. Ordered lexicographically by byte.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<u8>);

impl Key {
    /// Validate raw bytes as a key
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ChainError::EmptyKey);
        }
        if bytes.len() > MAX_KEY_LEN {
            return Err(ChainError::KeyTooLong {
                len: bytes.len(),
                max: MAX_KEY_LEN,
            });
        }
        if let Some(pos) = bytes.iter().position(|&b| b == 0) {
            return Err(ChainError::InvalidKey(format!("NUL byte at position {}", pos)));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated key; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Write the key null-padded to `KEY_FIELD_SIZE` bytes
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        encode_field(buf, &self.0, KEY_FIELD_SIZE);
    }

    /// Read a key field; an empty field is corruption, since live records
    /// always carry a key
    pub fn decode_from<B: Buf>(buf: &mut B) -> Result<Self> {
        let bytes = decode_field(buf, KEY_FIELD_SIZE)?;
        if bytes.is_empty() {
            return Err(ChainError::Corruption("record with empty key".to_string()));
        }
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", String::from_utf8_lossy(&self.0))
    }
}

// =============================================================================
// Value
// =============================================================================

/// A record value: 0..=1023 bytes, no NUL.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Value(Vec<u8>);

impl Value {
    /// Validate raw bytes as a value
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() > MAX_VALUE_LEN {
            return Err(ChainError::ValueTooLong {
                len: bytes.len(),
                max: MAX_VALUE_LEN,
            });
        }
        if let Some(pos) = bytes.iter().position(|&b| b == 0) {
            return Err(ChainError::InvalidValue(format!("NUL byte at position {}", pos)));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Write the value null-padded to `VALUE_FIELD_SIZE` bytes
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        encode_field(buf, &self.0, VALUE_FIELD_SIZE);
    }

    pub fn decode_from<B: Buf>(buf: &mut B) -> Result<Self> {
        Ok(Self(decode_field(buf, VALUE_FIELD_SIZE)?))
    }
}

impl AsRef<[u8]> for Value {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({:?})", String::from_utf8_lossy(&self.0))
    }
}

// =============================================================================
// Raw Field Codec
// =============================================================================

/// Write `bytes` followed by NUL padding up to `width`.
/// Callers guarantee `bytes.len() < width` through validation.
pub(crate) fn encode_field<B: BufMut>(buf: &mut B, bytes: &[u8], width: usize) {
    debug_assert!(bytes.len() < width);
    buf.put_slice(bytes);
    buf.put_bytes(0, width - bytes.len());
}

/// Consume exactly `width` bytes and return everything before the first NUL.
pub(crate) fn decode_field<B: Buf>(buf: &mut B, width: usize) -> Result<Vec<u8>> {
    if buf.remaining() < width {
        return Err(ChainError::Corruption(format!(
            "field needs {} bytes, only {} left",
            width,
            buf.remaining()
        )));
    }
    let mut raw = vec![0u8; width];
    buf.copy_to_slice(&mut raw);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
    raw.truncate(end);
    Ok(raw)
}
