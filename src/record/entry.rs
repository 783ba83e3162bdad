//! Record definition
//!
//! A single key/value pair as stored inside a block.

use bytes::{Buf, BufMut};

use crate::error::Result;

use super::{Key, Value};

/// A row returned by scans: (key, value)
pub type KvPair = (Vec<u8>, Vec<u8>);

/// A key/value record
///
/// Ordered by key; the value only breaks ties, which the store never lets
/// happen since keys are unique.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Record {
    key: Key,
    value: Value,
}

impl Record {
    pub fn new(key: Key, value: Value) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Convert into the (key, value) row shape used by scans
    pub fn into_pair(self) -> KvPair {
        (self.key.into_vec(), self.value.into_vec())
    }

    /// Write key field then value field (`RECORD_SIZE` bytes)
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        self.key.encode_into(buf);
        self.value.encode_into(buf);
    }

    pub fn decode_from<B: Buf>(buf: &mut B) -> Result<Self> {
        let key = Key::decode_from(buf)?;
        let value = Value::decode_from(buf)?;
        Ok(Self { key, value })
    }
}
