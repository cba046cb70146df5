//! Little-endian wire codec helpers.
//!
//! The wire format is hand-rolled: every field is written explicitly in
//! little-endian order. No reflection-driven serializer gets anywhere
//! near consensus-critical bytes.

use crate::model::types::{Hash256, Key, Signature};
use crate::model::ModelError;

/// Cursor over a byte slice with bounds-checked little-endian reads.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], ModelError> {
        if self.remaining() < count {
            return Err(ModelError::TruncatedEntity {
                expected: self.offset + count,
                available: self.bytes.len(),
            });
        }

        let slice = &self.bytes[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ModelError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ModelError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ModelError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, ModelError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    pub(crate) fn read_hash(&mut self) -> Result<Hash256, ModelError> {
        let bytes = self.take(32)?;
        let mut raw = [0u8; 32];
        raw.copy_from_slice(bytes);
        Ok(Hash256(raw))
    }

    pub(crate) fn read_key(&mut self) -> Result<Key, ModelError> {
        let bytes = self.take(32)?;
        let mut raw = [0u8; 32];
        raw.copy_from_slice(bytes);
        Ok(Key(raw))
    }

    pub(crate) fn read_signature(&mut self) -> Result<Signature, ModelError> {
        let bytes = self.take(64)?;
        let mut raw = [0u8; 64];
        raw.copy_from_slice(bytes);
        Ok(Signature(raw))
    }

    pub(crate) fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, ModelError> {
        Ok(self.take(count)?.to_vec())
    }

    pub(crate) fn skip(&mut self, count: usize) -> Result<(), ModelError> {
        self.take(count).map(|_| ())
    }
}

/// Rounds `size` up to the next 8-byte boundary.
///
/// Entities inside a block body are aligned so that fixed-layout
/// readers can step through them without unaligned loads.
pub fn padded_size(size: usize) -> usize {
    (size + 7) & !7
}
