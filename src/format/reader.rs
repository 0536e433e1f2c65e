//! Bounds-checked little-endian reads over an in-memory archive.

use crate::{Error, Result};

/// Read-only view over an archive buffer.
///
/// Every read is checked against the buffer length; a read that would run
/// past the end yields [`Error::MalformedArchive`] carrying the offending
/// offset instead of panicking.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Wraps a byte buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Returns the underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| Error::malformed(offset, "length overflows the address space"))?;
        self.data.get(offset..end).ok_or_else(|| {
            Error::malformed(
                offset,
                format!(
                    "read of {} bytes runs past the end of the {}-byte archive",
                    len,
                    self.data.len()
                ),
            )
        })
    }

    /// Reads a little-endian `u16` at `offset`.
    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        let bytes = self.slice(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a little-endian `u32` at `offset`.
    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        let bytes = self.slice(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Returns `true` if a `u32` equal to `signature` is stored at `offset`.
    ///
    /// Out-of-range offsets simply do not match.
    pub fn has_signature(&self, offset: usize, signature: u32) -> bool {
        matches!(self.u32_at(offset), Ok(value) if value == signature)
    }
}
