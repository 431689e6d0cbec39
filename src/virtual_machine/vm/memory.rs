use crate::virtual_machine::errors::VMError;
use std::ops::Range;

/// Width of a memory or call-input window read by `MLOAD`/`MSTORE`/`CALLDATALOAD`.
pub const WORD_SIZE: usize = 32;

/// Linear, bounds-checked byte memory of one call.
///
/// Memory is zero-filled to a fixed size when the call starts and never
/// resized afterwards. Every
/// access validates `0 <= start <= end <= len` before touching any byte.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Creates `size` zeroed bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reads `size` bytes starting at `offset`.
    pub fn read(&self, offset: i64, size: i64) -> Result<&[u8], VMError> {
        let range = checked_range("memory", offset, size, self.bytes.len())?;
        Ok(&self.bytes[range])
    }

    /// Overwrites `data.len()` bytes at `offset`; nothing is written on failure.
    pub fn write(&mut self, offset: i64, data: &[u8]) -> Result<(), VMError> {
        let range = checked_range("memory", offset, data.len() as i64, self.bytes.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Validates a range without accessing it.
    pub fn check(&self, offset: i64, size: i64) -> Result<Range<usize>, VMError> {
        checked_range("memory", offset, size, self.bytes.len())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

/// Converts a signed `(offset, size)` pair into a slice range of a buffer of
/// length `len`, rejecting negative values, overflow and anything past the end.
pub fn checked_range(
    region: &'static str,
    offset: i64,
    size: i64,
    len: usize,
) -> Result<Range<usize>, VMError> {
    let oob = || VMError::OutOfBounds {
        region,
        offset,
        size,
        len,
    };
    if offset < 0 || size < 0 {
        return Err(oob());
    }
    let end = offset.checked_add(size).ok_or_else(oob)?;
    let (start, end) = (
        usize::try_from(offset).map_err(|_| oob())?,
        usize::try_from(end).map_err(|_| oob())?,
    );
    if end > len {
        return Err(oob());
    }
    Ok(start..end)
}
