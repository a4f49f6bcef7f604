//! I/O backends selected by protocol identifier.

use crate::error::BoxError;
use crate::options::StorageOptions;

pub mod local;
pub mod object;

pub use local::LocalBackend;
pub use object::{MemoryBackend, ObjectStoreBackend};

/// An open file supporting reads at arbitrary byte ranges.
pub trait ByteRangeRead: Send {
    /// Size of the underlying file in bytes.
    fn size(&self) -> u64;

    /// Read exactly `length` bytes starting at `offset`.
    fn read_range(&mut self, offset: u64, length: u64) -> Result<Vec<u8>, BoxError>;

    /// Release the underlying descriptor or connection.
    fn close(self: Box<Self>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Opens paths of one protocol family.
pub trait Backend: Send + Sync {
    /// `options` already carries the protocol defaults merged with caller
    /// overrides.
    fn open(
        &self,
        path: &str,
        options: &StorageOptions,
    ) -> Result<Box<dyn ByteRangeRead>, BoxError>;
}

/// `offset..offset + length` as a `usize` range, or an error when it does not
/// fit inside a file of `size` bytes.
pub(crate) fn checked_range(
    offset: u64,
    length: u64,
    size: u64,
) -> Result<std::ops::Range<usize>, BoxError> {
    let end = offset
        .checked_add(length)
        .ok_or_else(|| format!("range {offset}+{length} overflows"))?;
    if end > size {
        return Err(format!("range {offset}..{end} past end of file ({size} bytes)").into());
    }
    Ok(usize::try_from(offset)?..usize::try_from(end)?)
}
