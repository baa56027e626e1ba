//! TSM footer implementation.
//!
//! The footer is a fixed-size (24 bytes) structure at the end of a TSM file
//! that locates the index.

use crate::error::{Error, Result};
use crate::tsm::{FOOTER_MAGIC, FOOTER_SIZE};
use bytes::Buf;
use std::io::Read;

/// BlockHandle represents a pointer to a region of the TSM file.
///
/// It contains the offset and size of the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockHandle {
    /// Offset of the region in the file
    pub offset: u64,
    /// Size of the region in bytes
    pub size: u64,
}

impl BlockHandle {
    /// Encoded size of a handle
    pub const ENCODED_SIZE: usize = 16;

    /// Create a new BlockHandle
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Decode a BlockHandle from bytes (8 for offset + 8 for size)
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::ENCODED_SIZE {
            return Err(Error::corruption("BlockHandle too short"));
        }

        let mut buf = &data[..Self::ENCODED_SIZE];
        let offset = buf.get_u64_le();
        let size = buf.get_u64_le();

        Ok(Self { offset, size })
    }

    /// Get the end offset of this region, or None on overflow
    pub fn end_offset(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }
}

/// Footer is the last 24 bytes of a TSM file.
///
/// Format:
/// ```text
/// [index_handle: 16 bytes]
/// [magic: 8 bytes]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    /// Handle to the index
    pub index_handle: BlockHandle,
}

impl Footer {
    /// Create a new Footer
    pub fn new(index_handle: BlockHandle) -> Self {
        Self { index_handle }
    }

    /// Decode a footer from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != FOOTER_SIZE {
            return Err(Error::corruption(format!(
                "Footer size mismatch: expected {}, got {}",
                FOOTER_SIZE,
                data.len()
            )));
        }

        let magic = (&data[16..24]).get_u64_le();
        if magic != FOOTER_MAGIC {
            return Err(Error::corruption(format!(
                "Invalid TSM footer magic: expected {:#x}, got {:#x}",
                FOOTER_MAGIC, magic
            )));
        }

        let index_handle = BlockHandle::decode(&data[0..16])?;

        Ok(Self { index_handle })
    }

    /// Read the footer from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; FOOTER_SIZE];
        reader.read_exact(&mut buf)?;
        Self::decode(&buf)
    }
}
