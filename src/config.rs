//! Configuration options for opening TSM files.

use crate::tsm::BLOCK_TRAILER_SIZE;

/// Configuration options for opening a [`TsmReader`](crate::tsm::TsmReader).
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Verify the CRC32 of every block as it is read.
    /// Default: true
    pub verify_checksums: bool,

    /// Load the `.tombstone` sidecar next to the file, if present.
    /// Default: true
    pub load_tombstones: bool,

    /// Largest block size (in bytes, including the trailer) the reader will
    /// allocate for. Larger handles are reported as corrupt.
    /// Default: 16MB
    pub max_block_size: u64,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            load_tombstones: true,
            max_block_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Compression algorithms a block may be stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression.
    None = 0,

    /// Snappy compression (fast, moderate compression ratio).
    #[cfg(feature = "snappy")]
    Snappy = 1,
}

impl CompressionType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionType::None),
            #[cfg(feature = "snappy")]
            1 => Some(CompressionType::Snappy),
            _ => None,
        }
    }
}

impl Default for CompressionType {
    fn default() -> Self {
        #[cfg(feature = "snappy")]
        return CompressionType::Snappy;

        #[cfg(not(feature = "snappy"))]
        CompressionType::None
    }
}

impl ReaderOptions {
    /// Creates a new ReaderOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether block checksums are verified.
    pub fn verify_checksums(mut self, value: bool) -> Self {
        self.verify_checksums = value;
        self
    }

    /// Sets whether the tombstone sidecar is loaded.
    pub fn load_tombstones(mut self, value: bool) -> Self {
        self.load_tombstones = value;
        self
    }

    /// Sets the maximum block size.
    pub fn max_block_size(mut self, size: u64) -> Self {
        self.max_block_size = size;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_block_size <= BLOCK_TRAILER_SIZE as u64 {
            return Err(crate::Error::invalid_argument(format!(
                "max_block_size must be > {}",
                BLOCK_TRAILER_SIZE
            )));
        }
        Ok(())
    }
}
