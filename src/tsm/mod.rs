//! Read-only access to TSM (time-structured merge) files.
//!
//! A TSM file stores, per key, a sequence of immutable blocks of
//! timestamped values together with an index describing each block's time
//! bounds and location.
//!
//! ## File Format
//!
//! ```text
//! [Header: 5B]      // magic u32 + version u8
//! [Block 1]
//! [Block 2]
//! ...
//! [Block N]
//! [Index]           // key records, sorted by key
//! [Footer: 24B]     // index handle + magic
//! ```
//!
//! ## Block Format
//!
//! ```text
//! [payload]             // possibly compressed
//! [compression: u8]
//! [crc32: u32]          // over the stored payload
//! ```
//!
//! The decompressed payload holds `[count: u32][count x i64 timestamps]`
//! followed by the encoded values, which this crate never looks at.
//!
//! ## Index Format
//!
//! ```text
//! [key_len: u16][key][count: u16]
//! [min_time: i64][max_time: i64][offset: u64][size: u64]   // x count
//! ```
//!
//! All integers are little-endian. The layout is this crate's own and is
//! not compatible with InfluxDB TSM files, which carry a different header
//! magic and are rejected when opened.
//!
//! Deletions live in a `.tombstone` sidecar, see [`tombstone`].

pub mod block;
pub mod footer;
pub mod index;
pub mod reader;
pub mod tombstone;

pub use block::decode_timestamps;
pub use footer::{BlockHandle, Footer};
pub use index::{IndexEntry, KeyIndex};
pub use reader::{TsmKeyCursor, TsmReader};
pub use tombstone::{TombstoneIndex, TombstoneRecord};

// Re-export CompressionType from config
pub use crate::config::CompressionType;

/// Magic number at the start of every TSM file
pub const HEADER_MAGIC: u32 = 0x736D_7374; // "tsms" on disk

/// Supported file format version
pub const VERSION: u8 = 1;

/// Header size in bytes (magic + version)
pub const HEADER_SIZE: usize = 5;

/// Footer size in bytes (fixed)
pub const FOOTER_SIZE: usize = 24;

/// Magic number closing every TSM file
pub const FOOTER_MAGIC: u64 = 0x5453_4d53_4341_4e5f; // "TSMSCAN_" in hex

/// Size of the compression byte plus checksum after each block payload
pub const BLOCK_TRAILER_SIZE: usize = 5;

/// Encoded size of one index entry
pub const INDEX_ENTRY_SIZE: usize = 32;

/// Extension of the tombstone sidecar file
pub const TOMBSTONE_EXTENSION: &str = "tombstone";
