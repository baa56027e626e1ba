//! # tsmscan - Tombstone-Aware Key Scanning for TSM Files
//!
//! tsmscan answers two questions about every key of a TSM (time-structured
//! merge) file without decoding blocks unless it has to:
//!
//! - does the key have a value inside a time range, once deleted intervals
//!   (tombstones) are taken into account?
//! - what is the newest timestamp of the key that no tombstone deletes?
//!
//! ## Architecture
//!
//! - **TSM reader** ([`tsm`]): header, footer, key index and tombstone
//!   sidecar of a file; reads and decodes blocks on demand
//! - **Key cursor** ([`BlockKeyCursor`]): ordered positioning over keys with
//!   a sticky error, plus per-key entries, tombstones and block decoding
//! - **Range max-time iterator** ([`RangeMaxTimeIterator`]): the per-key
//!   answers, computed once per position and cached
//! - **Max-time scan** ([`scan`]): the answers folded over a key range
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tsmscan::tsm::TsmReader;
//! use tsmscan::{RangeMaxTimeIterator, ReaderOptions, TimeRange, INVALID_MIN_NANO_TIME};
//!
//! # fn main() -> Result<(), tsmscan::Error> {
//! let reader = TsmReader::open("./data/000001.tsm", ReaderOptions::default())?;
//! let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(0, 1_000_000));
//!
//! // the sentinel is below every legal timestamp
//! let mut newest = INVALID_MIN_NANO_TIME;
//! while iter.advance() {
//!     if iter.has_data() {
//!         newest = newest.max(iter.max_time());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod accumulator;
pub mod config;
pub mod cursor;
pub mod error;
pub mod iterator;
pub mod scan;
pub mod time;
pub mod tsm;

// Re-exports
pub use accumulator::TimestampArray;
pub use config::{CompressionType, ReaderOptions};
pub use cursor::BlockKeyCursor;
pub use error::{Error, Result};
pub use iterator::RangeMaxTimeIterator;
pub use scan::{scan_max_time, KeyMaxTime, ScanSummary};
pub use time::{TimeRange, INVALID_MIN_NANO_TIME, MAX_NANO_TIME, MIN_NANO_TIME};
