//! Max-time scan across a range of keys.

use crate::cursor::BlockKeyCursor;
use crate::error::{Error, Result};
use crate::iterator::RangeMaxTimeIterator;
use crate::time::INVALID_MIN_NANO_TIME;

/// A key with data in the scanned time range, and its newest surviving
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaxTime {
    /// The key
    pub key: Vec<u8>,
    /// Newest timestamp of the key not deleted by a tombstone
    pub max_time: i64,
}

/// Result of [`scan_max_time`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Keys with data in the time range, in ascending key order
    pub keys: Vec<KeyMaxTime>,
    /// Largest `max_time` over `keys`, or [`INVALID_MIN_NANO_TIME`] when
    /// `keys` is empty
    pub max_time: i64,
}

impl Default for ScanSummary {
    fn default() -> Self {
        Self { keys: Vec::new(), max_time: INVALID_MIN_NANO_TIME }
    }
}

/// Visit the keys in `[start, end)` (unbounded above when `end` is None) and
/// collect those with data in the iterator's time range.
///
/// # Errors
///
/// Returns an error if the underlying cursor fails during the scan. Keys
/// whose blocks fail to decode are skipped.
pub fn scan_max_time<C: BlockKeyCursor>(
    iter: &mut RangeMaxTimeIterator<C>,
    start: &[u8],
    end: Option<&[u8]>,
) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();

    let (_, mut positioned) = iter.seek(start);
    while positioned {
        let key = match iter.key() {
            Some(key) if end.map_or(true, |end| key < end) => key.to_vec(),
            _ => break,
        };

        if iter.has_data() {
            let max_time = iter.max_time();
            summary.max_time = summary.max_time.max(max_time);
            summary.keys.push(KeyMaxTime { key, max_time });
        }

        positioned = iter.advance();
    }

    if let Some(e) = iter.err() {
        return Err(Error::InvalidState(format!("Key scan aborted: {}", e)));
    }

    log::debug!(
        "Scanned {} keys with data in {:?}, max time {}",
        summary.keys.len(),
        iter.time_range(),
        summary.max_time
    );

    Ok(summary)
}
