//! Key index of a TSM file.
//!
//! The index maps each key to the ordered list of blocks holding its data.
//! Record boundaries are located once when the file is opened; the entries
//! of a record are only decoded when a cursor asks for them.

use crate::error::{Error, Result};
use crate::time::TimeRange;
use crate::tsm::footer::BlockHandle;
use crate::tsm::INDEX_ENTRY_SIZE;
use bytes::{Buf, Bytes};

/// IndexEntry describes one block of a key.
///
/// `min_time` and `max_time` are the smallest and largest timestamps
/// actually stored in the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Smallest timestamp in the block
    pub min_time: i64,
    /// Largest timestamp in the block
    pub max_time: i64,
    /// Location of the block
    pub handle: BlockHandle,
}

impl IndexEntry {
    /// Create a new IndexEntry
    pub fn new(min_time: i64, max_time: i64, handle: BlockHandle) -> Self {
        Self { min_time, max_time, handle }
    }

    /// Decode an entry from its 32 byte encoding
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < INDEX_ENTRY_SIZE {
            return Err(Error::corruption("IndexEntry too short"));
        }

        let mut buf = &data[..16];
        let min_time = buf.get_i64_le();
        let max_time = buf.get_i64_le();
        let handle = BlockHandle::decode(&data[16..INDEX_ENTRY_SIZE])?;

        Ok(Self { min_time, max_time, handle })
    }

    /// Returns true if the block's bounds overlap `tr`.
    pub fn overlaps(&self, tr: &TimeRange) -> bool {
        tr.overlaps(self.min_time, self.max_time)
    }
}

/// Returns true if `tr` covers the first or last timestamp of at least one
/// entry.
///
/// Entry bounds are real timestamps, so when this holds and nothing is
/// deleted the key certainly has data in `tr` without decoding anything.
/// A range lying strictly inside an entry's bounds proves nothing: the
/// block may have no timestamp there.
pub fn intersects_entries(entries: &[IndexEntry], tr: &TimeRange) -> bool {
    entries
        .iter()
        .any(|e| tr.overlaps(e.min_time, e.max_time) && !tr.within(e.min_time, e.max_time))
}

/// KeyIndex provides ordered, lazily decoded access to the key records.
#[derive(Debug, Clone)]
pub struct KeyIndex {
    data: Bytes,
    /// Start offset of every key record
    offsets: Vec<usize>,
}

impl KeyIndex {
    /// Create a new KeyIndex from the raw index bytes.
    ///
    /// Walks the record headers once, checking that every record fits in
    /// the buffer and that keys are strictly ascending.
    pub fn new(data: Bytes) -> Result<Self> {
        let mut offsets = Vec::new();
        let mut pos = 0;
        let mut last_key: Option<&[u8]> = None;

        while pos < data.len() {
            let (key, count, entries_start) = Self::parse_header(&data, pos)?;

            if key.is_empty() {
                return Err(Error::corruption(format!("Empty key in index at offset {}", pos)));
            }
            if let Some(last) = last_key {
                if key <= last {
                    return Err(Error::corruption(format!(
                        "Index keys out of order at offset {}",
                        pos
                    )));
                }
            }

            let end = entries_start + count * INDEX_ENTRY_SIZE;
            if end > data.len() {
                return Err(Error::corruption(format!(
                    "Index record at offset {} is truncated",
                    pos
                )));
            }

            offsets.push(pos);
            last_key = Some(key);
            pos = end;
        }

        Ok(Self { data, offsets })
    }

    /// Parse `[key_len][key][count]` at `pos`, returning the key, the entry
    /// count and where the entries start.
    fn parse_header(data: &[u8], pos: usize) -> Result<(&[u8], usize, usize)> {
        let truncated = || Error::corruption(format!("Index header at offset {} is truncated", pos));

        let mut buf = data.get(pos..).ok_or_else(truncated)?;
        if buf.remaining() < 2 {
            return Err(truncated());
        }
        let key_len = buf.get_u16_le() as usize;

        let key_start = pos + 2;
        let key = data.get(key_start..key_start + key_len).ok_or_else(truncated)?;

        let mut buf = data.get(key_start + key_len..).ok_or_else(truncated)?;
        if buf.remaining() < 2 {
            return Err(truncated());
        }
        let count = buf.get_u16_le() as usize;

        Ok((key, count, key_start + key_len + 2))
    }

    /// Get the number of keys in the index
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Get the key at position `idx`
    pub fn key_at(&self, idx: usize) -> Option<&[u8]> {
        let pos = *self.offsets.get(idx)?;
        Self::parse_header(&self.data, pos).ok().map(|(key, _, _)| key)
    }

    /// Position of the smallest key greater than or equal to `key`, and
    /// whether it matches exactly. The position equals `len()` when every
    /// key is smaller.
    pub fn search(&self, key: &[u8]) -> (usize, bool) {
        let pos = self
            .offsets
            .partition_point(|&off| match Self::parse_header(&self.data, off) {
                Ok((k, _, _)) => k < key,
                Err(_) => false,
            });
        let exact = self.key_at(pos) == Some(key);
        (pos, exact)
    }

    /// Decode the entries of the key at position `idx` into `dst`.
    ///
    /// Fails if a block's bounds are inverted or blocks are not in
    /// ascending time order.
    pub fn entries_at(&self, idx: usize, dst: &mut Vec<IndexEntry>) -> Result<()> {
        dst.clear();

        let pos = *self
            .offsets
            .get(idx)
            .ok_or_else(|| Error::InvalidState(format!("No index record at position {}", idx)))?;
        let (_, count, start) = Self::parse_header(&self.data, pos)?;

        dst.reserve(count);
        for i in 0..count {
            let off = start + i * INDEX_ENTRY_SIZE;
            let raw = self
                .data
                .get(off..off + INDEX_ENTRY_SIZE)
                .ok_or_else(|| Error::corruption("Index entry out of bounds"))?;
            let entry = IndexEntry::decode(raw)?;

            if entry.min_time > entry.max_time {
                return Err(Error::corruption(format!(
                    "Index entry {} has min time {} after max time {}",
                    i, entry.min_time, entry.max_time
                )));
            }
            if let Some(prev) = dst.last() {
                if entry.min_time < prev.min_time {
                    return Err(Error::corruption(format!(
                        "Index entry {} is not in ascending time order",
                        i
                    )));
                }
            }

            dst.push(entry);
        }

        Ok(())
    }

    /// Create an iterator over all keys
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.len()).filter_map(move |i| self.key_at(i))
    }
}
