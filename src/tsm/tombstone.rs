//! Tombstone sidecar for TSM files.
//!
//! Deleting data from an immutable TSM file records the deleted time
//! interval per key in `<file>.tombstone` instead of rewriting blocks.
//! Readers must honor these intervals even though the index still
//! describes the deleted timestamps.
//!
//! Format:
//! ```text
//! [records: bincode Vec<TombstoneRecord>]
//! [checksum: u32]        // crc32 of the records
//! ```

use crate::error::{Error, Result};
use crate::time::TimeRange;
use bytes::Buf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// A deleted interval `[min, max]` of one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TombstoneRecord {
    /// The key the deletion applies to
    pub key: Vec<u8>,
    /// Inclusive lower bound of the deleted interval
    pub min: i64,
    /// Inclusive upper bound of the deleted interval
    pub max: i64,
}

impl TombstoneRecord {
    /// Create a new TombstoneRecord
    pub fn new(key: impl Into<Vec<u8>>, min: i64, max: i64) -> Self {
        Self { key: key.into(), min, max }
    }
}

/// Tombstones grouped by key.
#[derive(Debug, Clone, Default)]
pub struct TombstoneIndex {
    by_key: BTreeMap<Vec<u8>, Vec<TimeRange>>,
}

impl TombstoneIndex {
    /// Create an empty TombstoneIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from records. Inverted intervals are dropped.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = TombstoneRecord>,
    {
        let mut index = Self::new();
        for record in records {
            index.add(record.key, TimeRange::new(record.min, record.max));
        }
        index
    }

    /// Record a deleted interval for `key`.
    pub fn add(&mut self, key: Vec<u8>, range: TimeRange) {
        if range.min > range.max {
            log::warn!("Ignoring inverted tombstone [{}, {}]", range.min, range.max);
            return;
        }
        self.by_key.entry(key).or_default().push(range);
    }

    /// Decode a sidecar's contents.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::corruption("Tombstone file too small"));
        }

        let (payload, mut checksum) = data.split_at(data.len() - 4);
        let stored = checksum.get_u32_le();
        let computed = crc32fast::hash(payload);
        if stored != computed {
            return Err(Error::ChecksumMismatch { expected: stored, actual: computed });
        }

        let records: Vec<TombstoneRecord> = bincode::deserialize(payload)?;
        Ok(Self::from_records(records))
    }

    /// Load the sidecar at `path`. A missing file means no tombstones.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(data) => {
                let index = Self::decode(&data)?;
                log::debug!("Loaded {} tombstoned keys from {:?}", index.len(), path);
                Ok(index)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Tombstones recorded for `key`
    pub fn get(&self, key: &[u8]) -> &[TimeRange] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of keys with at least one tombstone
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Check if no key has a tombstone
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn encode(records: &[TombstoneRecord]) -> Vec<u8> {
        let mut data = bincode::serialize(records).unwrap();
        let crc = crc32fast::hash(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        data
    }

    #[test]
    fn test_from_records_groups_by_key() {
        let index = TombstoneIndex::from_records(vec![
            TombstoneRecord::new("cpu", 0, 10),
            TombstoneRecord::new("mem", 5, 5),
            TombstoneRecord::new("cpu", 20, 30),
            TombstoneRecord::new("cpu", 9, 1),
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(b"cpu"), &[TimeRange::new(0, 10), TimeRange::new(20, 30)]);
        assert_eq!(index.get(b"mem"), &[TimeRange::new(5, 5)]);
        assert!(index.get(b"disk").is_empty());
    }

    #[test]
    fn test_decode() {
        let data = encode(&[TombstoneRecord::new("cpu", 1, 2)]);
        let index = TombstoneIndex::decode(&data).unwrap();
        assert_eq!(index.get(b"cpu"), &[TimeRange::new(1, 2)]);
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut data = encode(&[TombstoneRecord::new("cpu", 1, 2)]);
        data[0] ^= 0xFF;
        assert!(matches!(
            TombstoneIndex::decode(&data),
            Err(Error::ChecksumMismatch { .. })
        ));
        assert!(TombstoneIndex::decode(&[1, 2]).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let index = TombstoneIndex::load(dir.path().join("none.tombstone")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("000001.tsm.tombstone");
        std::fs::write(&path, encode(&[TombstoneRecord::new("disk", -5, 5)])).unwrap();

        let index = TombstoneIndex::load(&path).unwrap();
        assert_eq!(index.get(b"disk"), &[TimeRange::new(-5, 5)]);
    }
}
