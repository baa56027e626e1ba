// Fixture helpers shared by the integration tests and benchmarks.
// Writes TSM files and tombstone sidecars in the layout the reader expects.

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use tsmscan::tsm::{TombstoneRecord, TsmReader, FOOTER_MAGIC, HEADER_MAGIC, VERSION};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a TSM file in memory. Keys must be added in ascending order.
pub struct TsmFileWriter {
    buf: Vec<u8>,
    index: Vec<u8>,
    snappy: bool,
}

impl TsmFileWriter {
    pub fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(&HEADER_MAGIC.to_le_bytes());
        buf.push(VERSION);
        Self { buf, index: Vec::new(), snappy: false }
    }

    /// Compress blocks written from now on with snappy.
    pub fn snappy(mut self) -> Self {
        self.snappy = true;
        self
    }

    /// Append a key whose blocks hold the given ascending timestamps.
    pub fn key(mut self, key: &str, blocks: &[&[i64]]) -> Self {
        let mut entries = Vec::new();
        for ts in blocks {
            assert!(!ts.is_empty(), "blocks must hold at least one timestamp");
            let offset = self.buf.len() as u64;
            self.write_block(ts);
            let size = self.buf.len() as u64 - offset;
            entries.push((ts[0], ts[ts.len() - 1], offset, size));
        }
        self.index_record(key.as_bytes(), &entries);
        self
    }

    /// Append a key with hand-made index entries and no blocks.
    pub fn raw_key(mut self, key: &str, entries: &[(i64, i64, u64, u64)]) -> Self {
        self.index_record(key.as_bytes(), entries);
        self
    }

    fn write_block(&mut self, ts: &[i64]) {
        let mut payload = Vec::with_capacity(4 + ts.len() * 8 + 4);
        payload.extend_from_slice(&(ts.len() as u32).to_le_bytes());
        for t in ts {
            payload.extend_from_slice(&t.to_le_bytes());
        }
        // stand-in for encoded values
        payload.extend_from_slice(b"vals");

        let (stored, compression) = if self.snappy {
            (compress_snappy(&payload), 1u8)
        } else {
            (payload, 0u8)
        };

        let crc = crc32fast::hash(&stored);
        self.buf.extend_from_slice(&stored);
        self.buf.push(compression);
        self.buf.extend_from_slice(&crc.to_le_bytes());
    }

    fn index_record(&mut self, key: &[u8], entries: &[(i64, i64, u64, u64)]) {
        self.index.extend_from_slice(&(key.len() as u16).to_le_bytes());
        self.index.extend_from_slice(key);
        self.index.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for &(min, max, offset, size) in entries {
            self.index.extend_from_slice(&min.to_le_bytes());
            self.index.extend_from_slice(&max.to_le_bytes());
            self.index.extend_from_slice(&offset.to_le_bytes());
            self.index.extend_from_slice(&size.to_le_bytes());
        }
    }

    /// The complete file contents.
    pub fn into_bytes(mut self) -> Vec<u8> {
        let index_offset = self.buf.len() as u64;
        let index_size = self.index.len() as u64;
        self.buf.extend_from_slice(&self.index);
        self.buf.extend_from_slice(&index_offset.to_le_bytes());
        self.buf.extend_from_slice(&index_size.to_le_bytes());
        self.buf.extend_from_slice(&FOOTER_MAGIC.to_le_bytes());
        self.buf
    }

    pub fn write_to(self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.into_bytes())
    }
}

#[cfg(feature = "snappy")]
fn compress_snappy(payload: &[u8]) -> Vec<u8> {
    snap::raw::Encoder::new().compress_vec(payload).unwrap()
}

#[cfg(not(feature = "snappy"))]
fn compress_snappy(_payload: &[u8]) -> Vec<u8> {
    panic!("snappy fixtures need the snappy feature")
}

/// Write the tombstone sidecar for the TSM file at `tsm_path`.
pub fn write_tombstones(tsm_path: &Path, records: &[TombstoneRecord]) -> io::Result<PathBuf> {
    let mut data = bincode::serialize(records).map_err(io::Error::other)?;
    let crc = crc32fast::hash(&data);
    data.extend_from_slice(&crc.to_le_bytes());

    let path = TsmReader::tombstone_path(tsm_path);
    std::fs::write(&path, data)?;
    Ok(path)
}

/// Ascending timestamps `min..=max`.
pub fn span(min: i64, max: i64) -> Vec<i64> {
    (min..=max).collect()
}
