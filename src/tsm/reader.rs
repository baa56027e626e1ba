//! TSM file reader implementation.
//!
//! Opens a TSM file, keeps its index in memory and reads blocks on demand.

use crate::accumulator::TimestampArray;
use crate::config::ReaderOptions;
use crate::cursor::BlockKeyCursor;
use crate::error::{Error, Result};
use crate::time::TimeRange;
use crate::tsm::block::{decode_timestamps, unwrap_block};
use crate::tsm::footer::{BlockHandle, Footer};
use crate::tsm::index::{IndexEntry, KeyIndex};
use crate::tsm::tombstone::TombstoneIndex;
use crate::tsm::{
    BLOCK_TRAILER_SIZE, FOOTER_SIZE, HEADER_MAGIC, HEADER_SIZE, TOMBSTONE_EXTENSION, VERSION,
};
use bytes::{Buf, Bytes};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// TsmReader provides read access to a TSM file.
///
/// The reader is `Sync`: independent cursors may be driven from different
/// threads, with block reads serialized on the file handle.
///
/// Usage:
/// ```no_run
/// use tsmscan::tsm::TsmReader;
/// use tsmscan::ReaderOptions;
///
/// let reader = TsmReader::open("000001.tsm", ReaderOptions::default()).unwrap();
/// for key in reader.keys() {
///     println!("{:?}", key);
/// }
/// ```
#[derive(Debug)]
pub struct TsmReader {
    path: PathBuf,
    file: Mutex<File>,
    index: KeyIndex,
    tombstones: TombstoneIndex,
    options: ReaderOptions,
    file_size: u64,
}

impl TsmReader {
    /// Open a TSM file for reading
    pub fn open<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self> {
        options.validate()?;

        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size < (HEADER_SIZE + FOOTER_SIZE) as u64 {
            return Err(Error::corruption("File too small to be a valid TSM file"));
        }

        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)?;
        let mut buf = &header[..];
        let magic = buf.get_u32_le();
        if magic != HEADER_MAGIC {
            return Err(Error::corruption(format!(
                "Invalid TSM header magic: expected {:#x}, got {:#x}",
                HEADER_MAGIC, magic
            )));
        }
        let version = buf.get_u8();
        if version != VERSION {
            return Err(Error::corruption(format!("Unsupported TSM version {}", version)));
        }

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let footer = Footer::read_from(&mut file)?;

        let index_handle = footer.index_handle;
        let index_end = index_handle
            .end_offset()
            .ok_or_else(|| Error::corruption("Index handle overflows"))?;
        if index_handle.offset < HEADER_SIZE as u64 || index_end > file_size - FOOTER_SIZE as u64
        {
            return Err(Error::corruption(format!(
                "Index handle {:?} outside of file of {} bytes",
                index_handle, file_size
            )));
        }

        let index_data = Self::read_region(&mut file, &index_handle)?;
        let index = KeyIndex::new(index_data)?;

        let tombstones = if options.load_tombstones {
            TombstoneIndex::load(Self::tombstone_path(&path))?
        } else {
            TombstoneIndex::new()
        };

        log::info!(
            "Opened TSM file {:?}: {} keys, {} tombstoned keys",
            path,
            index.len(),
            tombstones.len()
        );

        Ok(Self { path, file: Mutex::new(file), index, tombstones, options, file_size })
    }

    /// Path of the tombstone sidecar belonging to `path`
    pub fn tombstone_path(path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(".");
        name.push(TOMBSTONE_EXTENSION);
        PathBuf::from(name)
    }

    /// Replace the tombstones with an in-memory set
    pub fn with_tombstones(mut self, tombstones: TombstoneIndex) -> Self {
        self.tombstones = tombstones;
        self
    }

    fn read_region(file: &mut File, handle: &BlockHandle) -> Result<Bytes> {
        file.seek(SeekFrom::Start(handle.offset))?;
        let mut buffer = vec![0u8; handle.size as usize];
        file.read_exact(&mut buffer)?;
        Ok(Bytes::from(buffer))
    }

    /// Read a stored block and return its decompressed payload.
    ///
    /// I/O failures surface as [`Error::Io`]; everything else wrong with the
    /// block is a corruption error.
    pub fn read_block(&self, handle: &BlockHandle) -> Result<Bytes> {
        if handle.size < BLOCK_TRAILER_SIZE as u64 || handle.size > self.options.max_block_size {
            return Err(Error::corruption(format!(
                "Block size {} outside of [{}, {}]",
                handle.size, BLOCK_TRAILER_SIZE, self.options.max_block_size
            )));
        }
        match handle.end_offset() {
            Some(end) if end <= self.file_size => {}
            _ => {
                return Err(Error::corruption(format!(
                    "Block {:?} outside of file of {} bytes",
                    handle, self.file_size
                )))
            }
        }

        let raw = {
            let mut file = self.file.lock();
            Self::read_region(&mut file, handle)?
        };

        unwrap_block(&raw, self.options.verify_checksums)
    }

    /// Read `entry`'s block and decode its timestamps into `dst`
    pub fn decode_timestamps(&self, entry: &IndexEntry, dst: &mut TimestampArray) -> Result<()> {
        let payload = self.read_block(&entry.handle)?;
        decode_timestamps(&payload, dst)
    }

    /// Get the index entries of `key`, or None if the key is absent
    pub fn entries(&self, key: &[u8]) -> Result<Option<Vec<IndexEntry>>> {
        let (pos, exact) = self.index.search(key);
        if !exact {
            return Ok(None);
        }
        let mut entries = Vec::new();
        self.index.entries_at(pos, &mut entries)?;
        Ok(Some(entries))
    }

    /// Iterate over all keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.index.keys()
    }

    /// Get the number of keys
    pub fn key_count(&self) -> usize {
        self.index.len()
    }

    /// Get the file size
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the tombstones applied by this reader
    pub fn tombstones(&self) -> &TombstoneIndex {
        &self.tombstones
    }

    /// Create a cursor over the keys, positioned before the first key
    pub fn cursor(&self) -> TsmKeyCursor<'_> {
        TsmKeyCursor::new(self)
    }
}

/// Cursor over the keys of a [`TsmReader`].
///
/// Index corruption and I/O failures are sticky. A block whose bytes are
/// bad only fails that block's decode.
pub struct TsmKeyCursor<'a> {
    reader: &'a TsmReader,
    /// Position in the key index; None before the first advance or seek,
    /// `index.len()` once exhausted
    pos: Option<usize>,
    err: Option<Error>,
}

impl<'a> TsmKeyCursor<'a> {
    fn new(reader: &'a TsmReader) -> Self {
        Self { reader, pos: None, err: None }
    }

    /// Move to index position `pos`, clamping to the exhausted position.
    /// Returns false when `pos` is past the last key.
    fn set_pos(&mut self, pos: usize) -> bool {
        let len = self.reader.index.len();
        self.pos = Some(pos.min(len));
        pos < len
    }

    /// The current position, if on a key
    fn current(&self) -> Option<usize> {
        self.pos.filter(|&p| p < self.reader.index.len())
    }
}

impl BlockKeyCursor for TsmKeyCursor<'_> {
    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn advance(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        let next = self.pos.map_or(0, |p| p.saturating_add(1));
        self.set_pos(next)
    }

    fn seek(&mut self, key: &[u8]) -> (bool, bool) {
        if self.err.is_some() {
            return (false, false);
        }
        let (pos, exact) = self.reader.index.search(key);
        let found = self.set_pos(pos);
        (exact && found, found)
    }

    fn key(&self) -> Option<&[u8]> {
        self.current().and_then(|p| self.reader.index.key_at(p))
    }

    fn entries_and_tombstones(
        &mut self,
        entries: &mut Vec<IndexEntry>,
        tombstones: &mut Vec<TimeRange>,
    ) {
        entries.clear();
        tombstones.clear();

        let pos = match (self.current(), &self.err) {
            (Some(pos), None) => pos,
            _ => return,
        };

        if let Err(e) = self.reader.index.entries_at(pos, entries) {
            log::warn!("Failed to read index entries at position {}: {}", pos, e);
            entries.clear();
            self.err = Some(e);
            return;
        }

        if let Some(key) = self.reader.index.key_at(pos) {
            tombstones.extend_from_slice(self.reader.tombstones.get(key));
        }
    }

    fn read_block(&mut self, entry: &IndexEntry, acc: &mut TimestampArray) -> bool {
        if self.err.is_some() {
            return false;
        }

        match self.reader.decode_timestamps(entry, acc) {
            Ok(()) => true,
            Err(e) if e.is_corruption() => {
                log::warn!("Failed to decode block {:?}: {}", entry.handle, e);
                acc.clear();
                false
            }
            Err(e) => {
                log::warn!("Failed to read block {:?}: {}", entry.handle, e);
                acc.clear();
                self.err = Some(e);
                false
            }
        }
    }
}
