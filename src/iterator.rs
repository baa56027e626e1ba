//! Range intersection and max-time iteration over the keys of a TSM file.
//!
//! [`RangeMaxTimeIterator`] walks keys through a [`BlockKeyCursor`] and
//! answers two questions about the current key: does it have data inside a
//! fixed time range, and what is its newest timestamp not deleted by a
//! tombstone. Both answers are computed together on first ask and cached
//! until the iterator moves.

use crate::accumulator::TimestampArray;
use crate::cursor::BlockKeyCursor;
use crate::error::Error;
use crate::time::{TimeRange, INVALID_MIN_NANO_TIME};
use crate::tsm::index::{intersects_entries, IndexEntry};

/// Cached answers for the current key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Memo {
    has_data: bool,
    last_write: i64,
}

impl Memo {
    const EMPTY: Memo = Memo { has_data: false, last_write: INVALID_MIN_NANO_TIME };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No current key: before the first move, or after running off the end.
    Unpositioned,
    /// On a key whose answers have not been computed.
    Positioned,
    /// On a key with computed answers.
    Loaded(Memo),
    /// The cursor reported an error. Terminal.
    Failed,
}

/// A block could not be decoded while loading a key.
#[derive(Debug)]
struct DecodeFailed;

/// Iterates over keys, reporting per key whether it has data in a time range
/// and its newest surviving timestamp.
///
/// [`has_data`](Self::has_data) and [`max_time`](Self::max_time) take
/// `&mut self` since the first call on a key loads its answers, so a key
/// borrowed from [`key`](Self::key) must be released before calling them.
///
/// # Example
///
/// ```rust,no_run
/// use tsmscan::tsm::TsmReader;
/// use tsmscan::{RangeMaxTimeIterator, ReaderOptions, TimeRange};
///
/// # fn main() -> Result<(), tsmscan::Error> {
/// let reader = TsmReader::open("000001.tsm", ReaderOptions::default())?;
/// let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(0, 1_000));
///
/// while iter.advance() {
///     if iter.has_data() {
///         let last_write = iter.max_time();
///         println!("{:?} last written at {}", iter.key(), last_write);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct RangeMaxTimeIterator<C> {
    cursor: C,
    tr: TimeRange,
    state: State,

    // scratch, reused across keys
    acc: TimestampArray,
    entries: Vec<IndexEntry>,
    tombstones: Vec<TimeRange>,
}

impl<C: BlockKeyCursor> RangeMaxTimeIterator<C> {
    /// Creates an iterator over `cursor` answering for the time range `tr`.
    ///
    /// The cursor is used from its current state; a cursor already in error
    /// yields an iterator that reports no data.
    pub fn new(cursor: C, tr: TimeRange) -> Self {
        let state = if cursor.err().is_some() { State::Failed } else { State::Unpositioned };

        Self {
            cursor,
            tr,
            state,
            acc: TimestampArray::new(),
            entries: Vec::new(),
            tombstones: Vec::new(),
        }
    }

    /// Moves to the next key. Returns false if the cursor is exhausted or in
    /// error.
    pub fn advance(&mut self) -> bool {
        if !self.check_cursor() {
            return false;
        }

        let positioned = self.cursor.advance();
        self.reposition(positioned)
    }

    /// Moves to the smallest key greater than or equal to `key`.
    ///
    /// Returns `(exact, found)`. `found` is false if the cursor is in error
    /// or no such key exists; `exact` is true if the found key equals `key`.
    pub fn seek(&mut self, key: &[u8]) -> (bool, bool) {
        if !self.check_cursor() {
            return (false, false);
        }

        let (exact, found) = self.cursor.seek(key);
        if self.reposition(found) {
            (exact, true)
        } else {
            (false, false)
        }
    }

    /// Reports whether the current key has a value inside the time range
    /// that no tombstone deletes.
    ///
    /// False if the iterator is in error, not on a key, or the key has no
    /// blocks.
    pub fn has_data(&mut self) -> bool {
        self.memo().has_data
    }

    /// Returns the newest timestamp of the current key not deleted by a
    /// tombstone.
    ///
    /// When the key has tombstones this is the newest surviving timestamp
    /// of the whole key, not clipped to the time range. Without tombstones
    /// it is the max time of the key's last block.
    ///
    /// If the iterator is in error or there is no data,
    /// [`INVALID_MIN_NANO_TIME`] is returned, which is less than every legal
    /// timestamp. It can therefore seed a maximum taken across keys.
    pub fn max_time(&mut self) -> i64 {
        self.memo().last_write
    }

    /// The current key, if positioned.
    pub fn key(&self) -> Option<&[u8]> {
        match self.state {
            State::Positioned | State::Loaded(_) => self.cursor.key(),
            State::Unpositioned | State::Failed => None,
        }
    }

    /// The cursor's error, if it failed.
    pub fn err(&self) -> Option<&Error> {
        self.cursor.err()
    }

    /// The time range the iterator answers for.
    pub fn time_range(&self) -> TimeRange {
        self.tr
    }

    /// Get a reference to the underlying cursor
    pub fn cursor(&self) -> &C {
        &self.cursor
    }

    /// Get a mutable reference to the underlying cursor.
    ///
    /// Moving the cursor directly leaves the cached answers stale; use
    /// [`advance`](Self::advance) and [`seek`](Self::seek) instead.
    pub fn cursor_mut(&mut self) -> &mut C {
        &mut self.cursor
    }

    /// Consumes the iterator, returning the cursor
    pub fn into_inner(self) -> C {
        self.cursor
    }

    /// Moves to `Failed` if the cursor has reported an error. Returns false
    /// once failed.
    fn check_cursor(&mut self) -> bool {
        if self.state != State::Failed && self.cursor.err().is_some() {
            self.state = State::Failed;
        }
        self.state != State::Failed
    }

    /// Drops the cached answers after the cursor moved.
    fn reposition(&mut self, positioned: bool) -> bool {
        self.state = if self.cursor.err().is_some() {
            State::Failed
        } else if positioned {
            State::Positioned
        } else {
            State::Unpositioned
        };
        self.state == State::Positioned
    }

    fn memo(&mut self) -> Memo {
        if !self.check_cursor() {
            return Memo::EMPTY;
        }

        match self.state {
            State::Loaded(memo) => memo,
            State::Unpositioned | State::Failed => Memo::EMPTY,
            State::Positioned => {
                let memo = match self.load() {
                    Ok(memo) => memo,
                    Err(DecodeFailed) => {
                        log::debug!(
                            "Block decode failed for key {:?}, reporting no data",
                            self.cursor.key().map(String::from_utf8_lossy)
                        );
                        Memo::EMPTY
                    }
                };

                if !self.check_cursor() {
                    return Memo::EMPTY;
                }
                self.state = State::Loaded(memo);
                memo
            }
        }
    }

    fn load(&mut self) -> Result<Memo, DecodeFailed> {
        self.cursor.entries_and_tombstones(&mut self.entries, &mut self.tombstones);
        if self.entries.is_empty() {
            return Ok(Memo::EMPTY);
        }

        if self.tombstones.is_empty() {
            self.load_without_tombstones()
        } else {
            self.load_with_tombstones()
        }
    }

    /// Nothing is deleted, so the index is exact and decoding is only needed
    /// when the range falls strictly inside block bounds.
    fn load_without_tombstones(&mut self) -> Result<Memo, DecodeFailed> {
        let last_write = match self.entries.last() {
            Some(entry) => entry.max_time,
            None => return Ok(Memo::EMPTY),
        };

        if intersects_entries(&self.entries, &self.tr) {
            log::trace!("Index bounds intersect {:?}, skipping decode", self.tr);
            return Ok(Memo { has_data: true, last_write });
        }

        for i in 0..self.entries.len() {
            if !self.entries[i].overlaps(&self.tr) {
                continue;
            }

            self.read_entry(i)?;
            if self.acc.contains(self.tr.min, self.tr.max) {
                return Ok(Memo { has_data: true, last_write });
            }
        }

        Ok(Memo { has_data: false, last_write })
    }

    /// Tombstones may delete exactly what the index claims is present, so
    /// every candidate block is decoded and filtered.
    ///
    /// The forward scan stops at the first block with surviving data in the
    /// range. That proves intersection but not recency, so a backward scan
    /// from the newest block down to the block found recovers the newest
    /// surviving timestamp.
    fn load_with_tombstones(&mut self) -> Result<Memo, DecodeFailed> {
        let mut memo = Memo::EMPTY;
        let mut found = None;

        for i in 0..self.entries.len() {
            // a block outside the range cannot prove intersection
            if !self.entries[i].overlaps(&self.tr) {
                continue;
            }

            self.read_entry(i)?;
            if self.acc.contains(self.tr.min, self.tr.max) {
                if let Some(max) = self.acc.max_time() {
                    memo = Memo { has_data: true, last_write: max };
                    found = Some(i);
                    break;
                }
            }
        }

        let floor = found.map_or(0, |i| i + 1);
        for j in (floor..self.entries.len()).rev() {
            self.read_entry(j)?;
            if let Some(max) = self.acc.max_time() {
                memo.last_write = max;
                break;
            }
        }

        Ok(memo)
    }

    /// Decodes entry `idx` into the accumulator and removes every tombstoned
    /// timestamp from it.
    fn read_entry(&mut self, idx: usize) -> Result<(), DecodeFailed> {
        if !self.cursor.read_block(&self.entries[idx], &mut self.acc) {
            return Err(DecodeFailed);
        }

        for ts in &self.tombstones {
            self.acc.exclude(ts.min, ts.max);
        }

        Ok(())
    }
}
