//! The key cursor consumed by [`RangeMaxTimeIterator`](crate::RangeMaxTimeIterator).

use crate::accumulator::TimestampArray;
use crate::error::Error;
use crate::time::TimeRange;
use crate::tsm::IndexEntry;

/// Positions over the keys of a TSM file in ascending order.
///
/// Implementations keep a sticky error: once [`err`](Self::err) reports an
/// error, positioning calls return false and the cursor stays failed.
/// Block decode failures are not sticky; [`read_block`](Self::read_block)
/// reports them through its return value only.
pub trait BlockKeyCursor {
    /// The sticky error, if the cursor has failed.
    fn err(&self) -> Option<&Error>;

    /// Move to the next key. Returns false when the cursor is exhausted or
    /// in error.
    fn advance(&mut self) -> bool;

    /// Move to the smallest key greater than or equal to `key`.
    ///
    /// Returns `(exact, found)`: `found` is false when no such key exists
    /// or the cursor is in error; `exact` is true when the found key equals
    /// `key`.
    fn seek(&mut self, key: &[u8]) -> (bool, bool);

    /// The key the cursor is positioned on.
    fn key(&self) -> Option<&[u8]>;

    /// Clear both buffers and refill them with the current key's index
    /// entries (ascending time order) and tombstones (unordered).
    fn entries_and_tombstones(
        &mut self,
        entries: &mut Vec<IndexEntry>,
        tombstones: &mut Vec<TimeRange>,
    );

    /// Decode `entry`'s block into `acc`, overwriting its contents.
    /// Returns false if the block could not be decoded.
    fn read_block(&mut self, entry: &IndexEntry, acc: &mut TimestampArray) -> bool;
}

impl<C: BlockKeyCursor + ?Sized> BlockKeyCursor for Box<C> {
    fn err(&self) -> Option<&Error> {
        (**self).err()
    }

    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn seek(&mut self, key: &[u8]) -> (bool, bool) {
        (**self).seek(key)
    }

    fn key(&self) -> Option<&[u8]> {
        (**self).key()
    }

    fn entries_and_tombstones(
        &mut self,
        entries: &mut Vec<IndexEntry>,
        tombstones: &mut Vec<TimeRange>,
    ) {
        (**self).entries_and_tombstones(entries, tombstones)
    }

    fn read_block(&mut self, entry: &IndexEntry, acc: &mut TimestampArray) -> bool {
        (**self).read_block(entry, acc)
    }
}
