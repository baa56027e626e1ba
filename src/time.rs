//! Timestamp bounds and closed time intervals.

use serde::{Deserialize, Serialize};

/// Smallest legal timestamp, in nanoseconds since the epoch.
pub const MIN_NANO_TIME: i64 = i64::MIN + 2;

/// Largest legal timestamp, in nanoseconds since the epoch.
pub const MAX_NANO_TIME: i64 = i64::MAX - 1;

/// A timestamp strictly lower than [`MIN_NANO_TIME`].
///
/// Returned as the max time of a key with no data. Because it sorts below
/// every legal timestamp, it can seed a running maximum across many keys
/// without a separate "no data" branch.
pub const INVALID_MIN_NANO_TIME: i64 = i64::MIN;

/// A closed time interval `[min, max]`.
///
/// Used both for query ranges and for tombstones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive lower bound
    pub min: i64,
    /// Inclusive upper bound
    pub max: i64,
}

impl TimeRange {
    /// Create a new TimeRange
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// The range covering every legal timestamp.
    pub fn all() -> Self {
        Self { min: MIN_NANO_TIME, max: MAX_NANO_TIME }
    }

    /// Returns true if `[min, max]` shares at least one timestamp with this range.
    pub fn overlaps(&self, min: i64, max: i64) -> bool {
        self.min <= max && self.max >= min
    }

    /// Returns true if this range lies strictly inside `(min, max)`,
    /// touching neither bound.
    pub fn within(&self, min: i64, max: i64) -> bool {
        min < self.min && self.max < max
    }

    /// Returns true if `ts` lies in the range.
    pub fn contains(&self, ts: i64) -> bool {
        self.min <= ts && ts <= self.max
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::all()
    }
}
