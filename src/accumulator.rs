//! Reusable scratch buffer holding the decoded timestamps of one block.

/// Sorted timestamps decoded from a single block.
///
/// A decoder clears the array before filling it, so its contents only ever
/// describe the block most recently decoded into it (minus any exclusions
/// applied since). Timestamps must be pushed in ascending order.
#[derive(Debug, Clone, Default)]
pub struct TimestampArray {
    timestamps: Vec<i64>,
}

impl TimestampArray {
    /// Create an empty TimestampArray
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty TimestampArray with room for `capacity` timestamps
    pub fn with_capacity(capacity: usize) -> Self {
        Self { timestamps: Vec::with_capacity(capacity) }
    }

    /// Remove every timestamp.
    pub fn clear(&mut self) {
        self.timestamps.clear();
    }

    /// Append a timestamp. It must not be lower than the current maximum.
    pub fn push(&mut self, ts: i64) {
        debug_assert!(self.timestamps.last().map_or(true, |&last| last <= ts));
        self.timestamps.push(ts);
    }

    /// Append ascending timestamps.
    pub fn extend_from_slice(&mut self, ts: &[i64]) {
        debug_assert!(ts.windows(2).all(|w| w[0] <= w[1]));
        debug_assert!(match (self.timestamps.last(), ts.first()) {
            (Some(last), Some(first)) => last <= first,
            _ => true,
        });
        self.timestamps.extend_from_slice(ts);
    }

    /// Number of timestamps
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the array is empty
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Largest remaining timestamp, if any.
    pub fn max_time(&self) -> Option<i64> {
        self.timestamps.last().copied()
    }

    /// Smallest remaining timestamp, if any.
    pub fn min_time(&self) -> Option<i64> {
        self.timestamps.first().copied()
    }

    /// The remaining timestamps in ascending order.
    pub fn as_slice(&self) -> &[i64] {
        &self.timestamps
    }

    /// Remove every timestamp in the closed interval `[min, max]`.
    pub fn exclude(&mut self, min: i64, max: i64) {
        if min > max || self.is_empty() {
            return;
        }

        let (lo, hi) = self.bounds(min, max);
        if lo < hi {
            self.timestamps.drain(lo..hi);
        }
    }

    /// Returns true if any timestamp lies in the closed interval `[min, max]`.
    pub fn contains(&self, min: i64, max: i64) -> bool {
        if min > max {
            return false;
        }
        let (lo, hi) = self.bounds(min, max);
        lo < hi
    }

    // [lo, hi) index range of the timestamps inside [min, max]
    fn bounds(&self, min: i64, max: i64) -> (usize, usize) {
        let lo = self.timestamps.partition_point(|&ts| ts < min);
        let hi = lo + self.timestamps[lo..].partition_point(|&ts| ts <= max);
        (lo, hi)
    }
}
