//! Fixed-Size Circular Buffer for Per-Device History
//!
//! ## Overview
//!
//! Device tracking keeps the last ten positions a device was fixed at in a
//! bounded ring where the newest entry silently evicts the oldest. The
//! per-beacon RSSI history is sized at runtime from the pipeline
//! configuration and lives in a `VecDeque` instead.
//!
//! A circular buffer provides this with fixed memory per device:
//! - O(1) insertion (overwrites oldest when full)
//! - O(1) access to most recent entry
//! - O(n) iteration in chronological order
//!
//! ### Memory Layout
//!
//! ```text
//! CircularBuffer<T, 5>:
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │  0  │  1  │  2  │  3  │  4  │  ← Array indices
//! └─────┴─────┴─────┴─────┴─────┘
//!    ↑                       ↑
//!    └── write_pos = 0      └── After 5 writes, wraps here
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use lodestar_core::buffer::CircularBuffer;
//!
//! let mut recent: CircularBuffer<f64, 3> = CircularBuffer::new();
//! for value in [-61.0, -62.5, -60.0, -64.0] {
//!     recent.push(value);
//! }
//!
//! assert_eq!(recent.len(), 3);
//! assert_eq!(recent.last(), Some(&-64.0));
//! assert_eq!(recent.iter().copied().collect::<Vec<_>>(), vec![-62.5, -60.0, -64.0]);
//! ```

use serde::ser::{Serialize, Serializer};

/// Fixed-size ring buffer that keeps the newest `N` entries
///
/// ## Internal Invariants
///
/// - `write_pos < N` (next write position is always valid)
/// - `len <= N`
/// - Iteration yields entries oldest to newest
///
/// ## Thread Safety
///
/// Not synchronized. The tracker only touches a device's buffers while
/// holding that device's lock.
#[derive(Debug, Clone, PartialEq)]
pub struct CircularBuffer<T: Copy, const N: usize> {
    /// Storage; `None` marks slots never written
    data: [Option<T>; N],

    /// Index where the next write will occur
    write_pos: usize,

    /// Current number of valid entries
    len: usize,
}

impl<T: Copy, const N: usize> CircularBuffer<T, N> {
    /// Creates a new empty buffer
    pub const fn new() -> Self {
        Self {
            data: [None; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Adds an entry, overwriting the oldest one when full
    pub fn push(&mut self, item: T) {
        if N == 0 {
            return;
        }
        self.data[self.write_pos] = Some(item);
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the next push evicts an entry
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Capacity of the ring
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }

        let idx = if self.write_pos == 0 { N - 1 } else { self.write_pos - 1 };
        self.data[idx].as_ref()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> CircularBufferIter<'_, T, N> {
        CircularBufferIter {
            buffer: self,
            index: 0,
        }
    }

    /// The newest `count` entries, oldest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> {
        self.iter().skip(self.len.saturating_sub(count))
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.data = [None; N];
        self.write_pos = 0;
        self.len = 0;
    }

    /// Entry by logical index (0 = oldest, len-1 = newest)
    ///
    /// ```text
    /// Physical array:  [D, E, A, B, C]  (write_pos = 2)
    /// Logical view:    [A, B, C, D, E]
    /// logical[i] = physical[(write_pos + i) % N] once full
    /// ```
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        let actual_index = if self.len < N {
            index
        } else {
            (self.write_pos + index) % N
        };

        self.data[actual_index].as_ref()
    }
}

/// Iterator over circular buffer contents
pub struct CircularBufferIter<'a, T: Copy, const N: usize> {
    buffer: &'a CircularBuffer<T, N>,
    index: usize,
}

impl<'a, T: Copy, const N: usize> Iterator for CircularBufferIter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a, T: Copy, const N: usize> ExactSizeIterator for CircularBufferIter<'a, T, N> {}

impl<T: Copy, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Serialize, const N: usize> Serialize for CircularBuffer<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer() {
        let buffer: CircularBuffer<f64, 5> = CircularBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert!(buffer.last().is_none());
        assert_eq!(buffer.capacity(), 5);
    }

    #[test]
    fn circular_overwrite() {
        let mut buffer = CircularBuffer::<u32, 3>::new();
        for i in 0..5 {
            buffer.push(i);
        }

        assert_eq!(buffer.len(), 3);
        assert!(buffer.is_full());
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(buffer.last(), Some(&4));
    }

    #[test]
    fn recent_takes_newest_in_order() {
        let mut buffer = CircularBuffer::<i32, 10>::new();
        for i in 0..12 {
            buffer.push(i);
        }
        let recent: Vec<i32> = buffer.recent(3).copied().collect();
        assert_eq!(recent, vec![9, 10, 11]);

        let all: Vec<i32> = buffer.recent(50).copied().collect();
        assert_eq!(all.len(), 10);
        assert_eq!(all[0], 2);
    }

    #[test]
    fn clear_resets() {
        let mut buffer = CircularBuffer::<u8, 2>::new();
        buffer.push(1);
        buffer.push(2);
        buffer.clear();
        assert!(buffer.is_empty());
        buffer.push(7);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn serializes_chronologically() {
        let mut buffer = CircularBuffer::<u8, 2>::new();
        for i in 1..=3 {
            buffer.push(i);
        }
        assert_eq!(serde_json::to_string(&buffer).unwrap(), "[2,3]");
    }
}
