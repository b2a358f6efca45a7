//! Fixed-capacity history of the most recent samples
//!
//! Used for per-container stat history. Writers overwrite the oldest slot
//! once the buffer is full; readers take a copy under a read lock so they
//! never see a half-applied push.

use parking_lot::RwLock;

/// Default number of stat samples retained per container
pub const DEFAULT_STATS_HISTORY: usize = 300;

/// Ring buffer holding the last `capacity` values in insertion order
#[derive(Debug)]
pub struct RingBuffer<T> {
    inner: RwLock<Slots<T>>,
    capacity: usize,
}

#[derive(Debug)]
struct Slots<T> {
    data: Vec<T>,
    /// Index of the oldest element once the buffer has wrapped
    start: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a buffer; a capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(Slots {
                data: Vec::with_capacity(capacity),
                start: 0,
            }),
            capacity,
        }
    }

    /// Append a value, discarding the oldest one when full
    pub fn push(&self, value: T) {
        let mut slots = self.inner.write();
        if slots.data.len() < self.capacity {
            slots.data.push(value);
        } else {
            let start = slots.start;
            slots.data[start] = value;
            slots.start = (start + 1) % self.capacity;
        }
    }

    /// Copy of the retained values, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        let slots = self.inner.read();
        let mut out = Vec::with_capacity(slots.data.len());
        out.extend_from_slice(&slots.data[slots.start..]);
        out.extend_from_slice(&slots.data[..slots.start]);
        out
    }

    /// Most recently pushed value
    pub fn last(&self) -> Option<T> {
        let slots = self.inner.read();
        if slots.data.is_empty() {
            return None;
        }
        let idx = if slots.start == 0 {
            slots.data.len() - 1
        } else {
            slots.start - 1
        };
        slots.data.get(idx).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_STATS_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_push_below_capacity() {
        let buffer = RingBuffer::new(5);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);

        assert_eq!(buffer.snapshot(), vec![1, 2, 3]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.last(), Some(3));
    }

    #[test]
    fn test_overflow_keeps_last_values_in_order() {
        let buffer = RingBuffer::new(3);
        for i in 0..10 {
            buffer.push(i);
        }

        assert_eq!(buffer.snapshot(), vec![7, 8, 9]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.last(), Some(9));
    }

    #[test]
    fn test_exactly_full() {
        let buffer = RingBuffer::new(4);
        for i in 0..4 {
            buffer.push(i);
        }
        assert_eq!(buffer.snapshot(), vec![0, 1, 2, 3]);

        buffer.push(4);
        assert_eq!(buffer.snapshot(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let buffer = RingBuffer::new(0);
        buffer.push("a");
        buffer.push("b");
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.snapshot(), vec!["b"]);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer: RingBuffer<u32> = RingBuffer::new(2);
        assert!(buffer.is_empty());
        assert!(buffer.snapshot().is_empty());
        assert_eq!(buffer.last(), None);
    }

    #[test]
    fn test_concurrent_snapshots_only_see_pushed_values() {
        let buffer = Arc::new(RingBuffer::new(16));
        let writer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for i in 0..10_000u64 {
                    buffer.push(i);
                }
            })
        };

        for _ in 0..1_000 {
            let snapshot = buffer.snapshot();
            assert!(snapshot.len() <= 16);
            // Values are consecutive because a snapshot is never torn
            for pair in snapshot.windows(2) {
                assert_eq!(pair[0] + 1, pair[1]);
            }
        }

        writer.join().unwrap();
        assert_eq!(buffer.snapshot(), (9_984..10_000).collect::<Vec<_>>());
    }
}
