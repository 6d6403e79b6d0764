//! Look-ahead storage for decoded but not yet delivered samples.
//!
//! Decoders hand out blocks whose boundaries rarely line up with the frames a
//! caller asks for. The surplus of every block lands here, as do the frames
//! decoded while compensating for decoder delay after a seek, so that
//! sequential reads and short forward seeks do not decode anything twice.
//!
//! The buffer is a single contiguous allocation addressed by a read and a
//! write offset. Readable samples always occupy `storage[head..tail]`.
//! Capacity only ever grows, by doubling.

use std::fmt;

use crate::Sample;

/// A growable buffer of interleaved samples with consume-from-front semantics.
pub struct ReadAheadSampleBuffer {
    storage: Box<[Sample]>,
    head: usize,
    tail: usize,
}

impl ReadAheadSampleBuffer {
    /// # Panics
    /// If `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "look-ahead capacity must not be zero");
        Self {
            storage: vec![0.0; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
        }
    }

    /// Total number of samples the buffer can hold without growing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of samples available through [`read_front`](Self::read_front).
    #[inline]
    pub fn readable_len(&self) -> usize {
        self.tail - self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Discards everything buffered. Capacity is kept.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    /// Grows the capacity by doubling until at least `min_capacity` samples fit.
    /// Buffered content is preserved. Never shrinks.
    pub fn reserve_capacity(&mut self, min_capacity: usize) {
        let mut capacity = self.capacity();
        if capacity >= min_capacity {
            return;
        }
        while capacity < min_capacity {
            capacity *= 2;
        }
        tracing::debug!(
            from = self.capacity(),
            to = capacity,
            "enlarging look-ahead buffer"
        );
        let mut storage = vec![0.0; capacity].into_boxed_slice();
        let readable = self.readable_len();
        storage[..readable].copy_from_slice(&self.storage[self.head..self.tail]);
        self.storage = storage;
        self.head = 0;
        self.tail = readable;
    }

    /// Reserves `len` samples at the tail and returns them for the caller to fill.
    ///
    /// Buffered content is moved to the front if that makes room, otherwise
    /// the capacity grows.
    pub fn write(&mut self, len: usize) -> &mut [Sample] {
        if self.tail + len > self.capacity() {
            self.reserve_capacity(self.readable_len() + len);
            if self.head > 0 {
                self.storage.copy_within(self.head..self.tail, 0);
                self.tail -= self.head;
                self.head = 0;
            }
        }
        let start = self.tail;
        self.tail += len;
        &mut self.storage[start..self.tail]
    }

    /// Takes up to `max_len` samples from the front. Returns fewer if fewer are
    /// buffered and an empty slice if nothing is.
    pub fn read_front(&mut self, max_len: usize) -> &[Sample] {
        let len = self.readable_len().min(max_len);
        let start = self.head;
        self.head += len;
        if self.head == self.tail {
            // Drained: rewind so the next block is written from the front.
            // Storage is untouched, so the returned slice is still valid.
            self.head = 0;
            self.tail = 0;
        }
        &self.storage[start..start + len]
    }
}

impl fmt::Debug for ReadAheadSampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadAheadSampleBuffer")
            .field("capacity", &self.capacity())
            .field("readable", &self.readable_len())
            .finish()
    }
}
