#![allow(clippy::len_without_is_empty)]
use std::ops::Index;

/// A fixed-capacity ring buffer
///
/// Fills up to `capacity`, after which every push overwrites the oldest element.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    ix: usize,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// **Panics** if `capacity` is zero
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Ring buffer capacity must be non-zero.");
        Self {
            buffer: Vec::<T>::with_capacity(capacity),
            ix: 0,
            capacity,
        }
    }

    /// Returns the number of stored elements
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Insert an element into the buffer, overwriting the oldest element, and return the write index
    pub fn push(&mut self, item: T) -> usize {
        let ix = self.ix;
        if ix >= self.len() {
            self.buffer.push(item);
        } else {
            self.buffer[ix] = item;
        }
        self.ix = (ix + 1) % self.capacity;
        ix
    }

    /// Get a slice view of the internal buffer in storage order
    pub fn view(&self) -> &[T] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.ix = 0;
    }
}

impl RingBuffer<f32> {
    /// Mean of the stored values, `None` when empty
    pub fn mean(&self) -> Option<f32> {
        (!self.buffer.is_empty()).then(|| self.buffer.iter().sum::<f32>() / self.len() as f32)
    }
}

impl<T> Index<usize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.buffer[index]
    }
}
