/// Fixed-capacity buffer of the most recent values, oldest evicted first.
#[derive(Clone, Debug)]
pub(crate) struct RingBuffer<T> {
    buffer: Vec<T>,
    /// Slot of the oldest value once the buffer is full.
    head: usize,
    /// Slot of the newest value.
    tail: usize,
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");

        Self {
            buffer: vec![T::default(); capacity],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Appends `value`, returning the evicted oldest value when full.
    #[inline]
    pub(crate) fn push(&mut self, value: T) -> Option<T> {
        if self.is_full() {
            let old = self.buffer[self.head];

            self.buffer[self.head] = value;

            self.tail = self.head;
            self.head += 1;
            if self.head == self.capacity() {
                self.head = 0;
            }

            Some(old)
        } else {
            self.buffer[self.len] = value;
            self.tail = self.len;
            self.len += 1;

            None
        }
    }

    /// Overwrites the newest value, returning the previous one.
    #[inline]
    pub(crate) fn replace(&mut self, value: T) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        Some(std::mem::replace(&mut self.buffer[self.tail], value))
    }

    /// Value `k` steps behind the newest (`k = 0` is the newest).
    #[inline]
    pub(crate) fn back(&self, k: usize) -> Option<T> {
        if k >= self.len {
            return None;
        }

        let capacity = self.capacity();
        Some(self.buffer[(self.tail + capacity - k) % capacity])
    }

    /// Values from oldest to newest.
    pub(crate) fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).rev().filter_map(|k| self.back(k))
    }
}
