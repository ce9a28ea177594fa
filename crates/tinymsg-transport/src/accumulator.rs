/// Initial storage capacity for a fresh accumulator.
const INITIAL_CAPACITY: usize = 512;

/// A growable, owned byte buffer shared across frame-parsing state
/// transitions.
///
/// The only mutation primitives are [`append`](Accumulator::append),
/// [`consume_prefix`](Accumulator::consume_prefix), [`clear`](Accumulator::clear)
/// and the drain cursor ([`advance`](Accumulator::advance)). Inbound buffers
/// use append/consume_prefix to retain leftover bytes belonging to the next
/// frame; outbound buffers use the cursor to track how many leading bytes
/// have already been transmitted.
#[derive(Debug)]
pub struct Accumulator {
    storage: Vec<u8>,
    len: usize,
    cursor: usize,
}

impl Accumulator {
    /// Create an empty accumulator with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create an empty accumulator with an explicit initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0; capacity],
            len: 0,
            cursor: 0,
        }
    }

    /// Number of valid bytes currently held.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no valid bytes are held.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current storage capacity.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// The valid bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    /// Append bytes to the end, growing storage as needed.
    ///
    /// Growth is amortized doubling, but always at least enough for the
    /// appended bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        let needed = self.len + bytes.len();
        if needed > self.storage.len() {
            let grown = (self.storage.len() * 2).max(needed).max(INITIAL_CAPACITY);
            self.storage.resize(grown, 0);
        }
        self.storage[self.len..needed].copy_from_slice(bytes);
        self.len = needed;
    }

    /// Remove the first `n` bytes, shifting the remainder to offset 0.
    ///
    /// The freed tail region is zero-filled. The drain cursor is rewound by
    /// `n` (saturating), so a partially drained buffer stays consistent.
    ///
    /// # Panics
    ///
    /// Panics if `n > len`.
    pub fn consume_prefix(&mut self, n: usize) {
        assert!(n <= self.len, "consume_prefix past end: {n} > {}", self.len);
        self.storage.copy_within(n..self.len, 0);
        self.len -= n;
        self.storage[self.len..].fill(0);
        self.cursor = self.cursor.saturating_sub(n);
    }

    /// Discard all bytes. Equivalent to `consume_prefix(len())`.
    pub fn clear(&mut self) {
        self.consume_prefix(self.len);
    }

    /// Bytes not yet drained: everything past the cursor.
    pub fn pending(&self) -> &[u8] {
        &self.storage[self.cursor..self.len]
    }

    /// Advance the drain cursor by `n` transmitted bytes.
    ///
    /// # Panics
    ///
    /// Panics if the cursor would pass the end of the valid bytes.
    pub fn advance(&mut self, n: usize) {
        assert!(
            self.cursor + n <= self.len,
            "cursor past end: {} > {}",
            self.cursor + n,
            self.len
        );
        self.cursor += n;
    }

    /// True once the cursor has reached the end: the buffer is logically
    /// empty and may be cleared.
    pub fn is_drained(&self) -> bool {
        self.cursor == self.len
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_read_back() {
        let mut acc = Accumulator::new();
        acc.append(b"hello");
        acc.append(b" world");
        assert_eq!(acc.as_slice(), b"hello world");
        assert_eq!(acc.len(), 11);
    }

    #[test]
    fn append_grows_past_initial_capacity() {
        let mut acc = Accumulator::with_capacity(4);
        let payload = vec![0xAB; 1000];
        acc.append(&payload);
        assert_eq!(acc.as_slice(), payload.as_slice());
        assert!(acc.capacity() >= 1000);
    }

    #[test]
    fn consume_prefix_shifts_remainder() {
        let mut acc = Accumulator::new();
        acc.append(b"abcdef");
        acc.consume_prefix(4);
        assert_eq!(acc.as_slice(), b"ef");
        acc.consume_prefix(2);
        assert!(acc.is_empty());
    }

    #[test]
    fn consume_prefix_zero_fills_tail() {
        let mut acc = Accumulator::with_capacity(8);
        acc.append(b"abcdef");
        acc.consume_prefix(4);
        // Storage beyond the two remaining bytes must be zero.
        assert!(acc.storage[2..].iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "consume_prefix past end")]
    fn consume_prefix_past_end_panics() {
        let mut acc = Accumulator::new();
        acc.append(b"ab");
        acc.consume_prefix(3);
    }

    #[test]
    fn clear_then_append_matches_fresh() {
        let mut reused = Accumulator::new();
        reused.append(b"stale bytes");
        reused.advance(4);
        reused.clear();
        reused.append(b"xyz");

        let mut fresh = Accumulator::new();
        fresh.append(b"xyz");

        assert_eq!(reused.as_slice(), fresh.as_slice());
        assert_eq!(reused.pending(), fresh.pending());
        assert_eq!(reused.is_drained(), fresh.is_drained());
    }

    #[test]
    fn drain_cursor_tracks_progress() {
        let mut acc = Accumulator::new();
        acc.append(b"outbound");
        assert_eq!(acc.pending(), b"outbound");
        acc.advance(3);
        assert_eq!(acc.pending(), b"bound");
        acc.advance(5);
        assert!(acc.is_drained());
    }

    #[test]
    fn consume_prefix_rewinds_cursor() {
        let mut acc = Accumulator::new();
        acc.append(b"abcdef");
        acc.advance(4);
        acc.consume_prefix(4);
        // Cursor rewound to 0; remaining bytes all pending.
        assert_eq!(acc.pending(), b"ef");
    }
}
