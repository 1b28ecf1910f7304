//! Fixed-capacity byte ring buffer with a non-destructive peek, used to
//! accumulate partial reads from a stream source until a full message is
//! available to decode.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<u8>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Appends as many bytes from `bytes` as fit; returns the number
    /// actually written (back-pressure signal to the caller when short).
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        let cap = self.data.len();
        let free = cap - self.len;
        let n = bytes.len().min(free);
        for (i, b) in bytes[..n].iter().enumerate() {
            let pos = (self.head + self.len + i) % cap;
            self.data[pos] = *b;
        }
        self.len += n;
        n
    }

    /// Non-destructive look at the next `n` bytes (or fewer, if the
    /// buffer holds less), without advancing the read position.
    pub fn peek(&self, n: usize) -> Vec<u8> {
        let n = n.min(self.len);
        let cap = self.data.len();
        (0..n).map(|i| self.data[(self.head + i) % cap]).collect()
    }

    /// Discards `n` bytes from the front (after the caller has decoded
    /// them via [Self::peek]).
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.len);
        self.head = (self.head + n) % self.data.len();
        self.len -= n;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_peek_consume_round_trip() {
        let mut rb = RingBuffer::with_capacity(8);
        assert_eq!(rb.push(b"abcd"), 4);
        assert_eq!(rb.peek(4), b"abcd");
        rb.consume(2);
        assert_eq!(rb.peek(2), b"cd");
    }

    #[test]
    fn push_respects_capacity() {
        let mut rb = RingBuffer::with_capacity(4);
        assert_eq!(rb.push(b"abcdef"), 4);
        assert_eq!(rb.len(), 4);
    }

    #[test]
    fn wraps_around_after_partial_consume() {
        let mut rb = RingBuffer::with_capacity(4);
        rb.push(b"ab");
        rb.consume(2);
        rb.push(b"cdef");
        assert_eq!(rb.peek(4), b"cdef");
    }
}
