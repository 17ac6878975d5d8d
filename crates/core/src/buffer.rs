//! Append-only growable byte buffer.
//!
//! Backs memory ports and the printer's string-building paths. No arena
//! here (single-threaded, no strand-local resets to bulk-free on), so this
//! keeps an owned `Vec<u8>` and doubles capacity on growth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrowableBuffer {
    data: Vec<u8>,
}

impl GrowableBuffer {
    pub fn new() -> Self {
        GrowableBuffer { data: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        GrowableBuffer {
            data: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    fn reserve_for(&mut self, additional: usize) {
        let needed = self.data.len() + additional;
        if needed > self.data.capacity() {
            // Grow by doubling, or to the exact needed size if that's larger.
            let doubled = self.data.capacity().max(16) * 2;
            let target = doubled.max(needed);
            self.data.reserve(target - self.data.len());
        }
    }

    pub fn push_byte(&mut self, byte: u8) {
        self.reserve_for(1);
        self.data.push(byte);
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.reserve_for(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    pub fn push_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        use std::fmt::Write;
        let mut tmp = String::new();
        let _ = tmp.write_fmt(args);
        self.push_str(&tmp);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Interprets the buffer as UTF-8 text (memory-text ports only ever
    /// append valid UTF-8 through `push_str`/`push_fmt`).
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.data).expect("memory-text buffer holds valid UTF-8")
    }

    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubling_growth() {
        let mut buf = GrowableBuffer::new();
        for i in 0..1000u32 {
            buf.push_str(&i.to_string());
        }
        assert!(buf.len() > 0);
    }

    #[test]
    fn round_trips_text() {
        let mut buf = GrowableBuffer::new();
        buf.push_str("ab");
        buf.push_byte(b'4');
        buf.push_byte(b'2');
        assert_eq!(buf.as_str(), "ab42");
    }
}
