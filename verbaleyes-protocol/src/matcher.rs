//! Streaming substring matcher
//!
//! Detects a pattern anywhere in a byte stream without buffering: only the
//! number of pattern bytes matched so far is kept. Once the pattern has been
//! seen the matcher latches.

/// Incremental matcher for one pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Matcher {
    index: usize,
    matched: bool,
}

impl Matcher {
    pub const fn new() -> Self {
        Self {
            index: 0,
            matched: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Check if the full pattern has been seen
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    /// Feed one stream byte
    ///
    /// The first `fold_len` bytes of `pattern` are compared ASCII
    /// case-insensitively, which expects that prefix to be lowercase in
    /// `pattern`. Returns true once the pattern has been matched.
    pub fn feed(&mut self, byte: u8, pattern: &[u8], fold_len: usize) -> bool {
        if self.matched || pattern.is_empty() {
            return self.matched;
        }

        if Self::eq_at(byte, pattern, self.index, fold_len) {
            self.index += 1;
        } else {
            self.index = Self::fall_back(byte, pattern, self.index, fold_len);
        }

        if self.index == pattern.len() {
            self.matched = true;
        }
        self.matched
    }

    /// Feed one byte, comparing the whole pattern case-insensitively
    pub fn feed_ignore_case(&mut self, byte: u8, pattern: &[u8]) -> bool {
        self.feed(byte, pattern, pattern.len())
    }

    /// Longest pattern prefix that ends with `byte`, given that the stream
    /// bytes before it matched the first `matched` pattern bytes
    fn fall_back(byte: u8, pattern: &[u8], matched: usize, fold_len: usize) -> usize {
        (1..=matched)
            .find_map(|shift| {
                let len = matched - shift;
                let aligned = (0..len)
                    .all(|i| Self::eq_at(pattern[shift + i], pattern, i, fold_len))
                    && Self::eq_at(byte, pattern, len, fold_len);
                aligned.then_some(len + 1)
            })
            .unwrap_or(0)
    }

    fn eq_at(byte: u8, pattern: &[u8], index: usize, fold_len: usize) -> bool {
        let byte = if index < fold_len {
            byte.to_ascii_lowercase()
        } else {
            byte
        };
        pattern[index] == byte
    }
}
