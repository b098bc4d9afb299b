//! Streaming UTF-8 decoding
//!
//! Bytes arrive in arbitrary chunks, so a multi-byte character may be split
//! across reads. The decoder keeps the pending bytes between calls and
//! never swallows a byte it could not use: when a lead byte is followed by
//! something that is not a continuation, the caller gets a replacement
//! character and is told to feed the offending byte again.

/// Replacement character emitted for malformed input
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Result of feeding one byte to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Step {
    /// Need more bytes
    Pending,
    /// Decoded a character
    Char(char),
    /// Malformed input; emit `REPLACEMENT_CHAR`. If `reprocess` is set the
    /// byte was not consumed and must be handled as freshly arrived.
    Invalid { reprocess: bool },
}

/// Pending multi-byte accumulator
#[derive(Debug, Clone, Default)]
pub struct Utf8Decoder {
    buffer: [u8; 4],
    len: usize,
    expected: usize,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any partially decoded character
    pub fn reset(&mut self) {
        self.len = 0;
        self.expected = 0;
    }

    /// Check if the decoder is in the middle of a sequence
    pub fn is_pending(&self) -> bool {
        self.len > 0
    }

    /// Number of bytes held for the current sequence
    pub fn pending_len(&self) -> usize {
        self.len
    }

    /// Feed one byte
    pub fn feed(&mut self, byte: u8) -> Utf8Step {
        if self.len == 0 {
            return self.start(byte);
        }

        if !self.accepts(byte) {
            self.reset();
            return Utf8Step::Invalid { reprocess: true };
        }

        self.buffer[self.len] = byte;
        self.len += 1;
        if self.len < self.expected {
            return Utf8Step::Pending;
        }

        let decoded = std::str::from_utf8(&self.buffer[..self.len])
            .ok()
            .and_then(|s| s.chars().next());
        self.reset();
        match decoded {
            Some(c) => Utf8Step::Char(c),
            None => Utf8Step::Invalid { reprocess: false },
        }
    }

    fn start(&mut self, byte: u8) -> Utf8Step {
        let expected = match byte {
            0x00..=0x7F => return Utf8Step::Char(byte as char),
            // 0xC0/0xC1 can only encode overlong ASCII
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Utf8Step::Invalid { reprocess: false },
        };
        self.buffer[0] = byte;
        self.len = 1;
        self.expected = expected;
        Utf8Step::Pending
    }

    /// Whether `byte` is a valid next continuation for the pending lead.
    /// The second byte is range-checked to reject overlong forms,
    /// surrogates, and code points above U+10FFFF up front.
    fn accepts(&self, byte: u8) -> bool {
        if self.len == 1 {
            let range = match self.buffer[0] {
                0xE0 => 0xA0..=0xBF,
                0xED => 0x80..=0x9F,
                0xF0 => 0x90..=0xBF,
                0xF4 => 0x80..=0x8F,
                _ => 0x80..=0xBF,
            };
            range.contains(&byte)
        } else {
            (0x80..=0xBF).contains(&byte)
        }
    }
}
