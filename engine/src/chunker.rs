//! Reply chunking
//!
//! Splits long completion output into parts no longer than the platform's
//! message limit. Units are separated on the literal `". "` delimiter and
//! packed greedily; a unit that cannot fit into an empty part on its own is
//! hard-cut at the limit, possibly mid-word.
//!
//! Lengths are counted in characters, not bytes, so Cyrillic text is never
//! split inside a UTF-8 sequence.
//!
//! Every part is a contiguous slice of the input. Parts produced by the
//! greedy packer have surrounding whitespace trimmed and blank hard-cut
//! slices are dropped; the only text missing between consecutive parts is
//! whitespace.

/// Sentence-like unit delimiter
pub const DELIMITER: &str = ". ";

/// Telegram's limit is 4096; the default leaves headroom
pub const DEFAULT_MAX_LENGTH: usize = 4000;

/// Splits reply text into platform-sized parts
#[derive(Debug, Clone, Copy)]
pub struct ResponseChunker {
    max_length: usize,
}

impl ResponseChunker {
    /// A zero limit is treated as 1
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Split `text` into parts of at most `max_length` characters
    ///
    /// Text within the limit comes back unchanged as a single part, including
    /// the empty string.
    pub fn split(&self, text: &str) -> Vec<String> {
        let max = self.max_length;
        if text.chars().count() <= max {
            return vec![text.to_string()];
        }

        let mut parts = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;

        let units: Vec<&str> = text.split(DELIMITER).collect();
        let last = units.len() - 1;

        for (i, unit) in units.iter().enumerate() {
            let piece = if i < last {
                format!("{}{}", unit, DELIMITER)
            } else {
                unit.to_string()
            };
            let piece_len = piece.chars().count();

            if buffer_len + piece_len <= max {
                buffer.push_str(&piece);
                buffer_len += piece_len;
                continue;
            }

            flush(&mut parts, &mut buffer);

            // Only the trailing delimiter space overflows
            if piece.trim_end().chars().count() <= max {
                buffer.push_str(&piece);
                buffer_len = piece_len;
                continue;
            }

            let mut rest = piece.as_str();
            let mut rest_len = piece_len;
            while rest_len > max {
                let cut = byte_offset(rest, max);
                if !rest[..cut].trim().is_empty() {
                    parts.push(rest[..cut].to_string());
                }
                rest = &rest[cut..];
                rest_len -= max;
            }

            buffer.push_str(rest);
            buffer_len = rest_len;
        }

        flush(&mut parts, &mut buffer);

        if parts.is_empty() {
            // Whitespace-only input that packed to nothing
            parts.push(text.chars().take(max).collect());
        }

        parts
    }
}

impl Default for ResponseChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LENGTH)
    }
}

fn flush(parts: &mut Vec<String>, buffer: &mut String) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
    buffer.clear();
}

/// Byte offset of the `chars`-th character boundary
fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}
