//! Rope-backed text buffer with a single mutation entry point
//!
//! Every edit goes through [`EditBuffer::replace`]. The buffer splices its
//! [`LineIndex`] around each mutation; wrappers such as the document
//! session hook the same entry point to feed the metrics engine.

use ropey::Rope;

use crate::line_index::LineIndex;
use crate::range::TextRange;

/// Mutable text with char-offset addressing and line lookups.
///
/// This is the seam the indentation transformer works through.
pub trait EditBuffer {
    /// Total length in characters
    fn len_chars(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Character at `offset`, None if out of bounds
    fn char_at(&self, offset: usize) -> Option<char>;

    /// Text covered by `range` (clamped to the buffer)
    fn slice(&self, range: TextRange) -> String;

    /// Line starts of the current text
    fn line_index(&self) -> &LineIndex;

    /// Replace `range` (clamped to the buffer) with `text`.
    ///
    /// Returns the range the inserted text now occupies.
    fn replace(&mut self, range: TextRange, text: &str) -> TextRange;
}

#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    rope: Rope,
    lines: LineIndex,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            lines: LineIndex::from_text(text),
        }
    }

    /// Mutable access to the line index, for gutter registration
    pub fn line_index_mut(&mut self) -> &mut LineIndex {
        &mut self.lines
    }

    /// Character immediately before `offset`
    pub fn char_before(&self, offset: usize) -> Option<char> {
        offset.checked_sub(1).and_then(|prev| self.char_at(prev))
    }
}

impl std::fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl EditBuffer for TextBuffer {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.rope.get_char(offset)
    }

    fn slice(&self, range: TextRange) -> String {
        let range = range.clamp(self.rope.len_chars());
        self.rope.slice(range.as_std()).to_string()
    }

    fn line_index(&self) -> &LineIndex {
        &self.lines
    }

    fn replace(&mut self, range: TextRange, text: &str) -> TextRange {
        let range = range.clamp(self.rope.len_chars());
        if !range.is_empty() {
            self.rope.remove(range.as_std());
        }
        if !text.is_empty() {
            self.rope.insert(range.location, text);
        }
        let inserted_len = text.chars().count();
        let window_start = range.location.saturating_sub(1);
        self.lines
            .splice(range, inserted_len, self.rope.chars_at(window_start));

        TextRange::new(range.location, inserted_len)
    }
}
