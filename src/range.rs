//! Half-open character range arithmetic
//!
//! Every offset in the engine is a `char` index (the unit `ropey` uses).
//! All helpers saturate at the buffer bounds instead of panicking.

use serde::{Deserialize, Serialize};

/// A half-open `[location, location + length)` interval of character offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub location: usize,
    pub length: usize,
}

impl TextRange {
    pub const fn new(location: usize, length: usize) -> Self {
        Self { location, length }
    }

    /// Zero-length range (a caret) at `location`
    pub const fn caret(location: usize) -> Self {
        Self::new(location, 0)
    }

    /// Build a range from two offsets, in either order
    pub fn between(a: usize, b: usize) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self::new(start, end - start)
    }

    /// Exclusive end offset
    #[inline]
    pub fn end(&self) -> usize {
        self.location.saturating_add(self.length)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True if `offset` lies inside the range (never true for a caret)
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.location && offset < self.end()
    }

    /// Convert to a `std::ops::Range` for slicing ropes
    pub fn as_std(&self) -> std::ops::Range<usize> {
        self.location..self.end()
    }

    /// Clamp both ends to `[0, max_length]`
    pub fn clamp(&self, max_length: usize) -> Self {
        let location = self.location.min(max_length);
        let end = self.end().min(max_length);
        Self::new(location, end - location)
    }

    /// Grow the range by `by` characters on each side, clamped to `[0, max_length]`
    ///
    /// Used to widen an edited range so that words and line breaks straddling
    /// the edit boundary are recounted.
    pub fn expand(&self, by: usize, max_length: usize) -> Self {
        let location = self.location.saturating_sub(by).min(max_length);
        let end = self.end().saturating_add(by).min(max_length);
        Self::new(location, end.saturating_sub(location))
    }

    /// Same location, length adjusted by `delta` and floored at zero
    pub fn shift(&self, delta: isize) -> Self {
        let length = if delta >= 0 {
            self.length.saturating_add(delta.unsigned_abs())
        } else {
            self.length.saturating_sub(delta.unsigned_abs())
        };
        Self::new(self.location, length)
    }

    /// Same location, length of at least one character
    pub fn meaningful(&self) -> Self {
        Self::new(self.location, self.length.max(1))
    }

    /// Overlap of two ranges, if any
    ///
    /// A caret intersects a range that strictly contains its location, so an
    /// insertion in the middle of a chunk still hits that chunk.
    pub fn intersection(&self, other: &TextRange) -> Option<TextRange> {
        if self.is_empty() || other.is_empty() {
            let (caret, span) = if self.is_empty() {
                (self, other)
            } else {
                (other, self)
            };
            return (span.location < caret.location && caret.location < span.end())
                .then(|| TextRange::caret(caret.location));
        }

        let start = self.location.max(other.location);
        let end = self.end().min(other.end());
        (start < end).then(|| TextRange::new(start, end - start))
    }

    pub fn intersects(&self, other: &TextRange) -> bool {
        self.intersection(other).is_some()
    }
}

impl From<std::ops::Range<usize>> for TextRange {
    fn from(range: std::ops::Range<usize>) -> Self {
        TextRange::between(range.start, range.end)
    }
}

impl std::fmt::Display for TextRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}, {}}}", self.location, self.length)
    }
}
