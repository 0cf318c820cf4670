//! Text metrics calculator
//!
//! Counts characters, whitespace characters, words and lines in a single
//! left-to-right scan. Metrics of adjacent fragments add up exactly to the
//! metrics of their concatenation, provided each fragment is scanned with the
//! character that precedes it in the buffer.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Line feed, carriage return, next line, line separator, paragraph separator
#[inline]
pub fn is_line_break(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

/// True if `ch` starts a new line break given the character before it.
/// The LF of a CRLF pair belongs to the CR.
#[inline]
pub fn starts_line_break(ch: char, preceding: Option<char>) -> bool {
    is_line_break(ch) && !(ch == '\n' && preceding == Some('\r'))
}

/// Character, whitespace, word and line counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Non-whitespace characters
    pub characters: u64,
    /// Whitespace characters, line breaks included
    pub whitespace_characters: u64,
    pub words: u64,
    /// Line breaks for a fragment; lines for a whole document
    pub lines: u64,
}

impl Metrics {
    pub const ZERO: Metrics = Metrics {
        characters: 0,
        whitespace_characters: 0,
        words: 0,
        lines: 0,
    };

    pub const fn new(characters: u64, whitespace_characters: u64, words: u64, lines: u64) -> Self {
        Self {
            characters,
            whitespace_characters,
            words,
            lines,
        }
    }

    /// Metrics of a whole document.
    ///
    /// A document has one more line than it has line breaks, so the empty
    /// document and `"a"` have one line and `"a\n"` has two.
    pub fn compute(text: &str) -> Self {
        Self::of_fragment(text, None).with_trailing_line()
    }

    /// Metrics of a slice of a larger buffer, without the implicit final line.
    ///
    /// `preceding` is the buffer character right before the slice (`None` at
    /// buffer start). It decides whether the first character starts a word and
    /// whether a leading LF completes a CRLF pair.
    pub fn of_fragment(text: &str, preceding: Option<char>) -> Self {
        Self::scan(text.chars(), preceding)
    }

    /// Fragment scan over any character source (rope slices included)
    pub fn scan<I>(chars: I, preceding: Option<char>) -> Self
    where
        I: IntoIterator<Item = char>,
    {
        let mut metrics = Metrics::ZERO;
        let mut prev = preceding;

        for ch in chars {
            if ch.is_whitespace() {
                metrics.whitespace_characters += 1;
                if starts_line_break(ch, prev) {
                    metrics.lines += 1;
                }
            } else {
                metrics.characters += 1;
                if prev.map_or(true, char::is_whitespace) {
                    metrics.words += 1;
                }
            }
            prev = Some(ch);
        }

        metrics
    }

    /// Turn fragment totals into document totals
    pub fn with_trailing_line(self) -> Self {
        Self {
            lines: self.lines + 1,
            ..self
        }
    }

    /// Total number of characters, whitespace included
    pub fn all_characters(&self) -> u64 {
        self.characters + self.whitespace_characters
    }

    /// Character count shown to the user, honouring the whitespace preference
    pub fn displayed_characters(&self, count_whitespace: bool) -> u64 {
        if count_whitespace {
            self.all_characters()
        } else {
            self.characters
        }
    }
}

impl Add for Metrics {
    type Output = Metrics;

    fn add(self, rhs: Metrics) -> Metrics {
        Metrics {
            characters: self.characters + rhs.characters,
            whitespace_characters: self.whitespace_characters + rhs.whitespace_characters,
            words: self.words + rhs.words,
            lines: self.lines + rhs.lines,
        }
    }
}

impl Sub for Metrics {
    type Output = Metrics;

    /// Saturates; a negative result means the running totals drifted, which
    /// the engine's consistency check repairs.
    fn sub(self, rhs: Metrics) -> Metrics {
        Metrics {
            characters: self.characters.saturating_sub(rhs.characters),
            whitespace_characters: self
                .whitespace_characters
                .saturating_sub(rhs.whitespace_characters),
            words: self.words.saturating_sub(rhs.words),
            lines: self.lines.saturating_sub(rhs.lines),
        }
    }
}

impl AddAssign for Metrics {
    fn add_assign(&mut self, rhs: Metrics) {
        *self = *self + rhs;
    }
}

impl SubAssign for Metrics {
    fn sub_assign(&mut self, rhs: Metrics) {
        *self = *self - rhs;
    }
}

impl Sum for Metrics {
    fn sum<I: Iterator<Item = Metrics>>(iter: I) -> Metrics {
        iter.fold(Metrics::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Metrics> for Metrics {
    fn sum<I: Iterator<Item = &'a Metrics>>(iter: I) -> Metrics {
        iter.copied().sum()
    }
}
