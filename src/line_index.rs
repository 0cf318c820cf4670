//! Line-start index
//!
//! A sorted table of line start offsets. Edits splice the table locally and
//! shift the starts after them; a full rebuild is only needed on load.
//! Lookups are binary searches so gutter rendering stays cheap on large
//! documents.
//!
//! Gutters subscribe through [`LineIndex::register_gutter`] and are told when
//! the number of digits in the line count changes, which is the only time the
//! gutter needs to be resized. The index never holds a reference to a view,
//! only a channel sender that is removed on [`LineIndex::deregister_gutter`].

use std::collections::HashMap;
use std::sync::mpsc::Sender;

use crate::metrics::{is_line_break, starts_line_break};
use crate::range::TextRange;

/// Notification sent to registered gutters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GutterEvent {
    /// The line count crossed a power of ten
    WidthChanged { digits: u32, line_count: u32 },
}

/// Non-owning handle identifying a registered gutter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GutterHandle(u64);

#[derive(Debug)]
pub struct LineIndex {
    /// Start offset of every line, ascending; always starts with 0
    starts: Vec<usize>,
    /// Total length of the indexed text in chars
    len_chars: usize,
    gutters: HashMap<u64, Sender<GutterEvent>>,
    next_gutter_id: u64,
}

impl Clone for LineIndex {
    /// Clones the table only; gutter registrations stay with the source index
    fn clone(&self) -> Self {
        Self {
            starts: self.starts.clone(),
            len_chars: self.len_chars,
            gutters: HashMap::new(),
            next_gutter_id: 0,
        }
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of decimal digits needed to print `n`
pub fn digit_count(n: u32) -> u32 {
    n.max(1).ilog10() + 1
}

impl LineIndex {
    /// Index of the empty document
    pub fn new() -> Self {
        Self {
            starts: vec![0],
            len_chars: 0,
            gutters: HashMap::new(),
            next_gutter_id: 0,
        }
    }

    pub fn from_text(text: &str) -> Self {
        let mut index = Self::new();
        index.rebuild(text);
        index
    }

    /// Rescan `text`
    pub fn rebuild(&mut self, text: &str) {
        self.rebuild_from_chars(text.chars());
    }

    /// Rescan any character source, e.g. `rope.chars()`
    pub fn rebuild_from_chars<I>(&mut self, chars: I)
    where
        I: IntoIterator<Item = char>,
    {
        let old_digits = digit_count(self.line_count());

        self.starts.clear();
        self.starts.push(0);

        let mut prev = None;
        let mut offset = 0;
        for ch in chars {
            offset += 1;
            if starts_line_break(ch, prev) {
                self.starts.push(offset);
            } else if ch == '\n' && prev == Some('\r') {
                // LF of a CRLF pair: the line starts after it, not after the CR
                if let Some(last) = self.starts.last_mut() {
                    *last = offset;
                }
            }
            prev = Some(ch);
        }
        self.len_chars = offset;

        let new_digits = digit_count(self.line_count());
        if new_digits != old_digits {
            self.notify_gutters(GutterEvent::WidthChanged {
                digits: new_digits,
                line_count: self.line_count(),
            });
        }
    }

    /// Update the table after the chars in `removed` were replaced by
    /// `inserted_len` new ones.
    ///
    /// `chars` yields the edited text from one char before
    /// `removed.location` (or from 0). Only the starts that can depend on
    /// edited chars are rescanned; every start after the edit is shifted.
    pub fn splice<I>(&mut self, removed: TextRange, inserted_len: usize, chars: I)
    where
        I: IntoIterator<Item = char>,
    {
        let old_digits = digit_count(self.line_count());
        let location = removed.location;
        let window_start = location.saturating_sub(1);
        let window_end = location + inserted_len;

        // A line starts at p when char p - 1 ends a line break
        let window: Vec<char> = chars
            .into_iter()
            .take(window_end + 1 - window_start)
            .collect();
        let fresh: Vec<usize> = (location.max(1)..=window_end)
            .filter(|&p| {
                let idx = p - window_start;
                match window.get(idx - 1) {
                    Some(&ch) => {
                        is_line_break(ch) && !(ch == '\r' && window.get(idx) == Some(&'\n'))
                    }
                    None => false,
                }
            })
            .collect();

        let head = self.starts.partition_point(|&start| start < location.max(1));
        let tail = self.starts.partition_point(|&start| start <= removed.end());
        for start in &mut self.starts[tail..] {
            *start = *start - removed.length + inserted_len;
        }
        self.starts.splice(head..tail, fresh);
        self.len_chars = self.len_chars - removed.length + inserted_len;

        let new_digits = digit_count(self.line_count());
        if new_digits != old_digits {
            self.notify_gutters(GutterEvent::WidthChanged {
                digits: new_digits,
                line_count: self.line_count(),
            });
        }
    }

    /// Number of lines; a trailing line break opens an empty final line
    pub fn line_count(&self) -> u32 {
        self.starts.len().max(1) as u32
    }

    pub fn len_chars(&self) -> usize {
        self.len_chars
    }

    /// Start offset of `line` (0-based)
    pub fn line_start_of(&self, line: u32) -> Option<usize> {
        self.starts.get(line as usize).copied()
    }

    /// Offset just past the end of `line`, terminator included
    pub fn line_end_of(&self, line: u32) -> Option<usize> {
        let idx = line as usize;
        if idx >= self.starts.len() {
            return None;
        }
        Some(self.starts.get(idx + 1).copied().unwrap_or(self.len_chars))
    }

    /// 0-based line containing `offset`; offsets past the end map to the last line
    pub fn nearest_line(&self, offset: usize) -> u32 {
        let after = self.starts.partition_point(|&start| start <= offset);
        after.saturating_sub(1) as u32
    }

    /// Start offset of the line containing `offset`
    pub fn line_start(&self, offset: usize) -> usize {
        self.starts
            .get(self.nearest_line(offset) as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Span of whole lines touched by `range`, terminator of the last line included
    ///
    /// A zero-length range touches the line containing its location. A
    /// non-empty range ending right after a line break does not touch the
    /// following line.
    pub fn line_range(&self, range: TextRange) -> TextRange {
        let first = self.nearest_line(range.location);
        let last_char = if range.is_empty() {
            range.location
        } else {
            range.end() - 1
        };
        let last = self.nearest_line(last_char).max(first);

        let start = self.line_start_of(first).unwrap_or(0);
        let end = self.line_end_of(last).unwrap_or(self.len_chars);
        TextRange::new(start, end.saturating_sub(start))
    }

    /// Start offsets of every line touched by `range`
    pub fn line_starts_in(&self, range: TextRange) -> &[usize] {
        let span = self.line_range(range);
        let first = self.nearest_line(span.location) as usize;
        let last_char = span.end().saturating_sub(1).max(span.location);
        let last = self.nearest_line(last_char) as usize;
        &self.starts[first..=last.min(self.starts.len() - 1)]
    }

    // ========================================================================
    // Gutter registration
    // ========================================================================

    pub fn register_gutter(&mut self, sender: Sender<GutterEvent>) -> GutterHandle {
        let id = self.next_gutter_id;
        self.next_gutter_id += 1;
        self.gutters.insert(id, sender);
        tracing::debug!("Registered gutter {}", id);
        GutterHandle(id)
    }

    /// Returns false if the handle was not registered
    pub fn deregister_gutter(&mut self, handle: GutterHandle) -> bool {
        let removed = self.gutters.remove(&handle.0).is_some();
        tracing::debug!("Deregistered gutter {} (found: {})", handle.0, removed);
        removed
    }

    pub fn gutter_count(&self) -> usize {
        self.gutters.len()
    }

    fn notify_gutters(&mut self, event: GutterEvent) {
        // Receivers that went away without deregistering are dropped here
        self.gutters.retain(|id, tx| {
            let alive = tx.send(event).is_ok();
            if !alive {
                tracing::debug!("Dropping disconnected gutter {}", id);
            }
            alive
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    // ========================================================================
    // Line starts
    // ========================================================================

    #[test]
    fn test_empty_text_has_one_line() {
        let index = LineIndex::from_text("");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_start(0), 0);
        assert_eq!(index.line_range(TextRange::caret(0)), TextRange::new(0, 0));
    }

    #[test]
    fn test_line_start_lookup() {
        //                              0123 4567891 123
        let index = LineIndex::from_text("car\nbanana\nsky");
        for offset in 0..=3 {
            assert_eq!(index.line_start(offset), 0, "offset {}", offset);
        }
        for offset in 4..=10 {
            assert_eq!(index.line_start(offset), 4, "offset {}", offset);
        }
        for offset in 11..=13 {
            assert_eq!(index.line_start(offset), 11, "offset {}", offset);
        }
    }

    #[test]
    fn test_line_start_lookup_with_blank_lines() {
        let index = LineIndex::from_text("\n\ncar\nbanana\nsky\na\n\n");
        assert_eq!(index.line_start(0), 0);
        assert_eq!(index.line_start(1), 1);
        for offset in 2..=5 {
            assert_eq!(index.line_start(offset), 2);
        }
        for offset in 6..=12 {
            assert_eq!(index.line_start(offset), 6);
        }
        for offset in 13..=16 {
            assert_eq!(index.line_start(offset), 13);
        }
        for offset in 17..=18 {
            assert_eq!(index.line_start(offset), 17);
        }
        assert_eq!(index.line_start(19), 19);
        // End of buffer after a trailing newline sits on the empty last line
        assert_eq!(index.line_start(20), 20);
        assert_eq!(index.line_start(21), 20);
    }

    #[test]
    fn test_only_newlines() {
        let text = "\n".repeat(15);
        let index = LineIndex::from_text(&text);
        for offset in 0..=14 {
            assert_eq!(index.line_start(offset), offset);
        }
        assert_eq!(index.line_count(), 16);
    }

    #[test]
    fn test_crlf_is_a_single_boundary() {
        let index = LineIndex::from_text("ab\r\ncd\ref\u{2028}gh");
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_start_of(1), Some(4));
        assert_eq!(index.line_start_of(2), Some(7));
        assert_eq!(index.line_start_of(3), Some(10));
        // Both halves of the CRLF belong to line 0
        assert_eq!(index.nearest_line(2), 0);
        assert_eq!(index.nearest_line(3), 0);
    }

    // ========================================================================
    // Splicing
    // ========================================================================

    /// Apply one edit to `text` and its index, checking against a rebuild
    fn splice_and_compare(text: &mut String, index: &mut LineIndex, removed: TextRange, inserted: &str) {
        let chars: Vec<char> = text.chars().collect();
        let mut edited: String = chars[..removed.location].iter().collect();
        edited.push_str(inserted);
        edited.extend(&chars[removed.end()..]);

        let window_start = removed.location.saturating_sub(1);
        index.splice(
            removed,
            inserted.chars().count(),
            edited.chars().skip(window_start),
        );
        let rebuilt = LineIndex::from_text(&edited);
        assert_eq!(index.starts, rebuilt.starts, "{:?} -> {:?}", text, edited);
        assert_eq!(index.len_chars(), rebuilt.len_chars());
        *text = edited;
    }

    #[test]
    fn test_splice_matches_rebuild() {
        let mut text = String::from("ab\r\ncd\ref\u{2028}gh\n");
        let mut index = LineIndex::from_text(&text);

        let edits: &[(usize, usize, &str)] = &[
            (0, 0, "\t"),
            (4, 0, "x"),        // between CR and LF
            (4, 1, ""),         // rejoin the pair
            (4, 1, ""),         // drop the LF of the pair
            (4, 0, "\n"),       // restore it
            (0, 3, "\n\n"),
            (7, 0, "\r"),
            (usize::MAX, 0, "tail\r"),
            (0, 0, "\n"),
        ];
        for &(location, length, inserted) in edits {
            let location = location.min(text.chars().count());
            let length = length.min(text.chars().count() - location);
            splice_and_compare(&mut text, &mut index, TextRange::new(location, length), inserted);
        }

        let len = text.chars().count();
        splice_and_compare(&mut text, &mut index, TextRange::new(0, len), "");
        assert_eq!(index.line_count(), 1);
    }

    #[test]
    fn test_splice_lf_after_cr_at_edit_end() {
        let mut text = String::from("a\nb");
        let mut index = LineIndex::from_text(&text);
        // New text ends in CR, the kept char after it is LF
        splice_and_compare(&mut text, &mut index, TextRange::new(0, 1), "x\r");
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.line_start_of(1), Some(3));
    }

    #[test]
    fn test_splice_notifies_gutters() {
        let mut text = "x\n".repeat(8);
        let mut index = LineIndex::from_text(&text);
        let (tx, rx) = mpsc::channel();
        index.register_gutter(tx);

        splice_and_compare(&mut text, &mut index, TextRange::caret(0), "\n");
        assert_eq!(
            rx.try_recv().ok(),
            Some(GutterEvent::WidthChanged {
                digits: 2,
                line_count: 10
            })
        );
    }

    // ========================================================================
    // Line ranges
    // ========================================================================

    #[test]
    fn test_line_range_includes_terminator() {
        let index = LineIndex::from_text("car\nbanana\nsky");
        assert_eq!(index.line_range(TextRange::caret(2)), TextRange::new(0, 4));
        assert_eq!(index.line_range(TextRange::new(5, 2)), TextRange::new(4, 7));
        assert_eq!(index.line_range(TextRange::caret(14)), TextRange::new(11, 3));
    }

    #[test]
    fn test_line_range_spanning_lines() {
        let index = LineIndex::from_text("car\nbanana\nsky");
        assert_eq!(index.line_range(TextRange::new(1, 5)), TextRange::new(0, 11));
        assert_eq!(index.line_starts_in(TextRange::new(1, 12)), &[0, 4, 11]);
    }

    #[test]
    fn test_line_range_ending_after_newline_stays_on_line() {
        let index = LineIndex::from_text("car\nbanana\nsky");
        // "car\n" selected: the next line is not touched
        assert_eq!(index.line_range(TextRange::new(0, 4)), TextRange::new(0, 4));
        assert_eq!(index.line_starts_in(TextRange::new(0, 4)), &[0]);
    }

    #[test]
    fn test_nearest_line_binary_search() {
        let text = "x\n".repeat(1000);
        let index = LineIndex::from_text(&text);
        assert_eq!(index.nearest_line(0), 0);
        assert_eq!(index.nearest_line(1), 0);
        assert_eq!(index.nearest_line(2), 1);
        assert_eq!(index.nearest_line(1999), 999);
        assert_eq!(index.nearest_line(2000), 1000);
        assert_eq!(index.nearest_line(5000), 1000);
    }

    // ========================================================================
    // Gutter notifications
    // ========================================================================

    #[test]
    fn test_gutter_notified_only_on_digit_change() {
        let mut index = LineIndex::from_text("a\nb");
        let (tx, rx) = mpsc::channel();
        let _handle = index.register_gutter(tx);

        index.rebuild(&"x\n".repeat(5));
        assert!(rx.try_recv().is_err());

        index.rebuild(&"x\n".repeat(9));
        assert_eq!(
            rx.try_recv().ok(),
            Some(GutterEvent::WidthChanged {
                digits: 2,
                line_count: 10
            })
        );

        index.rebuild(&"x\n".repeat(50));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_deregistered_gutter_gets_nothing() {
        let mut index = LineIndex::new();
        let (tx, rx) = mpsc::channel();
        let handle = index.register_gutter(tx);
        assert!(index.deregister_gutter(handle));
        assert!(!index.deregister_gutter(handle));

        index.rebuild(&"x\n".repeat(20));
        assert!(rx.try_recv().is_err());
        assert_eq!(index.gutter_count(), 0);
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let mut index = LineIndex::new();
        let (tx, rx) = mpsc::channel();
        index.register_gutter(tx);
        drop(rx);

        index.rebuild(&"x\n".repeat(20));
        assert_eq!(index.gutter_count(), 0);
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(12345), 5);
    }
}
