//! Document session
//!
//! Owns one buffer together with its metrics engine and undo log. Every
//! mutation, including undo and redo, goes through [`TrackedText::replace`],
//! which brackets the buffer edit with the engine's notify/finish calls. The
//! buffer splices its line index on the same path.

use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use crate::buffer::{EditBuffer, TextBuffer};
use crate::config::EditorConfig;
use crate::engine::{MetricsEngine, MetricsEvent};
use crate::indent::{self, IndentMode, SelectionSet};
use crate::line_index::{GutterEvent, GutterHandle, LineIndex};
use crate::metrics::Metrics;
use crate::range::TextRange;
use crate::tracing::SelectionSnapshot;
use crate::undo::{UndoCoordinator, UndoLog};

/// Edits between debug consistency checks
const CONSISTENCY_CHECK_INTERVAL: u32 = 64;

/// A buffer whose edits are reported to a metrics engine
#[derive(Debug)]
pub struct TrackedText {
    buffer: TextBuffer,
    engine: MetricsEngine,
}

impl TrackedText {
    pub fn new(buffer: TextBuffer, mut engine: MetricsEngine) -> Self {
        engine.ensure_indexed(&buffer);
        Self { buffer, engine }
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn engine(&self) -> &MetricsEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut MetricsEngine {
        &mut self.engine
    }

    /// Run the engine's full-rescan comparison against the current text
    pub fn consistency_check(&mut self) -> bool {
        self.engine.consistency_check(&self.buffer)
    }
}

impl EditBuffer for TrackedText {
    fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.buffer.char_at(offset)
    }

    fn slice(&self, range: TextRange) -> String {
        self.buffer.slice(range)
    }

    fn line_index(&self) -> &LineIndex {
        self.buffer.line_index()
    }

    fn replace(&mut self, range: TextRange, text: &str) -> TextRange {
        let pending = self.engine.notify_edit(&self.buffer, range);
        let inserted = self.buffer.replace(range, text);
        self.engine.finish_edit(&self.buffer, pending, inserted);
        inserted
    }
}

#[derive(Debug)]
pub struct Document {
    text: TrackedText,
    undo: UndoLog,
    indent_mode: IndentMode,
    count_whitespace: bool,
    edits_since_check: u32,
}

impl Document {
    pub fn new(text: &str, config: &EditorConfig) -> Self {
        let engine = MetricsEngine::new(config.metrics.settings());
        Self {
            text: TrackedText::new(TextBuffer::from_text(text), engine),
            undo: UndoLog::new(),
            indent_mode: config.indent.mode(),
            count_whitespace: config.count_whitespace_in_total,
            edits_since_check: 0,
        }
    }

    pub fn buffer(&self) -> &TextBuffer {
        self.text.buffer()
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    pub fn slice(&self, range: TextRange) -> String {
        self.text.slice(range)
    }

    pub fn indent_mode(&self) -> IndentMode {
        self.indent_mode
    }

    pub fn set_indent_mode(&mut self, mode: IndentMode) {
        self.indent_mode = mode;
    }

    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Replace `range` with `text` as one undoable step.
    ///
    /// Returns the range the new text occupies.
    pub fn replace(&mut self, range: TextRange, text: &str) -> TextRange {
        let prior = self.text.slice(range);
        let inserted = self.text.replace(range, text);
        self.undo.register_inverse(inserted, &prior);

        tracing::debug!(
            "Replaced {} ({} chars) with {} chars",
            range,
            prior.chars().count(),
            inserted.length
        );
        self.after_edit();
        inserted
    }

    /// Indent every line touched by `ranges`; returns the new selections
    pub fn increase_indent(&mut self, ranges: &[TextRange]) -> SelectionSet {
        let selections =
            indent::increase_indent(&mut self.text, &mut self.undo, ranges, self.indent_mode);
        self.log_remap("increase_indent", ranges, &selections);
        self.after_edit();
        selections
    }

    /// Outdent every line touched by `ranges`; returns the new selections
    pub fn decrease_indent(&mut self, ranges: &[TextRange]) -> SelectionSet {
        let selections =
            indent::decrease_indent(&mut self.text, &mut self.undo, ranges, self.indent_mode);
        self.log_remap("decrease_indent", ranges, &selections);
        self.after_edit();
        selections
    }

    /// Revert the last undoable step. Returns the ranges of restored text.
    pub fn undo(&mut self) -> Option<Vec<TextRange>> {
        let restored = self.undo.undo(&mut self.text);
        if restored.is_some() {
            self.after_edit();
        }
        restored
    }

    pub fn redo(&mut self) -> Option<Vec<TextRange>> {
        let restored = self.undo.redo(&mut self.text);
        if restored.is_some() {
            self.after_edit();
        }
        restored
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    fn log_remap(&self, operation: &str, before: &[TextRange], after: &[TextRange]) {
        if let Some(diff) = SelectionSnapshot::new(before).diff(&SelectionSnapshot::new(after)) {
            tracing::debug!("{}: {}", operation, diff);
        }
    }

    fn after_edit(&mut self) {
        if !cfg!(debug_assertions) {
            return;
        }
        self.edits_since_check += 1;
        if self.edits_since_check >= CONSISTENCY_CHECK_INTERVAL
            && !self.text.engine().is_recomputing()
        {
            self.edits_since_check = 0;
            self.text.consistency_check();
        }
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    /// Last published totals
    pub fn metrics(&self) -> Metrics {
        self.text.engine().metrics()
    }

    /// Character count honouring the whitespace preference
    pub fn displayed_character_count(&self) -> u64 {
        self.metrics().displayed_characters(self.count_whitespace)
    }

    pub fn is_recomputing(&self) -> bool {
        self.text.engine().is_recomputing()
    }

    /// Publish finished background results
    pub fn poll_metrics(&mut self) -> Option<Metrics> {
        self.text.engine_mut().poll()
    }

    /// Wait for pending metrics jobs; returns false on timeout
    pub fn flush_metrics(&mut self, timeout: Duration) -> bool {
        self.text.engine_mut().flush(timeout)
    }

    pub fn subscribe_metrics(&mut self) -> Receiver<MetricsEvent> {
        self.text.engine_mut().subscribe()
    }

    /// Full rescan comparison; re-indexes on drift
    pub fn check_metrics(&mut self) -> bool {
        self.text.consistency_check()
    }

    // ========================================================================
    // Lines
    // ========================================================================

    pub fn line_range(&self, range: TextRange) -> TextRange {
        self.text.line_index().line_range(range)
    }

    pub fn nearest_line(&self, offset: usize) -> u32 {
        self.text.line_index().nearest_line(offset)
    }

    pub fn line_count(&self) -> u32 {
        self.text.line_index().line_count()
    }

    pub fn line_start_of(&self, line: u32) -> Option<usize> {
        self.text.line_index().line_start_of(line)
    }

    pub fn line_end_of(&self, line: u32) -> Option<usize> {
        self.text.line_index().line_end_of(line)
    }

    pub fn register_gutter(&mut self, sender: Sender<GutterEvent>) -> GutterHandle {
        self.text.buffer.line_index_mut().register_gutter(sender)
    }

    pub fn deregister_gutter(&mut self, handle: GutterHandle) -> bool {
        self.text.buffer.line_index_mut().deregister_gutter(handle)
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.text.buffer(), f)
    }
}
