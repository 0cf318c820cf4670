//! Undo transaction log
//!
//! Implements the undo-coordinator contract the indentation transformer
//! consumes: explicit transaction boundaries plus one inverse entry per edit.
//! Nested begin/end pairs flatten into the outermost transaction.

use crate::buffer::EditBuffer;
use crate::range::TextRange;

/// Inverse of one edit: replacing `range` with `prior_content` undoes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    /// Where the edit's new content sits right after the edit
    pub range: TextRange,
    /// The content that was there before
    pub prior_content: String,
}

impl UndoEntry {
    pub fn new(range: TextRange, prior_content: impl Into<String>) -> Self {
        Self {
            range,
            prior_content: prior_content.into(),
        }
    }
}

/// Entries that undo atomically, in the order they were registered
pub type Transaction = Vec<UndoEntry>;

/// What an edit producer needs from the undo system
pub trait UndoCoordinator {
    fn begin_transaction(&mut self);

    fn end_transaction(&mut self);

    /// Record that `range` now holds new content which replaced `prior_text`
    fn register_inverse(&mut self, range: TextRange, prior_text: &str);
}

/// Undo/redo stacks of transactions
#[derive(Debug, Clone)]
pub struct UndoLog {
    undo_stack: Vec<Transaction>,
    redo_stack: Vec<Transaction>,
    open: Transaction,
    depth: usize,
    max_size: usize,
    transactions_opened: usize,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoLog {
    /// Create an undo log with default max size
    pub fn new() -> Self {
        Self::with_max_size(1000)
    }

    /// Create an undo log keeping at most `max_size` transactions
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            open: Vec::new(),
            depth: 0,
            max_size,
            transactions_opened: 0,
        }
    }

    /// True while inside a begin/end pair
    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    /// Number of outermost transactions ever opened
    pub fn transactions_opened(&self) -> usize {
        self.transactions_opened
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Most recent committed transaction
    pub fn last_transaction(&self) -> Option<&Transaction> {
        self.undo_stack.last()
    }

    /// Revert the most recent transaction. Returns the ranges of restored text.
    pub fn undo<B: EditBuffer + ?Sized>(&mut self, buffer: &mut B) -> Option<Vec<TextRange>> {
        if self.in_transaction() {
            tracing::warn!("Undo requested inside an open transaction, ignoring");
            return None;
        }
        let transaction = self.undo_stack.pop()?;
        let (inverse, restored) = replay(buffer, transaction);
        self.redo_stack.push(inverse);
        Some(restored)
    }

    /// Re-apply the most recently undone transaction
    pub fn redo<B: EditBuffer + ?Sized>(&mut self, buffer: &mut B) -> Option<Vec<TextRange>> {
        if self.in_transaction() {
            tracing::warn!("Redo requested inside an open transaction, ignoring");
            return None;
        }
        let transaction = self.redo_stack.pop()?;
        let (inverse, restored) = replay(buffer, transaction);
        self.undo_stack.push(inverse);
        Some(restored)
    }

    fn commit(&mut self, transaction: Transaction) {
        if transaction.is_empty() {
            return;
        }
        self.redo_stack.clear();
        self.undo_stack.push(transaction);

        // Trim if exceeded max size
        while self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
    }
}

/// Apply a transaction's entries newest first, collecting the inverse
fn replay<B: EditBuffer + ?Sized>(
    buffer: &mut B,
    transaction: Transaction,
) -> (Transaction, Vec<TextRange>) {
    let mut inverse = Vec::with_capacity(transaction.len());
    let mut restored = Vec::with_capacity(transaction.len());

    for entry in transaction.into_iter().rev() {
        let current = buffer.slice(entry.range);
        let range = buffer.replace(entry.range, &entry.prior_content);
        inverse.push(UndoEntry::new(range, current));
        restored.push(range);
    }

    (inverse, restored)
}

impl UndoCoordinator for UndoLog {
    fn begin_transaction(&mut self) {
        if self.depth == 0 {
            self.transactions_opened += 1;
        }
        self.depth += 1;
    }

    fn end_transaction(&mut self) {
        match self.depth {
            0 => tracing::warn!("end_transaction without matching begin_transaction"),
            1 => {
                self.depth = 0;
                let transaction = std::mem::take(&mut self.open);
                self.commit(transaction);
            }
            _ => self.depth -= 1,
        }
    }

    fn register_inverse(&mut self, range: TextRange, prior_text: &str) {
        let entry = UndoEntry::new(range, prior_text);
        if self.in_transaction() {
            self.open.push(entry);
        } else {
            self.commit(vec![entry]);
        }
    }
}
