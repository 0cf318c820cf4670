//! Multi-range indentation transformer
//!
//! Increases or decreases the indentation of every line touched by a set of
//! selections, registers inverse entries with the undo coordinator and returns
//! the remapped selections.
//!
//! Lines are collected in pre-edit buffer coordinates first (a line touched by
//! several selections is only indented once), then edited top to bottom with a
//! running offset. Selections are remapped from the same list of edits, so the
//! result does not depend on the order the selections were given in.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::buffer::EditBuffer;
use crate::range::TextRange;
use crate::undo::UndoCoordinator;

/// Spaces removed per outdent when indenting with tabs
pub const DEFAULT_TAB_WIDTH: u32 = 4;

/// Selections in the user's multi-cursor order
pub type SelectionSet = Vec<TextRange>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndentMode {
    #[default]
    Tab,
    Spaces(u32),
}

impl IndentMode {
    /// Text inserted by one indent step
    pub fn unit(&self) -> String {
        match self {
            IndentMode::Tab => "\t".to_string(),
            IndentMode::Spaces(width) => " ".repeat(*width as usize),
        }
    }

    /// Length of one indent step in chars
    pub fn unit_len(&self) -> usize {
        match self {
            IndentMode::Tab => 1,
            IndentMode::Spaces(width) => *width as usize,
        }
    }

    /// Maximum number of leading spaces one outdent removes
    pub fn outdent_width(&self) -> usize {
        match self {
            IndentMode::Tab => DEFAULT_TAB_WIDTH as usize,
            IndentMode::Spaces(width) => (*width as usize).max(1),
        }
    }
}

/// Sorted, deduplicated start offsets of every line touched by `ranges`
fn touched_line_starts<B: EditBuffer + ?Sized>(buffer: &B, ranges: &[TextRange]) -> Vec<usize> {
    let lines = buffer.line_index();
    let starts: BTreeSet<usize> = ranges
        .iter()
        .flat_map(move |range| lines.line_starts_in(*range).iter().copied())
        .collect();
    starts.into_iter().collect()
}

fn clamp_all<B: EditBuffer + ?Sized>(buffer: &B, ranges: &[TextRange]) -> SelectionSet {
    let len = buffer.len_chars();
    ranges.iter().map(|range| range.clamp(len)).collect()
}

/// Indent every line touched by `ranges` by one unit of `mode`.
///
/// All insertions form one undo transaction. Each selection boundary moves
/// right by one unit per indented line starting at or before it: a caret ends
/// up after the indentation inserted on its own line, and a selection grows by
/// one unit for every touched line after its first.
pub fn increase_indent<B, U>(
    buffer: &mut B,
    undo: &mut U,
    ranges: &[TextRange],
    mode: IndentMode,
) -> SelectionSet
where
    B: EditBuffer + ?Sized,
    U: UndoCoordinator + ?Sized,
{
    let ranges = clamp_all(buffer, ranges);
    let unit = mode.unit();
    let unit_len = mode.unit_len();
    if ranges.is_empty() || unit_len == 0 {
        tracing::debug!("increase_indent: nothing to do ({} ranges, {:?})", ranges.len(), mode);
        return ranges;
    }

    let starts = touched_line_starts(buffer, &ranges);

    undo.begin_transaction();
    let mut inserted_characters = 0;
    for &start in &starts {
        let inserted = buffer.replace(TextRange::caret(start + inserted_characters), &unit);
        undo.register_inverse(inserted, "");
        inserted_characters += unit_len;
    }
    undo.end_transaction();

    tracing::debug!(
        "Indented {} lines for {} ranges ({} chars inserted)",
        starts.len(),
        ranges.len(),
        inserted_characters
    );

    let shifted = |offset: usize| offset + unit_len * starts.partition_point(|&s| s <= offset);
    ranges
        .iter()
        .map(|range| {
            let location = shifted(range.location);
            let end = shifted(range.end());
            TextRange::new(location, end - location)
        })
        .collect()
}

/// Leading indentation removed by one outdent of the line starting at `start`
fn outdent_length<B: EditBuffer + ?Sized>(buffer: &B, start: usize, width: usize) -> usize {
    match buffer.char_at(start) {
        Some('\t') => 1,
        Some(' ') => {
            let mut count = 0;
            while count < width {
                match buffer.char_at(start + count) {
                    Some(' ') => count += 1,
                    // A tab after the spaces would expand into the freed width
                    Some('\t') => {
                        count += 1;
                        break;
                    }
                    _ => break,
                }
            }
            count
        }
        _ => 0,
    }
}

/// One leading-whitespace removal in pre-edit buffer coordinates
#[derive(Debug, Clone, Copy)]
struct Removal {
    start: usize,
    length: usize,
}

/// Where `offset` lands once every removal has been applied
fn offset_after_removals(offset: usize, removals: &[Removal]) -> usize {
    let removed_before: usize = removals
        .iter()
        .take_while(|removal| removal.start < offset)
        .map(|removal| removal.length.min(offset - removal.start))
        .sum();
    offset - removed_before
}

/// Remove one level of indentation from every line touched by `ranges`.
///
/// A leading tab is removed, or up to `mode.outdent_width()` leading spaces
/// (plus a tab directly following them). Lines without leading whitespace are
/// left alone. No undo transaction is opened when nothing is removed.
pub fn decrease_indent<B, U>(
    buffer: &mut B,
    undo: &mut U,
    ranges: &[TextRange],
    mode: IndentMode,
) -> SelectionSet
where
    B: EditBuffer + ?Sized,
    U: UndoCoordinator + ?Sized,
{
    let ranges = clamp_all(buffer, ranges);
    let width = mode.outdent_width();

    let removals: Vec<Removal> = touched_line_starts(buffer, &ranges)
        .into_iter()
        .filter_map(|start| {
            let length = outdent_length(buffer, start, width);
            (length > 0).then_some(Removal { start, length })
        })
        .collect();

    if removals.is_empty() {
        tracing::debug!("decrease_indent: no leading whitespace on touched lines");
        return ranges;
    }

    undo.begin_transaction();
    let mut removed_characters = 0;
    for removal in &removals {
        let range = TextRange::new(removal.start - removed_characters, removal.length);
        let prior = buffer.slice(range);
        let emptied = buffer.replace(range, "");
        undo.register_inverse(emptied, &prior);
        removed_characters += removal.length;
    }
    undo.end_transaction();

    tracing::debug!(
        "Outdented {} lines for {} ranges ({} chars removed)",
        removals.len(),
        ranges.len(),
        removed_characters
    );

    ranges
        .iter()
        .map(|range| {
            let location = offset_after_removals(range.location, &removals);
            let end = offset_after_removals(range.end(), &removals);
            TextRange::new(location, end - location)
        })
        .collect()
}
