//! quire - text-buffer mutation and metrics engine
//!
//! This crate keeps live character, word and line counts of a mutable text
//! buffer without rescanning it on every edit, and performs multi-range
//! indentation changes with undo grouping.

pub mod buffer;
pub mod cli;
pub mod config;
pub mod config_paths;
pub mod document;
pub mod engine;
pub mod indent;
pub mod line_index;
pub mod metrics;
pub mod range;
pub mod tracing;
pub mod undo;

// Re-export commonly used types
pub use buffer::{EditBuffer, TextBuffer};
pub use config::EditorConfig;
pub use document::Document;
pub use engine::{MetricsEngine, MetricsEvent, MetricsMode, MetricsSettings};
pub use indent::{decrease_indent, increase_indent, IndentMode, SelectionSet};
pub use line_index::{GutterEvent, GutterHandle, LineIndex};
pub use metrics::Metrics;
pub use range::TextRange;
pub use undo::{UndoCoordinator, UndoLog};
