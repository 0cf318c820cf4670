//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::time::Duration;

use quire::{Document, EditorConfig, Metrics, MetricsMode, TextRange};

pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub const HOLD_IT: &str = "Hold it\nWait a minute...\nI can't read my writing, my own writing!";

/// Config with inline metrics so results are published immediately
pub fn sync_config(mode: MetricsMode) -> EditorConfig {
    let mut config = EditorConfig::default();
    config.metrics.mode = mode;
    config.metrics.chunk_size = 16;
    config.metrics.asynchronous = false;
    config
}

/// Config with a background metrics worker
pub fn async_config(mode: MetricsMode) -> EditorConfig {
    let mut config = sync_config(mode);
    config.metrics.asynchronous = true;
    config
}

/// Document with tab indentation and inline chunked metrics
pub fn test_document(text: &str) -> Document {
    Document::new(text, &sync_config(MetricsMode::Chunked))
}

pub fn caret(location: usize) -> TextRange {
    TextRange::caret(location)
}

pub fn range(location: usize, length: usize) -> TextRange {
    TextRange::new(location, length)
}

/// Metrics of the document's current text, computed from scratch
pub fn full_scan(doc: &Document) -> Metrics {
    Metrics::compute(&doc.to_string())
}

/// Deterministic pseudo-random numbers for edit sequences
pub struct Lcg(pub u64);

impl Lcg {
    pub fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }

    /// A random range inside a buffer of `len` chars
    pub fn range(&mut self, len: usize) -> TextRange {
        let location = self.next(len + 1);
        let length = self.next(6).min(len - location);
        TextRange::new(location, length)
    }
}

/// Replacement texts exercising words, line breaks and CRLF joins
pub const SNIPPETS: [&str; 10] = [
    "",
    "x",
    " ",
    "\n",
    "\r",
    "\r\n",
    "\t",
    "two words",
    "ñandú\u{2029}",
    "  indented\n",
];
