//! Tracing infrastructure for development diagnostics
//!
//! Provides structured logging with scoped filtering for debugging edits,
//! selection remapping and background metrics jobs.
//!
//! # Usage
//!
//! Configure via RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=quire::engine=debug` - module-level filtering
//!
//! # Log Files
//!
//! Logs are written to `~/.config/quire/logs/quire.log` with daily rotation.
//! File logging uses debug level by default for more verbose troubleshooting.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config_paths::LOG_FILE_NAME;
use crate::range::TextRange;

/// Initialize tracing subscriber with console and file logging
///
/// Console output respects RUST_LOG (default `warn`). File logging writes to
/// `~/.config/quire/logs/quire.log` with daily rotation.
pub fn init() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // Console layer - respects RUST_LOG; stderr keeps stdout clean for output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    // File layer - always debug level for troubleshooting
    let file_layer = match crate::config_paths::ensure_logs_dir() {
        Ok(logs_dir) => {
            let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_NAME);
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!("Warning: Could not initialize file logging: {}", e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

/// Lightweight snapshot of a selection set for diffing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub ranges: Vec<TextRange>,
}

impl SelectionSnapshot {
    pub fn new(ranges: &[TextRange]) -> Self {
        Self {
            ranges: ranges.to_vec(),
        }
    }

    /// Generate a diff description between two snapshots
    pub fn diff(&self, other: &SelectionSnapshot) -> Option<String> {
        if self.ranges.len() != other.ranges.len() {
            return Some(format!(
                "selection count: {} → {}",
                self.ranges.len(),
                other.ranges.len()
            ));
        }

        let changes: Vec<String> = self
            .ranges
            .iter()
            .zip(&other.ranges)
            .enumerate()
            .filter(|(_, (before, after))| before != after)
            .map(|(i, (before, after))| format!("#{}: {} → {}", i, before, after))
            .collect();

        if changes.is_empty() {
            None
        } else {
            Some(changes.join("; "))
        }
    }
}
