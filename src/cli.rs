//! Command-line interface
//!
//! Supports:
//! - Printing text metrics for a file
//! - Indenting or outdenting a span of lines
//! - Looking up the line containing a character offset

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::config::EditorConfig;
use crate::document::Document;
use crate::indent::IndentMode;
use crate::metrics::Metrics;
use crate::range::TextRange;

/// How long the CLI waits for background metrics before giving up
const METRICS_TIMEOUT: Duration = Duration::from_secs(30);

/// Text metrics and indentation tools
#[derive(Parser, Debug)]
#[command(name = "quire", version, about = "Text metrics and indentation tools")]
pub struct CliArgs {
    /// Config file to use instead of ~/.config/quire/config.yaml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print character, word and line counts
    Stats {
        file: PathBuf,

        /// Print JSON instead of plain text
        #[arg(long)]
        json: bool,

        /// Include whitespace in the character count
        #[arg(long)]
        count_whitespace: bool,
    },

    /// Indent a span of lines by one level
    Indent(IndentArgs),

    /// Remove one level of indentation from a span of lines
    Outdent(IndentArgs),

    /// Print the line containing a character offset
    Lines {
        file: PathBuf,

        /// 0-based character offset
        #[arg(long, value_name = "O")]
        offset: usize,
    },
}

#[derive(Args, Debug)]
pub struct IndentArgs {
    pub file: PathBuf,

    /// First line to change (1-based)
    #[arg(long, value_name = "N")]
    pub line: usize,

    /// Last line to change (1-based, defaults to --line)
    #[arg(long, value_name = "M")]
    pub to_line: Option<usize>,

    /// Indent with W spaces instead of a tab
    #[arg(long, value_name = "W")]
    pub spaces: Option<u32>,

    /// Write the result back to the file instead of printing it
    #[arg(long)]
    pub write: bool,
}

impl IndentArgs {
    /// Convert the 1-indexed line options to a 0-indexed inclusive span
    pub fn line_span(&self) -> Result<(u32, u32), String> {
        if self.line == 0 {
            return Err("Line numbers start at 1".to_string());
        }
        let last = self.to_line.unwrap_or(self.line);
        if last < self.line {
            return Err(format!(
                "--to-line {} is before --line {}",
                last, self.line
            ));
        }
        let first = u32::try_from(self.line - 1).map_err(|e| e.to_string())?;
        let last = u32::try_from(last - 1).map_err(|e| e.to_string())?;
        Ok((first, last))
    }

    /// Indent mode from --spaces, falling back to the configured one
    pub fn mode(&self, config: &EditorConfig) -> IndentMode {
        match self.spaces {
            Some(width) => IndentMode::Spaces(width),
            None => config.indent.mode(),
        }
    }
}

/// Metrics as printed by `stats --json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub lines: u64,
    pub words: u64,
    pub characters: u64,
    pub whitespace_characters: u64,
    pub displayed_characters: u64,
}

impl StatsReport {
    pub fn new(metrics: Metrics, count_whitespace: bool) -> Self {
        Self {
            lines: metrics.lines,
            words: metrics.words,
            characters: metrics.characters,
            whitespace_characters: metrics.whitespace_characters,
            displayed_characters: metrics.displayed_characters(count_whitespace),
        }
    }
}

impl Command {
    /// Execute the command, writing its output to `out`
    pub fn run(&self, config: &EditorConfig, out: &mut impl Write) -> Result<()> {
        match self {
            Command::Stats {
                file,
                json,
                count_whitespace,
            } => run_stats(file, *json, *count_whitespace, config, out),
            Command::Indent(args) => run_indent(args, true, config, out),
            Command::Outdent(args) => run_indent(args, false, config, out),
            Command::Lines { file, offset } => run_lines(file, *offset, config, out),
        }
    }
}

fn open_document(path: &Path, config: &EditorConfig) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    tracing::debug!("Loaded {} ({} bytes)", path.display(), text.len());
    Ok(Document::new(&text, config))
}

fn run_stats(
    path: &Path,
    json: bool,
    count_whitespace: bool,
    config: &EditorConfig,
    out: &mut impl Write,
) -> Result<()> {
    let mut doc = open_document(path, config)?;
    if !doc.flush_metrics(METRICS_TIMEOUT) {
        bail!("Timed out counting {}", path.display());
    }

    let report = StatsReport::new(
        doc.metrics(),
        count_whitespace || config.count_whitespace_in_total,
    );

    if json {
        let content = serde_json::to_string_pretty(&report).context("Failed to serialize stats")?;
        writeln!(out, "{}", content)?;
    } else {
        writeln!(out, "lines:      {}", report.lines)?;
        writeln!(out, "words:      {}", report.words)?;
        writeln!(out, "characters: {}", report.displayed_characters)?;
        writeln!(out, "whitespace: {}", report.whitespace_characters)?;
    }
    Ok(())
}

fn run_indent(
    args: &IndentArgs,
    increase: bool,
    config: &EditorConfig,
    out: &mut impl Write,
) -> Result<()> {
    let (first, last) = args.line_span().map_err(anyhow::Error::msg)?;

    let mut doc = open_document(&args.file, config)?;
    doc.set_indent_mode(args.mode(config));

    let line_count = doc.line_count();
    if last >= line_count {
        bail!(
            "Line {} is out of range ({} has {} lines)",
            last + 1,
            args.file.display(),
            line_count
        );
    }

    let start = doc.line_start_of(first).unwrap_or(0);
    let end = doc.line_end_of(last).unwrap_or_else(|| doc.len_chars());
    let span = TextRange::between(start, end);

    let selections = if increase {
        doc.increase_indent(&[span])
    } else {
        doc.decrease_indent(&[span])
    };
    tracing::debug!("Selection after transform: {:?}", selections);

    if args.write {
        std::fs::write(&args.file, doc.to_string())
            .with_context(|| format!("Failed to write {}", args.file.display()))?;
        writeln!(
            out,
            "{} lines {}-{} of {}",
            if increase { "Indented" } else { "Outdented" },
            first + 1,
            last + 1,
            args.file.display()
        )?;
    } else {
        write!(out, "{}", doc)?;
    }
    Ok(())
}

fn run_lines(path: &Path, offset: usize, config: &EditorConfig, out: &mut impl Write) -> Result<()> {
    let doc = open_document(path, config)?;
    if offset > doc.len_chars() {
        bail!(
            "Offset {} is past the end of {} ({} chars)",
            offset,
            path.display(),
            doc.len_chars()
        );
    }

    let line = doc.nearest_line(offset);
    let range = doc.line_range(TextRange::caret(offset));
    writeln!(
        out,
        "line {} of {}: {}..{}",
        line + 1,
        doc.line_count(),
        range.location,
        range.end()
    )?;
    Ok(())
}
