//! Command-line tests
//!
//! Runs subcommands against temporary files and checks their output.

mod common;

use std::path::{Path, PathBuf};

use clap::Parser;
use common::{sync_config, HOLD_IT};
use quire::cli::{CliArgs, StatsReport};
use quire::MetricsMode;
use tempfile::{tempdir, TempDir};

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn run(args: &[&str], file: &Path) -> anyhow::Result<String> {
    let mut argv = vec!["quire".to_string()];
    argv.push(args[0].to_string());
    argv.push(file.display().to_string());
    argv.extend(args[1..].iter().map(|a| a.to_string()));

    let cli = CliArgs::try_parse_from(argv)?;
    let mut out = Vec::new();
    cli.command.run(&sync_config(MetricsMode::Chunked), &mut out)?;
    Ok(String::from_utf8(out)?)
}

// ========================================================================
// stats
// ========================================================================

#[test]
fn test_stats_plain_text() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "notes.txt", "one two\nthree\n");

    let output = run(&["stats"], &file).unwrap();
    assert!(output.contains("lines:      3"), "{}", output);
    assert!(output.contains("words:      3"), "{}", output);
    assert!(output.contains("characters: 11"), "{}", output);
}

#[test]
fn test_stats_json() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "notes.txt", "a b");

    let output = run(&["stats", "--json", "--count-whitespace"], &file).unwrap();
    let report: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(report["lines"], 1);
    assert_eq!(report["words"], 2);
    assert_eq!(report["characters"], 2);
    assert_eq!(report["displayed_characters"], 3);

    let expected = serde_json::to_value(StatsReport::new(quire::Metrics::compute("a b"), true)).unwrap();
    assert_eq!(report, expected);
}

#[test]
fn test_stats_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = run(&["stats"], &dir.path().join("missing.txt")).unwrap_err();
    assert!(err.to_string().contains("Failed to read"));
}

// ========================================================================
// indent / outdent
// ========================================================================

#[test]
fn test_indent_prints_result() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "hold.txt", HOLD_IT);

    let output = run(&["indent", "--line", "1", "--to-line", "2"], &file).unwrap();
    assert_eq!(
        output,
        "\tHold it\n\tWait a minute...\nI can't read my writing, my own writing!"
    );
    // Not written back
    assert_eq!(std::fs::read_to_string(&file).unwrap(), HOLD_IT);
}

#[test]
fn test_indent_with_spaces_writes_file() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "hold.txt", HOLD_IT);

    let output = run(&["indent", "--line", "3", "--spaces", "2", "--write"], &file).unwrap();
    assert!(output.starts_with("Indented lines 3-3"), "{}", output);
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        "Hold it\nWait a minute...\n  I can't read my writing, my own writing!"
    );
}

#[test]
fn test_outdent_prints_result() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "code.txt", "fn x() {\n\tbody\n    more\n}\n");

    let output = run(&["outdent", "--line", "2", "--to-line", "3"], &file).unwrap();
    assert_eq!(output, "fn x() {\nbody\nmore\n}\n");
}

#[test]
fn test_indent_line_out_of_range() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "short.txt", "one\ntwo");

    let err = run(&["indent", "--line", "5"], &file).unwrap_err();
    assert!(err.to_string().contains("out of range"), "{}", err);
}

// ========================================================================
// lines
// ========================================================================

#[test]
fn test_lines_reports_containing_line() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "fruit.txt", "car\nbanana\nsky");

    let output = run(&["lines", "--offset", "6"], &file).unwrap();
    assert_eq!(output, "line 2 of 3: 4..11\n");
}

#[test]
fn test_lines_offset_past_end() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "fruit.txt", "car");

    assert!(run(&["lines", "--offset", "10"], &file).is_err());
}
