//! Configuration system tests
//!
//! Tests for config paths and editor config loading/saving.

use std::time::Duration;

use quire::config::{EditorConfig, IndentConfig, MetricsConfig};
use quire::config_paths;
use quire::{IndentMode, MetricsMode};
use tempfile::tempdir;

// ========================================================================
// Config Paths Tests
// ========================================================================

#[test]
fn test_config_dir_contains_app_name() {
    if let Some(dir) = config_paths::config_dir() {
        assert!(dir.to_string_lossy().contains("quire"));
    }
}

#[test]
fn test_config_file_ends_with_yaml() {
    if let Some(path) = config_paths::config_file() {
        assert!(path.to_string_lossy().ends_with("config.yaml"));
    }
}

#[test]
fn test_logs_dir_is_subdir_of_config() {
    if let (Some(config), Some(logs)) = (config_paths::config_dir(), config_paths::logs_dir()) {
        assert!(logs.starts_with(&config));
    }
}

// ========================================================================
// Editor Config Tests
// ========================================================================

#[test]
fn test_default_config() {
    let config = EditorConfig::default();
    assert_eq!(config.indent.mode(), IndentMode::Tab);
    assert_eq!(config.metrics.chunk_size, 512);
    assert_eq!(config.metrics.recompute_grace_ms, 250);
    assert!(config.metrics.asynchronous);
    assert!(!config.count_whitespace_in_total);
}

#[test]
fn test_config_serialize_deserialize() {
    let config = EditorConfig {
        indent: IndentConfig {
            use_spaces: true,
            tab_width: 2,
        },
        metrics: MetricsConfig {
            mode: MetricsMode::Delta,
            chunk_size: 128,
            recompute_grace_ms: 100,
            asynchronous: false,
        },
        count_whitespace_in_total: true,
    };
    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: EditorConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_partial_yaml_fills_defaults() {
    let parsed: EditorConfig = serde_yaml::from_str("indent:\n  use_spaces: true\n").unwrap();
    assert_eq!(parsed.indent.mode(), IndentMode::Spaces(4));
    assert_eq!(parsed.metrics, MetricsConfig::default());
}

#[test]
fn test_metrics_settings_conversion() {
    let config = MetricsConfig {
        mode: MetricsMode::Delta,
        chunk_size: 64,
        recompute_grace_ms: 40,
        asynchronous: false,
    };
    let settings = config.settings();
    assert_eq!(settings.mode, MetricsMode::Delta);
    assert_eq!(settings.chunk_size, 64);
    assert_eq!(settings.recompute_grace, Duration::from_millis(40));
    assert!(!settings.asynchronous);
}

// ========================================================================
// Load / Save Tests
// ========================================================================

#[test]
fn test_save_then_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.yaml");

    let mut config = EditorConfig::default();
    config.indent.use_spaces = true;
    config.count_whitespace_in_total = true;
    config.save_to(&path).unwrap();

    assert_eq!(EditorConfig::load_from(&path), config);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let config = EditorConfig::load_from(&dir.path().join("absent.yaml"));
    assert_eq!(config, EditorConfig::default());
}

#[test]
fn test_invalid_yaml_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "indent: [this is not a map").unwrap();

    assert_eq!(EditorConfig::load_from(&path), EditorConfig::default());
}

#[test]
fn test_zero_values_are_replaced() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "indent:\n  tab_width: 0\nmetrics:\n  chunk_size: 0\n").unwrap();

    let config = EditorConfig::load_from(&path);
    assert_eq!(config.indent.tab_width, 4);
    assert_eq!(config.metrics.chunk_size, 512);
}
