//! Editor configuration persistence
//!
//! Stores indentation and metrics preferences in `~/.config/quire/config.yaml`

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{MetricsMode, MetricsSettings, DEFAULT_CHUNK_SIZE, DEFAULT_RECOMPUTE_GRACE};
use crate::indent::{IndentMode, DEFAULT_TAB_WIDTH};

/// Configuration that persists across sessions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub indent: IndentConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Include whitespace in the displayed character count
    #[serde(default)]
    pub count_whitespace_in_total: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndentConfig {
    /// Indent with spaces instead of tabs
    #[serde(default)]
    pub use_spaces: bool,

    /// Spaces per indent level
    #[serde(default = "default_tab_width")]
    pub tab_width: u32,
}

fn default_tab_width() -> u32 {
    DEFAULT_TAB_WIDTH
}

impl Default for IndentConfig {
    fn default() -> Self {
        Self {
            use_spaces: false,
            tab_width: default_tab_width(),
        }
    }
}

impl IndentConfig {
    pub fn mode(&self) -> IndentMode {
        if self.use_spaces {
            IndentMode::Spaces(self.tab_width)
        } else {
            IndentMode::Tab
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub mode: MetricsMode,

    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Delay before the busy indicator shows, in milliseconds
    #[serde(default = "default_recompute_grace_ms")]
    pub recompute_grace_ms: u64,

    /// Count on a background thread
    #[serde(default = "default_asynchronous")]
    pub asynchronous: bool,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_recompute_grace_ms() -> u64 {
    DEFAULT_RECOMPUTE_GRACE.as_millis() as u64
}

fn default_asynchronous() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            mode: MetricsMode::default(),
            chunk_size: default_chunk_size(),
            recompute_grace_ms: default_recompute_grace_ms(),
            asynchronous: default_asynchronous(),
        }
    }
}

impl MetricsConfig {
    pub fn settings(&self) -> MetricsSettings {
        MetricsSettings {
            mode: self.mode,
            chunk_size: self.chunk_size,
            recompute_grace: Duration::from_millis(self.recompute_grace_ms),
            asynchronous: self.asynchronous,
        }
    }
}

impl EditorConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from `path`, or return defaults if missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<EditorConfig>(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config.sanitized()
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to disk
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;
        self.save_to(&path)
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Replace values that would make the engines misbehave with defaults
    fn sanitized(mut self) -> Self {
        if self.indent.tab_width == 0 {
            tracing::warn!("indent.tab_width must be positive, using {}", DEFAULT_TAB_WIDTH);
            self.indent.tab_width = DEFAULT_TAB_WIDTH;
        }
        if self.metrics.chunk_size == 0 {
            tracing::warn!("metrics.chunk_size must be positive, using {}", DEFAULT_CHUNK_SIZE);
            self.metrics.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        self
    }
}
