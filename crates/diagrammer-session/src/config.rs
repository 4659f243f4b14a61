//! Editor configuration for diagrammer
//!
//! Loaded from `$XDG_CONFIG_HOME/diagrammer/config.json` (or
//! `~/.config/diagrammer/config.json`). Missing fields take defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use diagrammer_core::Color;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default logical canvas size
pub const DEFAULT_CANVAS_WIDTH: f64 = 1600.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 1200.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Logical canvas size, used to place default shapes
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Initial draw color (ARGB)
    pub color: Color,
    /// Initial stroke width, and the stroke given to store entities that carry none
    pub stroke_width: f32,
    /// Maximum number of undo steps kept
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            color: Color::BLACK,
            stroke_width: 3.0,
            history_limit: 100,
        }
    }
}

impl EditorConfig {
    /// Load from `path`, or from the default location when `path` is None.
    ///
    /// An explicit path must exist. A missing default file yields the
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => {
                let path = Self::config_path();
                if path.exists() {
                    Self::read(&path)
                } else {
                    debug!(path = %path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&content).with_context(|| format!("invalid config {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config.sanitized())
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            });
        config_dir.join("diagrammer").join("config.json")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Clamp values the editor cannot work with
    pub fn sanitized(mut self) -> Self {
        self.stroke_width = self.stroke_width.max(1.0);
        self.history_limit = self.history_limit.max(1);
        if !(self.canvas_width > 0.0) {
            self.canvas_width = DEFAULT_CANVAS_WIDTH;
        }
        if !(self.canvas_height > 0.0) {
            self.canvas_height = DEFAULT_CANVAS_HEIGHT;
        }
        self
    }
}
