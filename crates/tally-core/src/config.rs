//! Metric configuration: named parameters for the knobs that varied across
//! historical runs of this report.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunable parameters of the metrics pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Days of trailing lookback before the window start, used only by the
    /// active-editor and newly-registered classifications.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    /// Minimum lookback-window edit count for the active-editor flag.
    #[serde(default = "default_active_edit_threshold")]
    pub active_edit_threshold: u64,

    /// Database name of the shared media project for the upload metric.
    #[serde(default = "default_media_project")]
    pub media_project: String,

    /// Active-editor classification for cohort members with no lookback
    /// rows at all. Zero edits cannot meet the threshold, so this defaults
    /// to `false`.
    #[serde(default)]
    pub absent_is_active: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            active_edit_threshold: default_active_edit_threshold(),
            media_project: default_media_project(),
            absent_is_active: false,
        }
    }
}

impl MetricsConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str::<Self>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

const fn default_lookback_days() -> i64 {
    30
}

const fn default_active_edit_threshold() -> u64 {
    5
}

fn default_media_project() -> String {
    "commonswiki".to_string()
}
