//! Canvas settings loaded from JSON.
//!
//! Every field has a default, so a file only needs to name what it
//! changes:
//!
//! ```json
//! { "snap": { "modes": "VERTEX | GRID", "grid_size": 16.0 } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canvas::DEFAULT_SELECT_DISTANCE;
use crate::snap::SnapConfig;
use crate::style::CanvasStyle;

/// Errors that can occur while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything about a canvas that is not the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub style: CanvasStyle,
    pub snap: SnapConfig,
    /// Pick radius of the select tool, in device pixels.
    pub select_distance: f64,
    /// Smallest and largest zoom.
    pub zoom_limits: [f64; 2],
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            style: CanvasStyle::default(),
            snap: SnapConfig::default(),
            select_distance: DEFAULT_SELECT_DISTANCE,
            zoom_limits: [0.1, 100.0],
        }
    }
}

impl CanvasConfig {
    /// Parse and validate a configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).inspect_err(|e| {
            log::warn!("cannot read {}: {e}", path.display());
        })?;
        Self::from_json(&json).inspect_err(|e| {
            log::warn!("cannot load {}: {e}", path.display());
        })
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check values the canvas cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        let snap = &self.snap;
        if !(snap.grid_size > 0.0) {
            return Err(ConfigError::Invalid(format!("grid size {} must be positive", snap.grid_size)));
        }
        if !(snap.angle_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "angle step {} must be positive",
                snap.angle_size
            )));
        }
        if !(snap.snap_distance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "snap distance {} must not be negative",
                snap.snap_distance
            )));
        }
        if !(self.select_distance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "select distance {} must be positive",
                self.select_distance
            )));
        }
        let [min_zoom, max_zoom] = self.zoom_limits;
        if !(min_zoom > 0.0 && min_zoom <= max_zoom) {
            return Err(ConfigError::Invalid(format!(
                "zoom limits {min_zoom}..{max_zoom} are not increasing and positive"
            )));
        }
        Ok(())
    }
}
