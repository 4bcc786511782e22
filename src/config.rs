//! Application Configuration Module
//! Loads default thresholds and display settings from an optional JSON file.

use crate::stats::{TTestKind, Thresholds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable pointing at a settings file
pub const CONFIG_ENV_VAR: &str = "VOLCANO_EXPLORER_CONFIG";
/// Settings file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "volcano_explorer.json";

pub const FOLD_CHANGE_RANGE: (f64, f64) = (0.0, 3.0);
pub const P_VALUE_RANGE: (f64, f64) = (0.0, 0.05);
pub const POINT_RADIUS_RANGE: (f32, f32) = (1.0, 10.0);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Display parameters for the volcano plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub point_radius: f32,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            point_radius: 4.0,
            show_labels: false,
        }
    }
}

/// Pixel size of exported images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 900,
        }
    }
}

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub thresholds: Thresholds,
    pub display: DisplaySettings,
    pub ttest: TTestKind,
    pub export: ExportSettings,
}

impl AppConfig {
    /// Parse a settings file. Missing keys fall back to defaults.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(config.clamped())
    }

    /// Resolve the settings file from the environment or working directory.
    ///
    /// A missing file yields defaults; a broken one is logged and ignored.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::from_path(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    /// Clamp values into the ranges the sliders accept.
    pub fn clamped(mut self) -> Self {
        self.thresholds.fold_change = clamp_f64(
            self.thresholds.fold_change,
            FOLD_CHANGE_RANGE,
            Thresholds::default().fold_change,
        );
        self.thresholds.p_value = clamp_f64(
            self.thresholds.p_value,
            P_VALUE_RANGE,
            Thresholds::default().p_value,
        );
        self.display.point_radius = if self.display.point_radius.is_finite() {
            self.display
                .point_radius
                .clamp(POINT_RADIUS_RANGE.0, POINT_RADIUS_RANGE.1)
        } else {
            DisplaySettings::default().point_radius
        };
        self.export.width = self.export.width.clamp(320, 8000);
        self.export.height = self.export.height.clamp(240, 8000);
        self
    }
}

fn clamp_f64(value: f64, (lo, hi): (f64, f64), fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_slider_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.thresholds.fold_change, 1.5);
        assert_eq!(config.thresholds.p_value, 0.05);
        assert_eq!(config.ttest, TTestKind::Student);
        assert_eq!(config.display.point_radius, 4.0);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"thresholds": {{"fold_change": 2.0}}, "ttest": "welch"}}"#).unwrap();

        let config = AppConfig::from_path(file.path()).unwrap();
        assert_eq!(config.thresholds.fold_change, 2.0);
        assert_eq!(config.thresholds.p_value, 0.05);
        assert_eq!(config.ttest, TTestKind::Welch);
        assert_eq!(config.export, ExportSettings::default());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"thresholds": {{"fold_change": 9.0, "p_value": 0.5}}, "display": {{"point_radius": 0.1}}}}"#
        )
        .unwrap();

        let config = AppConfig::from_path(file.path()).unwrap();
        assert_eq!(config.thresholds.fold_change, 3.0);
        assert_eq!(config.thresholds.p_value, 0.05);
        assert_eq!(config.display.point_radius, 1.0);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = AppConfig::from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
