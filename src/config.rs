//! Viewer configuration.
//!
//! Every section has defaults matching the browser viewer, so an
//! empty JSON object (or no config file at all) is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{GpsPoint, Result, TrackError};

/// What to do with geometry other than points and (multi-)line-strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedGeometryPolicy {
    /// Drop it silently.
    #[default]
    Ignore,
    /// Drop it, log a warning and list it in the rebuild report.
    Warn,
    /// Fail the whole track with `UnsupportedGeometry`.
    Reject,
}

/// Configuration for geometry extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub unsupported_geometry: UnsupportedGeometryPolicy,
}

/// One color stop of the density gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position in (0, 1]
    pub stop: f32,
    pub color: String,
}

impl GradientStop {
    fn new(stop: f32, color: &str) -> Self {
        Self {
            stop,
            color: color.to_string(),
        }
    }
}

/// Styling of the weighted density layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapStyle {
    /// Zoom level at which points reach full intensity.
    /// Default: 17
    pub max_zoom: u8,

    /// Sample count at which a location is drawn at full intensity.
    /// Default: 3.0
    pub max_intensity: f64,

    /// Point radius in pixels.
    /// Default: 5
    pub radius: u32,

    /// Blur in pixels.
    /// Default: 1
    pub blur: u32,

    /// Color gradient, ascending by stop.
    /// Default: blue, lime, orange, red, darkred
    pub gradient: Vec<GradientStop>,

    /// Cell size for the headless density grid, in meters.
    /// Default: 25.0
    pub cell_size_meters: f64,
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        Self {
            max_zoom: 17,
            max_intensity: 3.0,
            radius: 5,
            blur: 1,
            gradient: vec![
                GradientStop::new(0.2, "blue"),
                GradientStop::new(0.4, "lime"),
                GradientStop::new(0.6, "orange"),
                GradientStop::new(0.8, "red"),
                GradientStop::new(1.0, "darkred"),
            ],
            cell_size_meters: 25.0,
        }
    }
}

/// Viewport behaviour of the render sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Padding around fitted geometry, in pixels.
    /// Default: 20
    pub fit_padding_px: u32,

    /// View shown when nothing is rendered.
    /// Default: (20, 0)
    pub default_center: GpsPoint,

    /// Zoom shown when nothing is rendered.
    /// Default: 2
    pub default_zoom: u8,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            fit_padding_px: 20,
            default_center: GpsPoint::new(20.0, 0.0),
            default_zoom: 2,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub extract: ExtractConfig,
    pub heatmap: HeatmapStyle,
    pub view: ViewConfig,
    /// SQLite database used by the CLI.
    /// Default: "trackheat.db"
    pub database_path: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            extract: ExtractConfig::default(),
            heatmap: HeatmapStyle::default(),
            view: ViewConfig::default(),
            database_path: "trackheat.db".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ViewerConfig = serde_json::from_str(json).map_err(|e| TrackError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| TrackError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(TrackError::Config { message });

        if !(self.heatmap.max_intensity > 0.0) {
            return invalid(format!(
                "heatmap.max_intensity must be positive, got {}",
                self.heatmap.max_intensity
            ));
        }
        if !(self.heatmap.cell_size_meters > 0.0) {
            return invalid(format!(
                "heatmap.cell_size_meters must be positive, got {}",
                self.heatmap.cell_size_meters
            ));
        }
        if let Some(stop) = self
            .heatmap
            .gradient
            .iter()
            .find(|s| !(s.stop > 0.0 && s.stop <= 1.0))
        {
            return invalid(format!(
                "heatmap.gradient stop {} ({}) is outside (0, 1]",
                stop.stop, stop.color
            ));
        }
        if !self.view.default_center.is_valid() {
            return invalid("view.default_center is not a valid coordinate".to_string());
        }
        Ok(())
    }
}
