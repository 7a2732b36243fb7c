//! Render sink.
//!
//! The sink is the drawing surface. It receives whole layers (never
//! per-track updates) and never mutates domain data. [`MemorySink`] is the
//! headless implementation used by the CLI and the tests.

use serde::Serialize;

use crate::{Bounds, DensityGrid, GpsPoint, HeatmapStyle, LinePath, ViewConfig};

/// Drawing surface for the aggregated geometry.
pub trait RenderSink: Send {
    /// Replace every rendered line path.
    fn replace_line_paths(&mut self, paths: &[LinePath]);

    /// Replace the density layer with one built from `samples`.
    fn replace_density(&mut self, samples: &[GpsPoint], style: &HeatmapStyle);

    /// Remove the density layer.
    fn clear_density(&mut self);

    /// Fit the viewport to the geometry currently rendered.
    fn fit_to_visible(&mut self, view: &ViewConfig);

    /// Remove every track and density layer.
    fn clear_layers(&mut self);
}

/// What the viewport currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Viewport {
    /// Fitted to rendered geometry
    Fit { bounds: Bounds, padding_px: u32 },
    /// Fixed center and zoom
    Center { center: GpsPoint, zoom: u8 },
}

/// Headless sink that keeps whatever it was last told to draw.
#[derive(Debug, Clone)]
pub struct MemorySink {
    line_paths: Vec<LinePath>,
    density_samples: Vec<GpsPoint>,
    density: Option<DensityGrid>,
    viewport: Viewport,
    redraws: u32,
}

impl MemorySink {
    pub fn new() -> Self {
        let view = ViewConfig::default();
        Self {
            line_paths: Vec::new(),
            density_samples: Vec::new(),
            density: None,
            viewport: Viewport::Center {
                center: view.default_center,
                zoom: view.default_zoom,
            },
            redraws: 0,
        }
    }

    pub fn line_paths(&self) -> &[LinePath] {
        &self.line_paths
    }

    pub fn density_samples(&self) -> &[GpsPoint] {
        &self.density_samples
    }

    /// Density grid, `None` when no density layer is shown.
    pub fn density(&self) -> Option<&DensityGrid> {
        self.density.as_ref()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Number of layer replacements received.
    pub fn redraws(&self) -> u32 {
        self.redraws
    }

    /// True when neither tracks nor density are drawn.
    pub fn is_blank(&self) -> bool {
        self.line_paths.is_empty() && self.density.is_none()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSink for MemorySink {
    fn replace_line_paths(&mut self, paths: &[LinePath]) {
        self.line_paths = paths.to_vec();
        self.redraws += 1;
    }

    fn replace_density(&mut self, samples: &[GpsPoint], style: &HeatmapStyle) {
        self.density_samples = samples.to_vec();
        self.density = Some(DensityGrid::build(samples, style));
        self.redraws += 1;
    }

    fn clear_density(&mut self) {
        self.density_samples.clear();
        self.density = None;
    }

    fn fit_to_visible(&mut self, view: &ViewConfig) {
        let bounds = self
            .line_paths
            .iter()
            .map(LinePath::bounds)
            .reduce(|a, b| a.merge(&b));

        self.viewport = match bounds {
            Some(bounds) => Viewport::Fit {
                bounds,
                padding_px: view.fit_padding_px,
            },
            None => Viewport::Center {
                center: view.default_center,
                zoom: view.default_zoom,
            },
        };
    }

    fn clear_layers(&mut self) {
        self.line_paths.clear();
        self.clear_density();
    }
}
