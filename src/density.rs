//! Weighted density grid.
//!
//! Headless rendition of the density layer: point samples are binned into
//! square cells (equirectangular approximation around the first sample's
//! latitude) and each cell gets a count and a clamped intensity.

use std::collections::HashMap;

use serde::Serialize;

use crate::{GpsPoint, HeatmapStyle};

const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// One non-empty cell of the density grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityCell {
    pub row: i32,
    pub col: i32,
    /// Cell center for rendering
    pub center_lat: f64,
    pub center_lng: f64,
    /// Number of samples in the cell (duplicates included)
    pub count: u32,
    /// `count / max_intensity`, clamped to 1.0
    pub intensity: f32,
}

/// Sparse density grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DensityGrid {
    /// Non-empty cells, densest first
    pub cells: Vec<DensityCell>,
    pub cell_size_meters: f64,
    pub total_samples: usize,
}

impl DensityGrid {
    pub fn build(samples: &[GpsPoint], style: &HeatmapStyle) -> Self {
        let cell_size = style.cell_size_meters;
        let Some(first) = samples.first() else {
            return Self {
                cells: Vec::new(),
                cell_size_meters: cell_size,
                total_samples: 0,
            };
        };

        let ref_lat = first.latitude;
        // Keep cells finite near the poles
        let lng_meters_per_deg = (METERS_PER_DEG_LAT * ref_lat.to_radians().cos()).max(1.0);

        let mut counts: HashMap<(i32, i32), u32> = HashMap::new();
        for p in samples {
            let row = ((p.latitude - ref_lat) * METERS_PER_DEG_LAT / cell_size).floor() as i32;
            let col = (p.longitude * lng_meters_per_deg / cell_size).floor() as i32;
            *counts.entry((row, col)).or_insert(0) += 1;
        }

        let mut cells: Vec<DensityCell> = counts
            .into_iter()
            .map(|((row, col), count)| DensityCell {
                row,
                col,
                center_lat: ref_lat + (row as f64 + 0.5) * cell_size / METERS_PER_DEG_LAT,
                center_lng: (col as f64 + 0.5) * cell_size / lng_meters_per_deg,
                count,
                intensity: (count as f64 / style.max_intensity).min(1.0) as f32,
            })
            .collect();

        cells.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.row.cmp(&b.row))
                .then(a.col.cmp(&b.col))
        });

        Self {
            cells,
            cell_size_meters: cell_size,
            total_samples: samples.len(),
        }
    }

    pub fn max_count(&self) -> u32 {
        self.cells.first().map_or(0, |c| c.count)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
