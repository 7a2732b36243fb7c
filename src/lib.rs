//! # Trackheat
//!
//! GPS track ingestion and aggregation for map viewers.
//!
//! This library provides:
//! - A durable store of raw track files keyed by file name
//! - Decoding of GPX and GeoJSON track files into feature collections
//! - Extraction of line paths and density samples from those collections
//! - A rebuild-only aggregation engine that unions every stored track
//! - A render sink contract plus a headless sink for tests and the CLI
//!
//! ## Features
//!
//! - **`persistence`** - SQLite track store (default)
//! - **`parallel`** - Decode tracks concurrently with rayon during a rebuild
//! - **`cli`** - Build the `trackheat` command-line driver
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trackheat::{MemorySink, MemoryTrackStore, Session, Track, ViewerConfig};
//!
//! let gpx = r#"<?xml version="1.0"?>
//! <gpx version="1.1" creator="doc">
//!   <trk><trkseg>
//!     <trkpt lat="51.5074" lon="-0.1278"></trkpt>
//!     <trkpt lat="51.5080" lon="-0.1290"></trkpt>
//!   </trkseg></trk>
//! </gpx>"#;
//!
//! let session = Session::new(MemoryTrackStore::new(), MemorySink::new(), ViewerConfig::default());
//! session.upload(vec![Track::new("morning.gpx", gpx.as_bytes().to_vec())]).unwrap();
//!
//! let view = session.view();
//! assert_eq!(view.line_paths.len(), 1);
//! assert_eq!(view.point_samples.len(), 2);
//! ```

use geo::{Coord, Distance, Haversine, LineString, Point};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{GeometryError, Result, TrackError};

// Configuration (extraction policy, density style, view defaults)
pub mod config;
pub use config::{
    ExtractConfig, GradientStop, HeatmapStyle, UnsupportedGeometryPolicy, ViewConfig,
    ViewerConfig,
};

// Track file decoders (raw bytes -> GeoJSON feature collection)
pub mod decoder;
pub use decoder::{AutoDecoder, GeoJsonDecoder, GpxDecoder, TrackDecoder};

// Geometry extraction (feature collection -> line paths + point samples)
pub mod extract;
pub use extract::{extract, TrackGeometry};

// Track store contract and in-memory store
pub mod store;
pub use store::{MemoryTrackStore, Track, TrackStore};

// SQLite track store
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteTrackStore;

// Aggregation engine (full rebuild from the store)
pub mod aggregate;
pub use aggregate::{
    AggregateView, AggregationEngine, EngineState, GeometryWarning, RebuildReport, TrackSummary,
};

// Weighted density grid over point samples
pub mod density;
pub use density::{DensityCell, DensityGrid};

// Render sink contract and headless sink
pub mod sink;
pub use sink::{MemorySink, RenderSink, Viewport};

// Session object tying store, engine and sink together
pub mod session;
pub use session::{RebuildStatus, Session};

/// Install a default logger for embedders that have none.
#[cfg(feature = "cli")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(not(feature = "cli"))]
pub fn init_logging() {
    // No-op: the embedding application owns the logger
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use trackheat::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// One coordinate contributed to the density overlay.
///
/// Duplicates are meaningful: each one adds weight.
pub type PointSample = GpsPoint;

/// Bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self {
            min_lat: first.latitude,
            max_lat: first.latitude,
            min_lng: first.longitude,
            max_lng: first.longitude,
        };
        for p in rest {
            bounds.extend(p);
        }
        Some(bounds)
    }

    /// Grow the bounds to include a point.
    pub fn extend(&mut self, point: &GpsPoint) {
        self.min_lat = self.min_lat.min(point.latitude);
        self.max_lat = self.max_lat.max(point.latitude);
        self.min_lng = self.min_lng.min(point.longitude);
        self.max_lng = self.max_lng.max(point.longitude);
    }

    /// Smallest bounds covering both.
    pub fn merge(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lng: self.min_lng.min(other.min_lng),
            max_lng: self.max_lng.max(other.max_lng),
        }
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Check if a point lies inside (inclusive).
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// One continuous drawn trail segment, in lat/lon order.
///
/// Never empty. Point order defines the line direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LinePath(Vec<GpsPoint>);

impl LinePath {
    /// Create a line path. Returns `None` for an empty point list.
    pub fn new(points: Vec<GpsPoint>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self(points))
        }
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> GpsPoint {
        self.0[0]
    }

    pub fn last(&self) -> GpsPoint {
        self.0[self.0.len() - 1]
    }

    pub fn bounds(&self) -> Bounds {
        // Non-empty by construction
        let mut bounds = Bounds {
            min_lat: self.0[0].latitude,
            max_lat: self.0[0].latitude,
            min_lng: self.0[0].longitude,
            max_lng: self.0[0].longitude,
        };
        for p in &self.0[1..] {
            bounds.extend(p);
        }
        bounds
    }

    /// Convert to a `geo` line string (x = longitude, y = latitude).
    pub fn to_line_string(&self) -> LineString<f64> {
        LineString::new(
            self.0
                .iter()
                .map(|p| Coord {
                    x: p.longitude,
                    y: p.latitude,
                })
                .collect(),
        )
    }

    /// Great-circle length along the path, in meters.
    pub fn length_meters(&self) -> f64 {
        self.0
            .windows(2)
            .map(|w| {
                Haversine::distance(
                    Point::new(w[0].longitude, w[0].latitude),
                    Point::new(w[1].longitude, w[1].latitude),
                )
            })
            .sum()
    }

    pub fn into_points(self) -> Vec<GpsPoint> {
        self.0
    }
}

// ============================================================================
// Tests
// ============================================================================
