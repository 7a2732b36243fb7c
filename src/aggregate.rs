//! # Aggregation Engine
//!
//! Rebuilds the [`AggregateView`] from the full contents of a track store.
//! There is no incremental variant: every rebuild reads every track, decodes
//! and extracts each one, and unions the results into a fresh view that
//! replaces the previous one in a single assignment.
//!
//! ## Failure policy
//!
//! - A track that fails to decode or extract is skipped and reported; the
//!   others still contribute.
//! - If the store itself fails, the rebuild aborts and the previous view and
//!   state are kept.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    extract, Bounds, ExtractConfig, GpsPoint, LinePath, Result, Track, TrackDecoder, TrackError,
    TrackGeometry, TrackStore,
};

// ============================================================================
// Types
// ============================================================================

/// Per-track contribution to a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub id: String,
    pub line_paths: usize,
    pub point_samples: usize,
    /// Summed length of the track's line paths
    pub length_meters: f64,
}

/// Complete derived geometry of the currently stored tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateView {
    /// Every line path of every track. Order across tracks is unspecified.
    pub line_paths: Vec<LinePath>,
    /// Every sample of every track, in per-track contribution order.
    pub point_samples: Vec<GpsPoint>,
    /// Tracks that contributed to this view
    pub tracks: Vec<TrackSummary>,
}

impl AggregateView {
    /// True when the density layer has something to draw.
    pub fn has_density_data(&self) -> bool {
        !self.point_samples.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.line_paths.is_empty() && self.point_samples.is_empty()
    }

    /// Bounds of all line paths.
    pub fn bounds(&self) -> Option<Bounds> {
        self.line_paths
            .iter()
            .map(LinePath::bounds)
            .reduce(|a, b| a.merge(&b))
    }

    /// Summed length of every line path, in meters.
    pub fn total_length_meters(&self) -> f64 {
        self.tracks.iter().map(|t| t.length_meters).sum()
    }

    pub fn track_ids(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.id.as_str()).collect()
    }

    fn push_track(&mut self, id: &str, geometry: TrackGeometry) {
        self.tracks.push(TrackSummary {
            id: id.to_string(),
            line_paths: geometry.line_paths.len(),
            point_samples: geometry.point_samples.len(),
            length_meters: geometry.line_paths.iter().map(LinePath::length_meters).sum(),
        });
        self.line_paths.extend(geometry.line_paths);
        self.point_samples.extend(geometry.point_samples);
    }
}

/// Unsupported geometry dropped from a track under the `Warn` policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeometryWarning {
    pub track_id: String,
    pub geometry_type: String,
}

/// Outcome of one rebuild.
#[derive(Debug, Clone)]
pub struct RebuildReport {
    /// The view now installed in the engine
    pub view: Arc<AggregateView>,
    /// Tracks that were skipped, one error each
    pub failures: Vec<TrackError>,
    pub warnings: Vec<GeometryWarning>,
}

impl RebuildReport {
    /// True when every stored track contributed without warnings.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }
}

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// No rebuild has completed yet
    Empty,
    /// A rebuild is running
    Loading,
    /// The view reflects the store as of the last successful rebuild
    Ready,
}

// ============================================================================
// Engine
// ============================================================================

/// Owner and only writer of the current [`AggregateView`].
#[derive(Debug)]
pub struct AggregationEngine {
    state: EngineState,
    view: Arc<AggregateView>,
    config: ExtractConfig,
}

impl AggregationEngine {
    pub fn new(config: ExtractConfig) -> Self {
        Self {
            state: EngineState::Empty,
            view: Arc::new(AggregateView::default()),
            config,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The current view. Never partially rebuilt.
    pub fn view(&self) -> Arc<AggregateView> {
        Arc::clone(&self.view)
    }

    /// Install an empty view, e.g. after the store was cleared.
    pub fn reset(&mut self) {
        self.view = Arc::new(AggregateView::default());
        self.state = EngineState::Ready;
    }

    /// Rebuild the view from every track in `store`.
    pub fn rebuild(
        &mut self,
        store: &dyn TrackStore,
        decoder: &dyn TrackDecoder,
    ) -> Result<RebuildReport> {
        let previous = self.state;
        self.state = EngineState::Loading;

        let tracks = match store.get_all() {
            Ok(tracks) => tracks,
            Err(e) => {
                error!("[Aggregation] Rebuild aborted, keeping previous view: {}", e);
                self.state = previous;
                return Err(e);
            }
        };

        let outcomes = process_tracks(&tracks, decoder, &self.config);

        let mut view = AggregateView::default();
        let mut failures = Vec::new();
        let mut warnings = Vec::new();

        for (track, outcome) in tracks.iter().zip(outcomes) {
            match outcome {
                Ok(geometry) => {
                    for geometry_type in &geometry.unsupported {
                        warn!(
                            "[Aggregation] Track {} contains unsupported {} geometry, dropped",
                            track.id, geometry_type
                        );
                        warnings.push(GeometryWarning {
                            track_id: track.id.clone(),
                            geometry_type: geometry_type.clone(),
                        });
                    }
                    debug!(
                        "[Aggregation] Track {}: {} paths, {} samples",
                        track.id,
                        geometry.line_paths.len(),
                        geometry.point_samples.len()
                    );
                    view.push_track(&track.id, geometry);
                }
                Err(e) => {
                    warn!("[Aggregation] Skipping track {}: {}", track.id, e);
                    failures.push(e);
                }
            }
        }

        let view = Arc::new(view);
        self.view = Arc::clone(&view);
        self.state = EngineState::Ready;

        info!(
            "[Aggregation] Rebuilt view: {} tracks, {} paths, {} samples, {} skipped",
            view.tracks.len(),
            view.line_paths.len(),
            view.point_samples.len(),
            failures.len()
        );

        Ok(RebuildReport {
            view,
            failures,
            warnings,
        })
    }
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(ExtractConfig::default())
    }
}

/// Decode and extract one track.
fn process_track(
    track: &Track,
    decoder: &dyn TrackDecoder,
    config: &ExtractConfig,
) -> Result<TrackGeometry> {
    let collection = decoder.decode(&track.id, &track.data)?;
    extract(&collection, config).map_err(|e| TrackError::from_geometry(&track.id, e))
}

/// Process all tracks; output order matches input order.
#[cfg(feature = "parallel")]
fn process_tracks(
    tracks: &[Track],
    decoder: &dyn TrackDecoder,
    config: &ExtractConfig,
) -> Vec<Result<TrackGeometry>> {
    tracks
        .par_iter()
        .map(|track| process_track(track, decoder, config))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn process_tracks(
    tracks: &[Track],
    decoder: &dyn TrackDecoder,
    config: &ExtractConfig,
) -> Vec<Result<TrackGeometry>> {
    tracks
        .iter()
        .map(|track| process_track(track, decoder, config))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
