//! Unified error handling for the trackheat library.
//!
//! Errors fall in two scopes. Per-track failures (malformed geometry,
//! undecodable bytes, rejected geometry types) are local: a rebuild reports
//! them and continues with the other tracks. Store and configuration
//! failures are global: the triggering operation is aborted.

use thiserror::Error;

/// Unified error type for trackheat operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    /// Decoded content of a track has unexpected structure
    #[error("track '{track_id}' has malformed geometry: {message}")]
    MalformedGeometry { track_id: String, message: String },

    /// Raw bytes of a track could not be parsed as a track file
    #[error("track '{track_id}' could not be decoded: {message}")]
    DecodeFailure { track_id: String, message: String },

    /// Track contains a geometry type rejected by the extraction policy
    #[error("track '{track_id}' contains unsupported geometry type {geometry_type}")]
    UnsupportedGeometry {
        track_id: String,
        geometry_type: String,
    },

    /// Track store cannot be read or written
    #[error("track storage unavailable: {message}")]
    StorageUnavailable { message: String },

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {message}")]
    Config { message: String },

    /// An input track file could not be read
    #[error("cannot read '{path}': {message}")]
    Input { path: String, message: String },
}

impl TrackError {
    /// Lift an extractor error into a per-track error.
    pub fn from_geometry(track_id: &str, err: GeometryError) -> Self {
        match err {
            GeometryError::Unsupported { geometry_type, .. } => TrackError::UnsupportedGeometry {
                track_id: track_id.to_string(),
                geometry_type,
            },
            other => TrackError::MalformedGeometry {
                track_id: track_id.to_string(),
                message: other.to_string(),
            },
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        TrackError::StorageUnavailable {
            message: message.into(),
        }
    }

    pub fn input(path: impl Into<String>, message: impl Into<String>) -> Self {
        TrackError::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn decode(track_id: &str, message: impl Into<String>) -> Self {
        TrackError::DecodeFailure {
            track_id: track_id.to_string(),
            message: message.into(),
        }
    }

    /// True for failures that only affect one track (skip-and-continue).
    pub fn is_track_local(&self) -> bool {
        matches!(
            self,
            TrackError::MalformedGeometry { .. }
                | TrackError::DecodeFailure { .. }
                | TrackError::UnsupportedGeometry { .. }
        )
    }

    /// The offending track id for per-track failures.
    pub fn track_id(&self) -> Option<&str> {
        match self {
            TrackError::MalformedGeometry { track_id, .. }
            | TrackError::DecodeFailure { track_id, .. }
            | TrackError::UnsupportedGeometry { track_id, .. } => Some(track_id),
            TrackError::StorageUnavailable { .. }
            | TrackError::Config { .. }
            | TrackError::Input { .. } => None,
        }
    }
}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for TrackError {
    fn from(err: rusqlite::Error) -> Self {
        TrackError::storage(err.to_string())
    }
}

/// Structural problem found by the geometry extractor.
///
/// Carries the index of the offending feature but no track id;
/// see [`TrackError::from_geometry`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("feature {feature_index} has no geometry")]
    MissingGeometry { feature_index: usize },

    #[error("feature {feature_index} has a position with {arity} value(s), expected at least 2")]
    InvalidPosition { feature_index: usize, arity: usize },

    #[error("feature {feature_index} has out-of-range coordinate ({latitude}, {longitude})")]
    OutOfRange {
        feature_index: usize,
        latitude: f64,
        longitude: f64,
    },

    #[error("feature {feature_index} has unsupported geometry type {geometry_type}")]
    Unsupported {
        feature_index: usize,
        geometry_type: String,
    },
}

/// Result type alias for trackheat operations.
pub type Result<T> = std::result::Result<T, TrackError>;
