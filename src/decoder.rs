//! Track file decoders.
//!
//! A decoder turns the raw bytes of one stored track into a GeoJSON feature
//! collection with `[lon, lat]` (or `[lon, lat, ele]`) positions. Decoding is
//! deferred until aggregation: the store accepts any bytes.

use std::io::Cursor;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use log::debug;

use crate::{Result, TrackError};

/// Converts raw track bytes into a feature collection.
pub trait TrackDecoder: Send + Sync {
    fn decode(&self, track_id: &str, data: &[u8]) -> Result<FeatureCollection>;
}

// ============================================================================
// GPX
// ============================================================================

/// GPX 1.0/1.1 decoder.
///
/// Each `<trk>` becomes one feature: a `LineString` when it has one
/// non-empty segment, a `MultiLineString` when it has several. Each `<rte>`
/// becomes a `LineString` and each `<wpt>` a `Point`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpxDecoder;

impl TrackDecoder for GpxDecoder {
    fn decode(&self, track_id: &str, data: &[u8]) -> Result<FeatureCollection> {
        let gpx = gpx::read(Cursor::new(data))
            .map_err(|e| TrackError::decode(track_id, e.to_string()))?;

        let mut features =
            Vec::with_capacity(gpx.tracks.len() + gpx.routes.len() + gpx.waypoints.len());

        for track in &gpx.tracks {
            let mut lines: Vec<Vec<Vec<f64>>> = track
                .segments
                .iter()
                .map(|segment| segment.points.iter().map(position).collect::<Vec<_>>())
                .filter(|line: &Vec<Vec<f64>>| !line.is_empty())
                .collect();

            let value = match lines.len() {
                0 => continue,
                1 => Value::LineString(lines.remove(0)),
                _ => Value::MultiLineString(lines),
            };
            features.push(feature(value, "trk", track.name.as_deref(), track.type_.as_deref()));
        }

        for route in &gpx.routes {
            if route.points.is_empty() {
                continue;
            }
            let line = route.points.iter().map(position).collect();
            features.push(feature(
                Value::LineString(line),
                "rte",
                route.name.as_deref(),
                route.type_.as_deref(),
            ));
        }

        for waypoint in &gpx.waypoints {
            features.push(feature(
                Value::Point(position(waypoint)),
                "wpt",
                waypoint.name.as_deref(),
                waypoint.type_.as_deref(),
            ));
        }

        debug!(
            "[Decoder] {}: {} tracks, {} routes, {} waypoints",
            track_id,
            gpx.tracks.len(),
            gpx.routes.len(),
            gpx.waypoints.len()
        );

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}

fn position(waypoint: &gpx::Waypoint) -> Vec<f64> {
    let point = waypoint.point();
    match waypoint.elevation {
        Some(ele) => vec![point.x(), point.y(), ele],
        None => vec![point.x(), point.y()],
    }
}

fn feature(value: Value, gpx_type: &str, name: Option<&str>, kind: Option<&str>) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("_gpxType".to_string(), JsonValue::from(gpx_type));
    if let Some(name) = name {
        properties.insert("name".to_string(), JsonValue::from(name));
    }
    if let Some(kind) = kind {
        properties.insert("type".to_string(), JsonValue::from(kind));
    }
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

// ============================================================================
// GeoJSON
// ============================================================================

/// Decoder for tracks uploaded as GeoJSON.
///
/// A bare feature or geometry is wrapped into a one-feature collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonDecoder;

impl TrackDecoder for GeoJsonDecoder {
    fn decode(&self, track_id: &str, data: &[u8]) -> Result<FeatureCollection> {
        let text =
            std::str::from_utf8(data).map_err(|e| TrackError::decode(track_id, e.to_string()))?;
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| TrackError::decode(track_id, e.to_string()))?;

        let features = match geojson {
            GeoJson::FeatureCollection(collection) => return Ok(collection),
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(geometry) => vec![Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }],
        };
        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}

// ============================================================================
// Format dispatch
// ============================================================================

/// Picks a decoder from the track id's file extension.
///
/// `.gpx` is GPX, `.geojson` and `.json` are GeoJSON. Anything else is
/// sniffed: content starting with `{` is GeoJSON, the rest is GPX.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoDecoder {
    gpx: GpxDecoder,
    geojson: GeoJsonDecoder,
}

impl AutoDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn looks_like_json(data: &[u8]) -> bool {
        data.iter()
            .find(|b| !b.is_ascii_whitespace())
            .map_or(false, |&b| b == b'{')
    }
}

impl TrackDecoder for AutoDecoder {
    fn decode(&self, track_id: &str, data: &[u8]) -> Result<FeatureCollection> {
        let extension = track_id
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("gpx") => self.gpx.decode(track_id, data),
            Some("geojson") | Some("json") => self.geojson.decode(track_id, data),
            _ if Self::looks_like_json(data) => self.geojson.decode(track_id, data),
            _ => self.gpx.decode(track_id, data),
        }
    }
}
