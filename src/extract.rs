//! Geometry extraction.
//!
//! Converts one decoded feature collection into line paths (drawn as the
//! track layer) and point samples (fed to the density layer). Positions
//! arrive as `[lon, lat, ..]` and leave as [`GpsPoint`] in lat/lon order.
//!
//! - `Point` features are waypoints, not trail geometry: always dropped.
//! - `LineString` becomes one path; its positions are also samples.
//! - `MultiLineString` becomes one path per member line.
//! - Anything else is handled by [`UnsupportedGeometryPolicy`].

use geojson::{FeatureCollection, Value};

use crate::{ExtractConfig, GeometryError, GpsPoint, LinePath, UnsupportedGeometryPolicy};

/// Geometry extracted from one track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackGeometry {
    pub line_paths: Vec<LinePath>,
    pub point_samples: Vec<GpsPoint>,
    /// Geometry types dropped under [`UnsupportedGeometryPolicy::Warn`]
    pub unsupported: Vec<String>,
}

/// Extract line paths and point samples from a feature collection.
///
/// Pure: no logging, no side effects. Fails on the first structurally
/// invalid feature.
pub fn extract(
    collection: &FeatureCollection,
    config: &ExtractConfig,
) -> Result<TrackGeometry, GeometryError> {
    let mut out = TrackGeometry::default();

    for (feature_index, feature) in collection.features.iter().enumerate() {
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or(GeometryError::MissingGeometry { feature_index })?;

        match &geometry.value {
            Value::Point(_) => {}
            Value::LineString(line) => {
                push_line(&mut out, line, feature_index)?;
            }
            Value::MultiLineString(lines) => {
                for line in lines {
                    push_line(&mut out, line, feature_index)?;
                }
            }
            other => {
                let geometry_type = geometry_type_name(other);
                match config.unsupported_geometry {
                    UnsupportedGeometryPolicy::Ignore => {}
                    UnsupportedGeometryPolicy::Warn => {
                        out.unsupported.push(geometry_type.to_string())
                    }
                    UnsupportedGeometryPolicy::Reject => {
                        return Err(GeometryError::Unsupported {
                            feature_index,
                            geometry_type: geometry_type.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(out)
}

fn push_line(
    out: &mut TrackGeometry,
    line: &[Vec<f64>],
    feature_index: usize,
) -> Result<(), GeometryError> {
    let points = line
        .iter()
        .map(|position| to_point(position, feature_index))
        .collect::<Result<Vec<_>, _>>()?;

    // An empty line draws nothing and contributes nothing
    if let Some(path) = LinePath::new(points) {
        out.point_samples.extend_from_slice(path.points());
        out.line_paths.push(path);
    }
    Ok(())
}

fn to_point(position: &[f64], feature_index: usize) -> Result<GpsPoint, GeometryError> {
    match position {
        [lon, lat, ..] => {
            let point = GpsPoint::new(*lat, *lon);
            if point.is_valid() {
                Ok(point)
            } else {
                Err(GeometryError::OutOfRange {
                    feature_index,
                    latitude: *lat,
                    longitude: *lon,
                })
            }
        }
        _ => Err(GeometryError::InvalidPosition {
            feature_index,
            arity: position.len(),
        }),
    }
}

fn geometry_type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}
