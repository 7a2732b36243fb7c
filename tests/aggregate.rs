//! Rebuilds over a whole store: idempotence, partial failure, overwrite and clear.

mod common;

use common::{geojson_upload, gpx_upload, london_walk};
use trackheat::{
    AggregateView, AggregationEngine, AutoDecoder, EngineState, ExtractConfig, GpsPoint,
    MemoryTrackStore, TrackError, TrackStore, UnsupportedGeometryPolicy,
};

fn sorted_samples(view: &AggregateView) -> Vec<(u64, u64)> {
    let mut samples: Vec<(u64, u64)> = view
        .point_samples
        .iter()
        .map(|p: &GpsPoint| (p.latitude.to_bits(), p.longitude.to_bits()))
        .collect();
    samples.sort_unstable();
    samples
}

fn sorted_paths(view: &AggregateView) -> Vec<Vec<(u64, u64)>> {
    let mut paths: Vec<Vec<(u64, u64)>> = view
        .line_paths
        .iter()
        .map(|path| {
            path.points()
                .iter()
                .map(|p| (p.latitude.to_bits(), p.longitude.to_bits()))
                .collect()
        })
        .collect();
    paths.sort();
    paths
}

fn store_with(tracks: &[trackheat::Track]) -> MemoryTrackStore {
    let store = MemoryTrackStore::new();
    store.put_many(tracks).unwrap();
    store
}

#[test]
fn test_rebuild_is_idempotent() {
    let store = store_with(&[
        gpx_upload("a.gpx", &london_walk(4)),
        gpx_upload("b.gpx", &[(2.35, 48.85), (2.36, 48.86)]),
        geojson_upload(
            "c.geojson",
            r#"{"type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]], [[2, 2], [3, 3]]]}"#,
        ),
    ]);

    let mut engine = AggregationEngine::default();
    let first = engine.rebuild(&store, &AutoDecoder::new()).unwrap().view;
    let second = engine.rebuild(&store, &AutoDecoder::new()).unwrap().view;

    assert_eq!(first.line_paths.len(), 4);
    assert_eq!(first.point_samples.len(), 10);
    assert_eq!(sorted_paths(&first), sorted_paths(&second));
    assert_eq!(sorted_samples(&first), sorted_samples(&second));
}

#[test]
fn test_undecodable_track_is_skipped() {
    let store = store_with(&[
        gpx_upload("1.gpx", &[(0.0, 0.0), (1.0, 1.0)]),
        trackheat::Track::new("2.gpx", b"<gpx><trk><trkseg><trkpt lat=".to_vec()),
        gpx_upload("3.gpx", &[(5.0, 5.0), (6.0, 6.0), (7.0, 7.0)]),
    ]);

    let mut engine = AggregationEngine::default();
    let report = engine.rebuild(&store, &AutoDecoder::new()).unwrap();

    assert_eq!(report.view.line_paths.len(), 2);
    assert_eq!(report.view.point_samples.len(), 5);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        TrackError::DecodeFailure { track_id, .. } if track_id == "2.gpx"
    ));

    let mut ids = report.view.track_ids();
    ids.sort_unstable();
    assert_eq!(ids, vec!["1.gpx", "3.gpx"]);
}

#[test]
fn test_malformed_track_is_skipped() {
    let store = store_with(&[
        gpx_upload("1.gpx", &[(0.0, 0.0), (1.0, 1.0)]),
        geojson_upload(
            "2.geojson",
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {}, "geometry": null}
            ]}"#,
        ),
        gpx_upload("3.gpx", &[(5.0, 5.0), (6.0, 6.0), (7.0, 7.0)]),
    ]);

    let mut engine = AggregationEngine::default();
    let report = engine.rebuild(&store, &AutoDecoder::new()).unwrap();

    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(report.view.line_paths.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].track_id(), Some("2.geojson"));
    assert!(matches!(report.failures[0], TrackError::MalformedGeometry { .. }));
}

#[test]
fn test_rejected_geometry_fails_only_that_track() {
    let config = ExtractConfig {
        unsupported_geometry: UnsupportedGeometryPolicy::Reject,
    };
    let store = store_with(&[
        gpx_upload("1.gpx", &[(0.0, 0.0), (1.0, 1.0)]),
        geojson_upload(
            "area.geojson",
            r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#,
        ),
    ]);

    let mut engine = AggregationEngine::new(config);
    let report = engine.rebuild(&store, &AutoDecoder::new()).unwrap();

    assert_eq!(report.view.tracks.len(), 1);
    assert!(matches!(
        &report.failures[..],
        [TrackError::UnsupportedGeometry { geometry_type, .. }] if geometry_type == "Polygon"
    ));
}

#[test]
fn test_warned_geometry_is_reported() {
    let config = ExtractConfig {
        unsupported_geometry: UnsupportedGeometryPolicy::Warn,
    };
    let store = store_with(&[geojson_upload(
        "mixed.geojson",
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiPoint", "coordinates": [[0, 0], [1, 1]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}
        ]}"#,
    )]);

    let mut engine = AggregationEngine::new(config);
    let report = engine.rebuild(&store, &AutoDecoder::new()).unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].track_id, "mixed.geojson");
    assert_eq!(report.warnings[0].geometry_type, "MultiPoint");
    assert_eq!(report.view.line_paths.len(), 1);
}

#[test]
fn test_overwrite_replaces_contribution() {
    let store = store_with(&[gpx_upload("ride.gpx", &[(0.0, 0.0), (1.0, 1.0)])]);
    store
        .put_many(&[gpx_upload("ride.gpx", &[(10.0, 10.0), (11.0, 11.0), (12.0, 12.0)])])
        .unwrap();

    let mut engine = AggregationEngine::default();
    let view = engine.rebuild(&store, &AutoDecoder::new()).unwrap().view;

    assert_eq!(view.tracks.len(), 1);
    assert_eq!(view.line_paths.len(), 1);
    assert_eq!(view.point_samples.len(), 3);
    assert!(view.point_samples.iter().all(|p| p.latitude >= 10.0));
}

#[test]
fn test_rebuild_after_clear_is_empty() {
    let store = store_with(&[gpx_upload("a.gpx", &london_walk(3))]);

    let mut engine = AggregationEngine::default();
    assert!(!engine.rebuild(&store, &AutoDecoder::new()).unwrap().view.is_empty());

    store.clear().unwrap();
    let report = engine.rebuild(&store, &AutoDecoder::new()).unwrap();

    assert!(report.view.is_empty());
    assert!(!report.view.has_density_data());
    assert!(report.view.bounds().is_none());
}

#[test]
fn test_point_only_track_contributes_nothing() {
    let store = store_with(&[geojson_upload(
        "cafe.geojson",
        r#"{"type": "Point", "coordinates": [10, 10]}"#,
    )]);

    let mut engine = AggregationEngine::default();
    let report = engine.rebuild(&store, &AutoDecoder::new()).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.view.tracks.len(), 1);
    assert!(report.view.is_empty());
}
