//! Shared fixtures for integration tests.

#![allow(dead_code)]

use trackheat::Track;

/// Route log output through the test harness.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// GPX file with one track made of the given segments of (lon, lat) pairs.
pub fn gpx_track(name: &str, segments: &[&[(f64, f64)]]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<gpx version=\"1.1\" creator=\"trackheat-tests\">\n");
    out.push_str(&format!("  <trk>\n    <name>{}</name>\n", name));
    for segment in segments {
        out.push_str("    <trkseg>\n");
        for (lon, lat) in segment.iter() {
            out.push_str(&format!("      <trkpt lat=\"{}\" lon=\"{}\"></trkpt>\n", lat, lon));
        }
        out.push_str("    </trkseg>\n");
    }
    out.push_str("  </trk>\n</gpx>\n");
    out
}

/// GPX upload with a single-segment track.
pub fn gpx_upload(id: &str, points: &[(f64, f64)]) -> Track {
    Track::new(id, gpx_track(id, &[points]).into_bytes())
}

/// GeoJSON upload from a raw feature collection body.
pub fn geojson_upload(id: &str, json: &str) -> Track {
    Track::new(id, json.as_bytes().to_vec())
}

/// Points walking north from London, roughly 100m apart.
pub fn london_walk(n: usize) -> Vec<(f64, f64)> {
    (0..n).map(|i| (-0.1278, 51.5074 + i as f64 * 0.001)).collect()
}
