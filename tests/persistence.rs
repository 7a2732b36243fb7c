//! SQLite track store on disk.
//!
//! The large-batch test is `#[ignore]` by default. Run it with:
//!   `cargo test --test persistence -- --ignored --nocapture`

#![cfg(feature = "persistence")]

mod common;

use common::{gpx_upload, london_walk};
use rusqlite::Connection;
use tempfile::TempDir;
use trackheat::{MemorySink, Session, SqliteTrackStore, TrackError, TrackStore, ViewerConfig};

#[test]
fn test_tracks_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tracks.db");

    {
        let store = SqliteTrackStore::open(&path).unwrap();
        store
            .put_many(&[
                gpx_upload("a.gpx", &london_walk(3)),
                gpx_upload("b.gpx", &london_walk(2)),
            ])
            .unwrap();
    }

    let store = SqliteTrackStore::open(&path).unwrap();
    let tracks = store.get_all().unwrap();
    assert_eq!(store.len().unwrap(), 2);
    assert_eq!(tracks[0].id, "a.gpx");
    assert_eq!(tracks[0].data, gpx_upload("a.gpx", &london_walk(3)).data);
}

#[test]
fn test_overwrite_keeps_one_row() {
    let dir = TempDir::new().unwrap();
    let store = SqliteTrackStore::open(dir.path().join("tracks.db")).unwrap();

    store.put("ride.gpx", b"first").unwrap();
    store.put("ride.gpx", b"second").unwrap();

    let tracks = store.get_all().unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].data, b"second".to_vec());
}

#[test]
fn test_clear_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tracks.db");

    {
        let store = SqliteTrackStore::open(&path).unwrap();
        store.put("a.gpx", b"data").unwrap();
        store.clear().unwrap();
    }

    let store = SqliteTrackStore::open(&path).unwrap();
    assert!(store.is_empty().unwrap());
}

#[test]
fn test_old_schema_is_replaced() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tracks.db");

    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE tracks (id TEXT PRIMARY KEY, data TEXT);
             INSERT INTO tracks (id, data) VALUES ('legacy.gpx', 'x');
             PRAGMA user_version = 1;",
        )
        .unwrap();
    }

    let store = SqliteTrackStore::open(&path).unwrap();
    assert!(store.is_empty().unwrap());
    store.put("new.gpx", b"data").unwrap();
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn test_newer_schema_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tracks.db");

    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();
    }

    assert!(matches!(
        SqliteTrackStore::open(&path),
        Err(TrackError::StorageUnavailable { .. })
    ));
}

#[test]
fn test_unopenable_path_is_storage_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("tracks.db");

    assert!(matches!(
        SqliteTrackStore::open(&path),
        Err(TrackError::StorageUnavailable { .. })
    ));
}

#[test]
fn test_session_restores_view_after_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tracks.db");

    {
        let store = SqliteTrackStore::open(&path).unwrap();
        let session = Session::new(store, MemorySink::new(), ViewerConfig::default());
        session
            .upload(vec![gpx_upload("walk.gpx", &london_walk(6))])
            .unwrap();
    }

    let store = SqliteTrackStore::open(&path).unwrap();
    let session = Session::new(store, MemorySink::new(), ViewerConfig::default());
    session.refresh().unwrap();

    assert_eq!(session.view().point_samples.len(), 6);
    session.with_sink(|sink| assert_eq!(sink.line_paths().len(), 1));
}

#[test]
#[ignore]
fn test_large_upload_batch() {
    common::init_test_logging();
    let dir = TempDir::new().unwrap();
    let store = SqliteTrackStore::open(dir.path().join("tracks.db")).unwrap();
    let session = Session::new(store, MemorySink::new(), ViewerConfig::default());

    let tracks: Vec<_> = (0..500)
        .map(|i| gpx_upload(&format!("track-{:04}.gpx", i), &london_walk(200)))
        .collect();

    let start = std::time::Instant::now();
    session.upload(tracks).unwrap();
    println!("500 tracks stored and rebuilt in {:?}", start.elapsed());

    let view = session.view();
    assert_eq!(view.tracks.len(), 500);
    assert_eq!(view.point_samples.len(), 100_000);
    session.with_sink(|sink| {
        // Every walk overlaps, so the densest cell collects samples from all of them
        assert!(sink.density().unwrap().max_count() >= 500);
    });
}
