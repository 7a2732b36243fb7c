//! # SQLite Track Store
//!
//! Durable [`TrackStore`] backed by a single SQLite table keyed by track id.
//! Bytes are stored exactly as uploaded; nothing is re-encoded at rest.
//!
//! The schema version lives in `PRAGMA user_version`. Opening a database
//! written by an older schema drops and recreates the track table.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::{error, info};
use rusqlite::{params, Connection};

use crate::{Result, Track, TrackError, TrackStore};

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 2;

/// Track store persisted in SQLite.
pub struct SqliteTrackStore {
    db: Mutex<Connection>,
}

impl SqliteTrackStore {
    // ========================================================================
    // Initialization
    // ========================================================================

    /// Open (or create) a track database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Connection::open(path).map_err(|e| {
            error!("[TrackStore] Failed to open {}: {}", path.display(), e);
            TrackError::from(e)
        })?;
        Self::init_schema(&db)?;
        info!("[TrackStore] Opened {}", path.display());
        Ok(Self { db: Mutex::new(db) })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version > SCHEMA_VERSION {
            return Err(TrackError::storage(format!(
                "database schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            )));
        }

        if version < SCHEMA_VERSION {
            if version > 0 {
                info!(
                    "[TrackStore] Upgrading schema {} -> {}, dropping stored tracks",
                    version, SCHEMA_VERSION
                );
            }
            conn.execute_batch(&format!(
                r#"
                DROP TABLE IF EXISTS tracks;
                PRAGMA user_version = {};
                "#,
                SCHEMA_VERSION
            ))?;
        }

        conn.execute_batch(
            r#"
            -- Raw track files keyed by file name
            CREATE TABLE IF NOT EXISTS tracks (
                id TEXT PRIMARY KEY,
                data BLOB NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| TrackError::storage("database lock poisoned"))
    }
}

const UPSERT_SQL: &str = "INSERT INTO tracks (id, data, updated_at)
     VALUES (?1, ?2, strftime('%s', 'now'))
     ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at";

impl TrackStore for SqliteTrackStore {
    fn put(&self, id: &str, data: &[u8]) -> Result<()> {
        self.lock()?.execute(UPSERT_SQL, params![id, data])?;
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<Track>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, data FROM tracks ORDER BY id")?;
        let tracks = stmt
            .query_map([], |row| {
                Ok(Track {
                    id: row.get(0)?,
                    data: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn clear(&self) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM tracks", [])?;
        tx.commit()?;
        info!("[TrackStore] Cleared {} tracks", removed);
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn put_many(&self, tracks: &[Track]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for track in tracks {
                stmt.execute(params![track.id, track.data])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
