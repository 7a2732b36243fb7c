//! Track storage.
//!
//! A track store is a durable mapping from track id (the source file name)
//! to the raw, unvalidated bytes of the uploaded file. Writing an existing
//! id replaces its bytes. Tracks are only ever removed all at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::{Result, TrackError};

/// One stored track file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Unique id, equal to the source file name
    pub id: String,
    /// Original file bytes, unchanged
    pub data: Vec<u8>,
}

impl Track {
    pub fn new(id: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Durable key-value store of raw track files.
///
/// Every method may fail with [`TrackError::StorageUnavailable`].
pub trait TrackStore: Send + Sync {
    /// Insert or replace a track.
    fn put(&self, id: &str, data: &[u8]) -> Result<()>;

    /// Every stored track, in no particular order.
    fn get_all(&self) -> Result<Vec<Track>>;

    /// Remove every track. No partially cleared state is observable.
    fn clear(&self) -> Result<()>;

    /// Number of stored tracks.
    fn len(&self) -> Result<usize> {
        Ok(self.get_all()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Store an upload batch.
    ///
    /// The default writes tracks one after another; implementations with
    /// transactions store the whole batch or nothing.
    fn put_many(&self, tracks: &[Track]) -> Result<()> {
        for track in tracks {
            self.put(&track.id, &track.data)?;
        }
        Ok(())
    }
}

/// In-memory track store.
///
/// Can be switched unavailable to exercise storage failure paths.
#[derive(Debug, Default)]
pub struct MemoryTrackStore {
    tracks: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate quota exhaustion or disabled storage.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TrackError::storage("memory store disabled"));
        }
        self.tracks
            .lock()
            .map_err(|_| TrackError::storage("memory store lock poisoned"))
    }
}

impl TrackStore for MemoryTrackStore {
    fn put(&self, id: &str, data: &[u8]) -> Result<()> {
        self.lock()?.insert(id.to_string(), data.to_vec());
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<Track>> {
        Ok(self
            .lock()?
            .iter()
            .map(|(id, data)| Track::new(id.clone(), data.clone()))
            .collect())
    }

    fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn put_many(&self, tracks: &[Track]) -> Result<()> {
        // One lock for the whole batch
        let mut guard = self.lock()?;
        for track in tracks {
            guard.insert(track.id.clone(), track.data.clone());
        }
        Ok(())
    }
}
