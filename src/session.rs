//! # Session
//!
//! Explicit context object owning the track store, decoder, aggregation
//! engine and render sink. Whatever drives the UI event loop holds one
//! session and calls [`Session::upload`], [`Session::clear`] and
//! [`Session::refresh`] on it.
//!
//! ## Rebuild serialization
//!
//! Only one rebuild runs at a time. A rebuild requested while another is in
//! flight is coalesced: the caller gets [`RebuildStatus::Coalesced`] and the
//! running rebuild loops exactly once more over the then-current store
//! contents before returning, even when the rebuild it was running failed.
//! The caller sees an error only if the last rebuild it ran failed. The sink
//! only ever receives complete views.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};

use crate::{
    AggregateView, AggregationEngine, AutoDecoder, EngineState, RebuildReport, RenderSink, Result,
    Track, TrackDecoder, TrackStore, ViewerConfig,
};

/// Outcome of a rebuild request.
#[derive(Debug, Clone)]
pub enum RebuildStatus {
    /// This call ran the rebuild(s); report of the last one
    Completed(RebuildReport),
    /// A rebuild was already running and will pick this request up
    Coalesced,
    /// Nothing changed, no rebuild was needed
    Unchanged,
}

impl RebuildStatus {
    pub fn report(&self) -> Option<&RebuildReport> {
        match self {
            RebuildStatus::Completed(report) => Some(report),
            RebuildStatus::Coalesced | RebuildStatus::Unchanged => None,
        }
    }
}

pub struct Session<S: TrackStore, K: RenderSink> {
    store: S,
    decoder: Box<dyn TrackDecoder>,
    engine: Mutex<AggregationEngine>,
    sink: Mutex<K>,
    config: ViewerConfig,
    rebuild_in_progress: AtomicBool,
    rebuild_pending: AtomicBool,
}

impl<S: TrackStore, K: RenderSink> Session<S, K> {
    /// Create a session decoding tracks with [`AutoDecoder`].
    pub fn new(store: S, sink: K, config: ViewerConfig) -> Self {
        Self::with_decoder(store, sink, config, AutoDecoder::new())
    }

    pub fn with_decoder(
        store: S,
        sink: K,
        config: ViewerConfig,
        decoder: impl TrackDecoder + 'static,
    ) -> Self {
        Self {
            store,
            decoder: Box::new(decoder),
            engine: Mutex::new(AggregationEngine::new(config.extract.clone())),
            sink: Mutex::new(sink),
            config,
            rebuild_in_progress: AtomicBool::new(false),
            rebuild_pending: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Store uploaded files, then rebuild and fit the view.
    ///
    /// If storing fails nothing is rebuilt and the current view is kept.
    pub fn upload(&self, files: Vec<Track>) -> Result<RebuildStatus> {
        if files.is_empty() {
            return Ok(RebuildStatus::Unchanged);
        }

        self.store.put_many(&files)?;
        info!("[Session] Stored {} uploaded tracks", files.len());

        self.request_rebuild()
    }

    /// Rebuild from the store as it is now (e.g. at startup).
    pub fn refresh(&self) -> Result<RebuildStatus> {
        self.request_rebuild()
    }

    /// Empty the store, reset the view and remove every rendered layer.
    ///
    /// On storage failure the view and sink are left untouched.
    pub fn clear(&self) -> Result<()> {
        // Holding the engine excludes a concurrent rebuild from installing
        // geometry read before the clear
        let mut engine = self.engine();
        self.store.clear()?;
        engine.reset();
        self.sink().clear_layers();
        info!("[Session] Cleared all tracks");
        Ok(())
    }

    /// Run a rebuild unless one is already running.
    pub fn request_rebuild(&self) -> Result<RebuildStatus> {
        self.rebuild_pending.store(true, Ordering::SeqCst);
        if self.rebuild_in_progress.swap(true, Ordering::SeqCst) {
            return Ok(RebuildStatus::Coalesced);
        }

        // Outcome of the most recent rebuild. A failed rebuild does not end
        // the loop: requests coalesced into this call still get their run.
        let mut last = None;
        loop {
            while self.rebuild_pending.swap(false, Ordering::SeqCst) {
                let outcome = self.rebuild_and_apply();
                if let Err(e) = &outcome {
                    warn!("[Session] Rebuild failed, view unchanged: {}", e);
                }
                last = Some(outcome);
            }
            self.rebuild_in_progress.store(false, Ordering::SeqCst);

            // A request may have landed between the last check and the
            // release; take it unless another caller already did
            if !self.rebuild_pending.load(Ordering::SeqCst)
                || self.rebuild_in_progress.swap(true, Ordering::SeqCst)
            {
                break;
            }
        }

        match last {
            Some(Ok(report)) => Ok(RebuildStatus::Completed(report)),
            Some(Err(e)) => Err(e),
            None => Ok(RebuildStatus::Coalesced),
        }
    }

    /// One full rebuild followed by one complete redraw.
    fn rebuild_and_apply(&self) -> Result<RebuildReport> {
        let mut engine = self.engine();
        let report = engine.rebuild(&self.store, &*self.decoder)?;

        for failure in &report.failures {
            warn!("[Session] Track not shown: {}", failure);
        }

        let mut sink = self.sink();
        sink.replace_line_paths(&report.view.line_paths);
        if report.view.has_density_data() {
            sink.replace_density(&report.view.point_samples, &self.config.heatmap);
        } else {
            sink.clear_density();
        }
        sink.fit_to_visible(&self.config.view);

        Ok(report)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn view(&self) -> Arc<AggregateView> {
        self.engine().view()
    }

    pub fn state(&self) -> EngineState {
        self.engine().state()
    }

    pub fn with_sink<R>(&self, f: impl FnOnce(&K) -> R) -> R {
        let sink = self.sink();
        f(&*sink)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    fn engine(&self) -> MutexGuard<'_, AggregationEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sink(&self) -> MutexGuard<'_, K> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySink, MemoryTrackStore};

    fn line(id: &str, coords: &str) -> Track {
        Track::new(
            id,
            format!(r#"{{"type": "LineString", "coordinates": {}}}"#, coords).into_bytes(),
        )
    }

    fn session() -> Session<MemoryTrackStore, MemorySink> {
        Session::new(MemoryTrackStore::new(), MemorySink::new(), ViewerConfig::default())
    }

    #[test]
    fn test_empty_upload_is_noop() {
        let session = session();
        assert!(matches!(session.upload(Vec::new()).unwrap(), RebuildStatus::Unchanged));
        assert_eq!(session.state(), EngineState::Empty);
    }

    #[test]
    fn test_pending_request_runs_once_more() {
        let session = session();
        session
            .store()
            .put("a.geojson", br#"{"type": "LineString", "coordinates": [[0, 0]]}"#)
            .unwrap();

        // Simulate a request arriving while a rebuild is in flight
        session.rebuild_in_progress.store(true, Ordering::SeqCst);
        assert!(matches!(session.request_rebuild().unwrap(), RebuildStatus::Coalesced));
        assert!(session.rebuild_pending.load(Ordering::SeqCst));
        assert_eq!(session.state(), EngineState::Empty);

        // The in-flight rebuild finishes and releases the flag
        session.rebuild_in_progress.store(false, Ordering::SeqCst);
        let status = session.request_rebuild().unwrap();
        assert_eq!(status.report().unwrap().view.line_paths.len(), 1);
        assert!(!session.rebuild_pending.load(Ordering::SeqCst));
        assert!(!session.rebuild_in_progress.load(Ordering::SeqCst));
    }

    #[test]
    fn test_upload_storage_failure_keeps_view() {
        let session = session();
        session.upload(vec![line("a.geojson", "[[0, 0], [1, 1]]")]).unwrap();
        let before = session.view();

        session.store().set_available(false);
        assert!(session.upload(vec![line("b.geojson", "[[5, 5]]")]).is_err());

        assert!(Arc::ptr_eq(&before, &session.view()));
        session.with_sink(|sink| assert_eq!(sink.line_paths().len(), 1));
    }

    #[test]
    fn test_clear_storage_failure_keeps_layers() {
        let session = session();
        session.upload(vec![line("a.geojson", "[[0, 0], [1, 1]]")]).unwrap();

        session.store().set_available(false);
        assert!(session.clear().is_err());

        assert_eq!(session.view().line_paths.len(), 1);
        session.with_sink(|sink| assert!(!sink.is_blank()));
    }
}
