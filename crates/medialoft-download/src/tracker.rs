//! Per-asset state and progress projection.
//!
//! The tracker is the only place `DownloadState` values live. It is written
//! by the event bus (every published event passes through `apply`) and by
//! startup seeding; callers only read it. Reads take a short `std` read lock
//! and never wait on the scheduler task.
//!
//! Downloaded assets keep the path their record resolved to. Reads stat that
//! path, so an artifact removed behind the manager's back turns stale on the
//! next `state` or `downloaded` call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use medialoft_core::{AssetError, AssetEvent, AssetId, DownloadState};

#[derive(Default)]
struct Projection {
    states: HashMap<AssetId, DownloadState>,
    progress: HashMap<AssetId, f64>,
    /// Resolved artifact paths of downloaded assets.
    locations: HashMap<AssetId, PathBuf>,
    /// Assets whose location record no longer resolves, with the reason.
    stale: HashMap<AssetId, String>,
}

impl Projection {
    /// Downloaded assets whose artifact is no longer on disk, limited to
    /// `only` when given.
    fn vanished(&self, only: Option<&AssetId>) -> Vec<(AssetId, PathBuf)> {
        self.locations
            .iter()
            .filter(|(id, _)| only.is_none_or(|only| only == *id))
            .filter(|(_, path)| !path.exists())
            .map(|(id, path)| (id.clone(), path.clone()))
            .collect()
    }

    fn forget(&mut self, id: &AssetId) {
        self.states.remove(id);
        self.progress.remove(id);
        self.locations.remove(id);
    }
}

/// Authoritative in-memory state for every asset the manager has seen.
#[derive(Default)]
pub struct StateTracker {
    inner: RwLock<Projection>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Projection> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Projection> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an asset as downloaded without publishing anything.
    ///
    /// Used when loading location records at startup.
    pub fn seed_downloaded(&self, id: &AssetId, location: &Path) {
        let mut p = self.write();
        p.stale.remove(id);
        p.states.insert(id.clone(), DownloadState::Downloaded);
        p.progress.insert(id.clone(), 1.0);
        p.locations.insert(id.clone(), location.to_path_buf());
    }

    /// Remember where a completed download lives.
    ///
    /// Called before the `Downloaded` event is published.
    pub fn record_location(&self, id: &AssetId, location: &Path) {
        self.write()
            .locations
            .insert(id.clone(), location.to_path_buf());
    }

    /// Flag an asset's location record as unresolvable.
    ///
    /// Until the next state change, `state` reports the error instead of a
    /// state.
    pub fn mark_stale(&self, id: &AssetId, reason: impl Into<String>) {
        let mut p = self.write();
        p.forget(id);
        p.stale.insert(id.clone(), reason.into());
    }

    /// Mark downloaded assets whose artifact vanished as stale.
    fn sweep_vanished(&self, only: Option<&AssetId>) {
        let vanished = self.read().vanished(only);
        if vanished.is_empty() {
            return;
        }
        let mut p = self.write();
        for (id, path) in vanished {
            tracing::warn!(
                asset_id = %id,
                location = %path.display(),
                "Downloaded artifact vanished"
            );
            p.forget(&id);
            p.stale
                .insert(id, format!("artifact at {} no longer exists", path.display()));
        }
    }

    /// Fold a published event into the projection.
    pub fn apply(&self, event: &AssetEvent) {
        match event {
            AssetEvent::StateChanged { asset_id, state } => {
                let mut p = self.write();
                p.stale.remove(asset_id);
                p.states.insert(asset_id.clone(), *state);
                match state {
                    DownloadState::Downloaded => {
                        p.progress.insert(asset_id.clone(), 1.0);
                    }
                    DownloadState::NotDownloaded => {
                        p.progress.remove(asset_id);
                        p.locations.remove(asset_id);
                    }
                    DownloadState::Downloading => {
                        p.locations.remove(asset_id);
                    }
                }
            }
            AssetEvent::ProgressUpdated { asset_id, fraction } => {
                self.set_progress(asset_id, *fraction);
            }
            AssetEvent::TransferFailed { .. } | AssetEvent::RestorationCompleted => {}
        }
    }

    /// Update progress without an event (throttled samples).
    pub fn set_progress(&self, id: &AssetId, fraction: f64) {
        self.write()
            .progress
            .insert(id.clone(), fraction.clamp(0.0, 1.0));
    }

    /// Current state of an asset.
    pub fn state(&self, id: &AssetId) -> Result<DownloadState, AssetError> {
        self.sweep_vanished(Some(id));
        let p = self.read();
        if let Some(reason) = p.stale.get(id) {
            return Err(AssetError::stale(id, reason.clone()));
        }
        Ok(p.states.get(id).copied().unwrap_or_default())
    }

    /// Last known progress of an asset, `0.0` when unknown.
    pub fn progress(&self, id: &AssetId) -> f64 {
        self.read().progress.get(id).copied().unwrap_or(0.0)
    }

    /// Ids of every downloaded asset, sorted.
    pub fn downloaded(&self) -> Vec<AssetId> {
        self.sweep_vanished(None);
        let mut ids: Vec<_> = self
            .read()
            .states
            .iter()
            .filter(|(_, state)| **state == DownloadState::Downloaded)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AssetId {
        AssetId::new(s)
    }

    #[test]
    fn test_unknown_asset_is_not_downloaded() {
        let tracker = StateTracker::new();
        assert_eq!(tracker.state(&id("x")).unwrap(), DownloadState::NotDownloaded);
        assert!((tracker.progress(&id("x")) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_state_transitions_drive_progress() {
        let tracker = StateTracker::new();
        let a = id("a");

        tracker.apply(&AssetEvent::state_changed(a.clone(), DownloadState::Downloading));
        tracker.apply(&AssetEvent::progress(a.clone(), 0.4));
        assert_eq!(tracker.state(&a).unwrap(), DownloadState::Downloading);
        assert!((tracker.progress(&a) - 0.4).abs() < f64::EPSILON);

        tracker.apply(&AssetEvent::state_changed(a.clone(), DownloadState::NotDownloaded));
        assert!((tracker.progress(&a) - 0.0).abs() < f64::EPSILON);

        tracker.apply(&AssetEvent::state_changed(a.clone(), DownloadState::Downloaded));
        assert!((tracker.progress(&a) - 1.0).abs() < f64::EPSILON);
        assert_eq!(tracker.downloaded(), vec![a]);
    }

    #[test]
    fn test_stale_reports_error_until_state_changes() {
        let tracker = StateTracker::new();
        let a = id("a");
        let dir = tempfile::tempdir().unwrap();
        tracker.seed_downloaded(&a, dir.path());
        tracker.mark_stale(&a, "no Directory artifact at /gone");

        let err = tracker.state(&a).unwrap_err();
        assert!(err.is_stale());
        assert!(tracker.downloaded().is_empty());

        tracker.apply(&AssetEvent::state_changed(a.clone(), DownloadState::NotDownloaded));
        assert_eq!(tracker.state(&a).unwrap(), DownloadState::NotDownloaded);
    }

    #[test]
    fn test_downloaded_is_sorted() {
        let tracker = StateTracker::new();
        let dir = tempfile::tempdir().unwrap();
        tracker.seed_downloaded(&id("b"), dir.path());
        tracker.seed_downloaded(&id("a"), dir.path());
        tracker.apply(&AssetEvent::state_changed(id("c"), DownloadState::Downloading));

        assert_eq!(tracker.downloaded(), vec![id("a"), id("b")]);
    }

    #[test]
    fn test_vanished_artifact_turns_stale_on_read() {
        let tracker = StateTracker::new();
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.movpkg");
        let gone = dir.path().join("gone.movpkg");
        std::fs::create_dir(&kept).unwrap();
        std::fs::create_dir(&gone).unwrap();
        tracker.seed_downloaded(&id("kept"), &kept);
        tracker.seed_downloaded(&id("gone"), &gone);

        std::fs::remove_dir(&gone).unwrap();

        assert_eq!(tracker.downloaded(), vec![id("kept")]);
        assert!(tracker.state(&id("gone")).unwrap_err().is_stale());
        assert_eq!(tracker.state(&id("kept")).unwrap(), DownloadState::Downloaded);
    }

    #[test]
    fn test_recorded_location_is_checked_by_state() {
        let tracker = StateTracker::new();
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("a.movpkg");
        std::fs::create_dir(&bundle).unwrap();
        let a = id("a");

        tracker.record_location(&a, &bundle);
        tracker.apply(&AssetEvent::state_changed(a.clone(), DownloadState::Downloaded));
        assert_eq!(tracker.state(&a).unwrap(), DownloadState::Downloaded);

        std::fs::remove_dir(&bundle).unwrap();
        assert!(tracker.state(&a).unwrap_err().is_stale());
    }
}
