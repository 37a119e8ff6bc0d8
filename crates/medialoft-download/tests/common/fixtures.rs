//! Fixtures: assets, artifacts on disk, and a ready-to-use manager.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use medialoft_db::{SqliteLocationRepository, setup_test_database};
use medialoft_download::{
    Asset, AssetEvent, AssetManager, AssetManagerConfig, AssetManagerPort, DownloadState,
    EventSubscription, NoopAssetEmitter,
};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use super::transport::ScriptedTransport;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn asset(id: &str) -> Asset {
    Asset::new(id, format!("https://cdn.example.com/{id}/master.m3u8"))
}

pub fn state(id: &str, state: DownloadState) -> AssetEvent {
    AssetEvent::state_changed(id, state)
}

/// Create a directory bundle the way an HLS transport leaves one.
pub fn write_bundle(root: &Path, name: &str) -> PathBuf {
    let bundle = root.join(name);
    std::fs::create_dir_all(bundle.join("segments")).unwrap();
    std::fs::write(bundle.join("master.m3u8"), "#EXTM3U\n").unwrap();
    std::fs::write(bundle.join("segments").join("0.ts"), b"\x47\x40\x00").unwrap();
    bundle
}

/// Wait until the scheduler has handled everything sent before this call.
///
/// Transport callbacks take priority over commands in the scheduler, so one
/// round trip is enough.
pub async fn settle(manager: &AssetManager) {
    manager.queue_snapshot().await.unwrap();
}

pub struct Harness {
    pub manager: Arc<AssetManager>,
    pub transport: Arc<ScriptedTransport>,
    pub events: EventSubscription,
    pub downloads: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(|c| c).await
    }

    pub async fn with_config(
        tweak: impl FnOnce(AssetManagerConfig) -> AssetManagerConfig,
    ) -> Self {
        Self::with_transport(ScriptedTransport::new(), tweak).await
    }

    pub async fn with_transport(
        transport: Arc<ScriptedTransport>,
        tweak: impl FnOnce(AssetManagerConfig) -> AssetManagerConfig,
    ) -> Self {
        init_tracing();
        let downloads = tempfile::tempdir().unwrap();
        let pool = setup_test_database().await.unwrap();
        let config = tweak(AssetManagerConfig::new(downloads.path().to_path_buf()));

        let manager = AssetManager::start(
            transport.clone(),
            Arc::new(SqliteLocationRepository::new(pool)),
            Arc::new(NoopAssetEmitter::new()),
            config,
        )
        .await
        .unwrap();
        let events = manager.subscribe();

        Self {
            manager,
            transport,
            events,
            downloads,
        }
    }

    pub fn root(&self) -> &Path {
        self.downloads.path()
    }

    pub async fn settle(&mut self) -> Vec<AssetEvent> {
        settle(&self.manager).await;
        self.events.drain()
    }

    pub fn state_of(&self, id: &str) -> DownloadState {
        self.manager.state_for(&asset(id)).unwrap()
    }
}
