//! Asset manager port definition.
//!
//! This port defines the caller-facing interface of the offline asset
//! subsystem. Queueing, the scheduler task, and the transport are hidden
//! behind a small async API.
//!
//! # Design
//!
//! - Only core domain types in signatures
//! - State and progress reads are synchronous and never wait on the scheduler
//! - Everything that mutates the queue or the location store is async

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::asset::{Asset, AssetId, DownloadState};
use crate::errors::AssetError;
use crate::queue::QueueSnapshot;

/// Configuration for creating an asset manager.
#[derive(Debug, Clone)]
pub struct AssetManagerConfig {
    /// Root directory downloads are written under. Location tokens are
    /// recorded relative to it when possible.
    pub downloads_directory: PathBuf,
    /// Maximum concurrently admitted transfers.
    pub max_concurrent: u32,
    /// Maximum number of pending (not yet admitted) jobs.
    pub max_queue_size: u32,
    /// Minimum interval between relayed progress events per asset.
    /// `None` relays every sample.
    pub progress_interval: Option<Duration>,
    /// Re-attach in-flight transfers as part of `start`.
    pub restore_on_start: bool,
}

impl Default for AssetManagerConfig {
    fn default() -> Self {
        Self {
            downloads_directory: PathBuf::from("."),
            max_concurrent: 1,
            max_queue_size: 64,
            progress_interval: None,
            restore_on_start: true,
        }
    }
}

impl AssetManagerConfig {
    /// Create a new config with the downloads directory.
    #[must_use]
    pub fn new(downloads_directory: PathBuf) -> Self {
        Self {
            downloads_directory,
            ..Default::default()
        }
    }

    /// Set the maximum concurrent transfers.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max: u32) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set the maximum queue size.
    #[must_use]
    pub const fn with_max_queue_size(mut self, max: u32) -> Self {
        self.max_queue_size = max;
        self
    }

    /// Set the progress relay interval.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Option<Duration>) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set whether `start` restores in-flight transfers.
    #[must_use]
    pub const fn with_restore_on_start(mut self, restore: bool) -> Self {
        self.restore_on_start = restore;
        self
    }
}

/// Port for managing offline copies of streamable assets.
///
/// # Usage
///
/// ```ignore
/// let manager: Arc<dyn AssetManagerPort> = /* ... */;
///
/// manager.request_download(asset.clone()).await?;
/// assert_eq!(manager.state_for(&asset)?, DownloadState::Downloading);
///
/// // Later
/// if let Some(path) = manager.local_location(&asset).await? {
///     play_from(path);
/// }
/// ```
#[async_trait]
pub trait AssetManagerPort: Send + Sync {
    /// Queue a download for `asset`.
    ///
    /// Emits `StateChanged(Downloading)` immediately, even while the job
    /// waits for admission. Requesting an asset that is already queued or
    /// active only re-emits that event; requesting an asset that is already
    /// downloaded re-emits `StateChanged(Downloaded)`.
    async fn request_download(&self, asset: Asset) -> Result<(), AssetError>;

    /// Cancel the job for `asset`.
    ///
    /// A queued job is dropped without ever starting. An active job is asked
    /// to abort; its state stays `Downloading` until the transport confirms.
    /// Cancelling an asset with no job is a no-op.
    async fn cancel(&self, asset: &Asset) -> Result<(), AssetError>;

    /// Cancel every active job and drop all pending ones.
    async fn cancel_all(&self) -> Result<(), AssetError>;

    /// Delete the local copy of `asset` and its location record.
    ///
    /// Deleting an asset that has no local copy succeeds. On failure the
    /// state is left unchanged so the caller can retry.
    async fn delete(&self, asset: &Asset) -> Result<(), AssetError>;

    /// Current state of `asset`.
    ///
    /// Returns `StaleLocationReference` when the asset's recorded location
    /// no longer resolves.
    fn state_for(&self, asset: &Asset) -> Result<DownloadState, AssetError>;

    /// Last relayed progress for `asset`, `0.0` when unknown.
    fn progress_for(&self, asset: &Asset) -> f64;

    /// Resolve the on-disk location of a downloaded asset.
    ///
    /// `Ok(None)` means no record exists; a record that no longer resolves is
    /// an error.
    async fn local_location(&self, asset: &Asset) -> Result<Option<PathBuf>, AssetError>;

    /// Ids of every asset with a local copy.
    fn downloaded_assets(&self) -> Vec<AssetId>;

    /// The asset behind an active transfer, if any.
    async fn active_asset(&self, id: &AssetId) -> Result<Option<Asset>, AssetError>;

    /// Current queue contents.
    async fn queue_snapshot(&self) -> Result<QueueSnapshot, AssetError>;

    /// Re-attach transfers left running by a previous process.
    ///
    /// Idempotent: only the first successful call has an effect.
    async fn restore(&self) -> Result<(), AssetError>;
}
