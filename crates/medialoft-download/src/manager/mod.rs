//! Asset manager implementation.
//!
//! This module provides the concrete implementation of `AssetManagerPort`:
//! a cheap handle in front of a single long-lived scheduler task.
//!
//! # Architecture
//!
//! - **Manager**: forwards commands and serves state/progress reads from
//!   the tracker
//! - **Scheduler**: owns queue, active jobs, location store and transport
//!   calls; the only writer of events
//! - **Event bus**: applies events to the tracker, then delivers them to
//!   subscribers and the external emitter port
//!
//! # Lifecycle
//!
//! `AssetManager::start` creates the downloads directory, seeds the tracker
//! from the location store (without publishing), spawns the scheduler, and
//! optionally restores in-flight transfers. `stop` ends the scheduler; transfers already handed to the
//! transport keep running so the next process can restore them.

mod artifacts;
mod command;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use medialoft_core::{
    Asset, AssetError, AssetEventEmitterPort, AssetId, AssetManagerConfig, AssetManagerPort,
    AssetResult, DownloadState, LocationStorePort, QueueSnapshot, Resolution, TransferSink,
    TransferTransport,
};

use crate::bus::{EventBus, EventSubscription};
use crate::locations::PersistentLocations;
use crate::tracker::StateTracker;

use command::Command;
use scheduler::Scheduler;

/// Dependencies for creating an asset manager.
///
/// This struct bundles all the ports and configuration needed
/// to construct an `AssetManager`.
pub struct AssetManagerDeps<T, S, E>
where
    T: TransferTransport + 'static,
    S: LocationStorePort + 'static,
    E: AssetEventEmitterPort + 'static,
{
    /// The external transfer subsystem.
    pub transport: Arc<T>,
    /// Durable asset id → location token records.
    pub location_store: Arc<S>,
    /// Port for forwarding events to the host.
    pub event_emitter: Arc<E>,
    /// Configuration for the asset manager.
    pub config: AssetManagerConfig,
}

/// Build and start an asset manager from its dependencies.
///
/// The result can be stored as `Arc<dyn AssetManagerPort>` in adapters.
pub async fn build_asset_manager<T, S, E>(
    deps: AssetManagerDeps<T, S, E>,
) -> AssetResult<Arc<AssetManager>>
where
    T: TransferTransport + 'static,
    S: LocationStorePort + 'static,
    E: AssetEventEmitterPort + 'static,
{
    AssetManager::start(
        deps.transport,
        deps.location_store,
        deps.event_emitter,
        deps.config,
    )
    .await
}

/// Concrete implementation of the asset manager.
///
/// Construct one per application in the composition root and pass the
/// `Arc` (or an `Arc<dyn AssetManagerPort>`) to consumers.
pub struct AssetManager {
    commands: mpsc::UnboundedSender<Command>,
    bus: Arc<EventBus>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AssetManager {
    /// Seed state, spawn the scheduler, and (if configured) restore.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(
        transport: Arc<dyn TransferTransport>,
        location_store: Arc<dyn LocationStorePort>,
        event_emitter: Arc<dyn AssetEventEmitterPort>,
        config: AssetManagerConfig,
    ) -> AssetResult<Arc<Self>> {
        tokio::fs::create_dir_all(&config.downloads_directory)
            .await
            .map_err(|e| AssetError::from_io_error(&e))?;

        let tracker = Arc::new(StateTracker::new());
        let bus = Arc::new(EventBus::new(Arc::clone(&tracker)));
        let _forwarder = bus.forward_to(event_emitter);
        let locations =
            PersistentLocations::new(location_store, config.downloads_directory.clone());

        let mut seeded = 0usize;
        for (id, resolution) in locations.entries().await? {
            match resolution {
                Resolution::Valid(path) => {
                    tracker.seed_downloaded(&id, &path);
                    seeded += 1;
                }
                Resolution::Stale { reason } => {
                    tracing::warn!(asset_id = %id, reason = %reason, "Location record is stale");
                    tracker.mark_stale(&id, reason);
                }
            }
        }

        let (sink, transfers) = TransferSink::channel();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let scheduler = Scheduler::new(
            transport,
            locations,
            Arc::clone(&bus),
            sink,
            config.max_concurrent,
            config.max_queue_size,
            config.progress_interval,
        );
        let task = tokio::spawn(scheduler.run(command_rx, transfers, shutdown.clone()));

        tracing::info!(
            downloads = %config.downloads_directory.display(),
            seeded,
            max_concurrent = config.max_concurrent,
            "Asset manager started"
        );

        let manager = Arc::new(Self {
            commands,
            bus,
            shutdown,
            task: Mutex::new(Some(task)),
        });

        if config.restore_on_start {
            if let Err(e) = manager.restore().await {
                tracing::warn!(error = %e, "Restoration failed, call restore() to retry");
            }
        }

        Ok(manager)
    }

    /// Stop the scheduler task and wait for it to exit.
    ///
    /// Later calls that need the scheduler return `AssetError::NotRunning`.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Scheduler task ended abnormally");
            }
        }
    }

    /// Subscribe to every event published from now on.
    pub fn subscribe(&self) -> EventSubscription {
        self.bus.subscribe()
    }

    async fn call<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> AssetResult<R> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| AssetError::NotRunning)?;
        rx.await.map_err(|_| AssetError::NotRunning)
    }
}

impl Drop for AssetManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl AssetManagerPort for AssetManager {
    async fn request_download(&self, asset: Asset) -> AssetResult<()> {
        self.call(|respond_to| Command::Enqueue { asset, respond_to })
            .await?
    }

    async fn cancel(&self, asset: &Asset) -> AssetResult<()> {
        let id = asset.id().clone();
        self.call(|respond_to| Command::Cancel { id, respond_to })
            .await?
    }

    async fn cancel_all(&self) -> AssetResult<()> {
        self.call(|respond_to| Command::CancelAll { respond_to })
            .await?
    }

    async fn delete(&self, asset: &Asset) -> AssetResult<()> {
        let id = asset.id().clone();
        self.call(|respond_to| Command::Delete { id, respond_to })
            .await?
    }

    fn state_for(&self, asset: &Asset) -> AssetResult<DownloadState> {
        self.bus.tracker().state(asset.id())
    }

    fn progress_for(&self, asset: &Asset) -> f64 {
        self.bus.tracker().progress(asset.id())
    }

    async fn local_location(&self, asset: &Asset) -> AssetResult<Option<PathBuf>> {
        let id = asset.id().clone();
        self.call(|respond_to| Command::LocalLocation { id, respond_to })
            .await?
    }

    fn downloaded_assets(&self) -> Vec<AssetId> {
        self.bus.tracker().downloaded()
    }

    async fn active_asset(&self, id: &AssetId) -> AssetResult<Option<Asset>> {
        let id = id.clone();
        self.call(|respond_to| Command::ActiveAsset { id, respond_to })
            .await
    }

    async fn queue_snapshot(&self) -> AssetResult<QueueSnapshot> {
        self.call(|respond_to| Command::Snapshot { respond_to })
            .await
    }

    async fn restore(&self) -> AssetResult<()> {
        self.call(|respond_to| Command::Restore { respond_to })
            .await?
    }
}
