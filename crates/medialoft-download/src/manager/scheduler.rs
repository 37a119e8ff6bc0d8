//! The scheduler task.
//!
//! One task owns the pending queue, the active-jobs map, every location
//! store access, and every transport start/cancel call. Manager handles talk
//! to it through `Command`s; the transport talks to it through the
//! `TransferSink`. Both arrive on channels, so nothing here needs a lock.
//!
//! Transport callbacks are polled before commands. A command sent after a
//! callback therefore observes that callback's effects.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use medialoft_core::{
    Asset, AssetError, AssetEvent, AssetId, AssetResult, DownloadState, QueueSnapshot, Resolution,
    TransferEvent, TransferEventKind, TransferHandle, TransferOutcome, TransferSink,
    TransferTransport,
};

use super::artifacts::remove_artifact;
use super::command::Command;
use crate::bus::EventBus;
use crate::locations::PersistentLocations;
use crate::progress::ProgressThrottle;
use crate::queue::{DownloadJob, DownloadQueue, EnqueueOutcome};

/// A transfer handed to the transport and not yet terminal.
struct ActiveJob {
    asset: Asset,
    /// Where the transport said it writes, once known.
    location: Option<PathBuf>,
    cancel_requested: bool,
    throttle: ProgressThrottle,
}

impl ActiveJob {
    fn new(asset: Asset, progress_interval: Option<Duration>) -> Self {
        Self {
            asset,
            location: None,
            cancel_requested: false,
            throttle: ProgressThrottle::from_config(progress_interval),
        }
    }
}

pub struct Scheduler {
    transport: Arc<dyn TransferTransport>,
    locations: PersistentLocations,
    bus: Arc<EventBus>,
    queue: DownloadQueue,
    /// Keyed by transport handle, in admission order.
    active: IndexMap<TransferHandle, ActiveJob>,
    sink: TransferSink,
    max_concurrent: usize,
    progress_interval: Option<Duration>,
    restored: bool,
}

impl Scheduler {
    pub fn new(
        transport: Arc<dyn TransferTransport>,
        locations: PersistentLocations,
        bus: Arc<EventBus>,
        sink: TransferSink,
        max_concurrent: u32,
        max_queue_size: u32,
        progress_interval: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            locations,
            bus,
            queue: DownloadQueue::new(max_queue_size),
            active: IndexMap::new(),
            sink,
            max_concurrent: usize::try_from(max_concurrent.max(1)).unwrap_or(1),
            progress_interval,
            restored: false,
        }
    }

    /// Run until shutdown is requested or every manager handle is dropped.
    ///
    /// Transfers still running at the transport are left alone so a later
    /// process can restore them.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut transfers: mpsc::UnboundedReceiver<TransferEvent>,
        shutdown: CancellationToken,
    ) {
        tracing::debug!(target: "medialoft.download", "Scheduler started");
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                Some(event) = transfers.recv() => self.on_transfer_event(event).await,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }
        tracing::info!(
            target: "medialoft.download",
            active = self.active.len(),
            pending = self.queue.pending_len(),
            "Scheduler stopped"
        );
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Enqueue { asset, respond_to } => {
                let _ = respond_to.send(self.enqueue(asset).await);
            }
            Command::Cancel { id, respond_to } => {
                let _ = respond_to.send(self.cancel(&id).await);
            }
            Command::CancelAll { respond_to } => {
                let _ = respond_to.send(self.cancel_all().await);
            }
            Command::Delete { id, respond_to } => {
                let _ = respond_to.send(self.delete(&id).await);
            }
            Command::LocalLocation { id, respond_to } => {
                let _ = respond_to.send(self.local_location(&id).await);
            }
            Command::ActiveAsset { id, respond_to } => {
                let asset = self.active_job(&id).map(|job| job.asset.clone());
                let _ = respond_to.send(asset);
            }
            Command::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            Command::Restore { respond_to } => {
                let _ = respond_to.send(self.restore().await);
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Any transfer for `id` that has not delivered its terminal callback,
    /// including one that is being cancelled.
    fn active_job(&self, id: &AssetId) -> Option<&ActiveJob> {
        self.active.values().find(|job| job.asset.id() == id)
    }

    fn is_active(&self, id: &AssetId) -> bool {
        self.active_job(id).is_some()
    }

    /// The state an asset without a local copy settles in.
    fn settled_state(&self, id: &AssetId) -> DownloadState {
        if self.queue.is_queued(id) || self.is_active(id) {
            DownloadState::Downloading
        } else {
            DownloadState::NotDownloaded
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            active: self
                .active
                .values()
                .map(|job| job.asset.id().clone())
                .collect(),
            pending: self.queue.pending_ids(),
            max_size: self.queue.max_size(),
        }
    }

    fn publish_state(&self, id: &AssetId, state: DownloadState) {
        self.bus
            .publish(AssetEvent::state_changed(id.clone(), state));
    }

    // =========================================================================
    // Admission
    // =========================================================================

    /// Admit pending jobs in FIFO order while there is capacity.
    ///
    /// A job whose asset still has a transfer awaiting its terminal callback
    /// is skipped until that callback arrives.
    async fn admit(&mut self) {
        while self.active.len() < self.max_concurrent {
            let active = &self.active;
            let Some(job) = self
                .queue
                .next_admissible(|id| active.values().any(|a| a.asset.id() == id))
            else {
                break;
            };

            let waited_ms = u64::try_from(job.enqueued_at.elapsed().as_millis()).unwrap_or(u64::MAX);
            let asset = job.asset;
            match self
                .transport
                .start_transfer(&asset, self.sink.clone())
                .await
            {
                Ok(handle) => {
                    tracing::info!(
                        target: "medialoft.download",
                        asset_id = %asset.id(),
                        handle = %handle,
                        waited_ms,
                        "Transfer admitted"
                    );
                    self.active
                        .insert(handle, ActiveJob::new(asset, self.progress_interval));
                }
                Err(e) => {
                    tracing::warn!(
                        target: "medialoft.download",
                        asset_id = %asset.id(),
                        error = %e,
                        "Transport refused to start transfer"
                    );
                    self.fail(asset.id(), &e.to_string());
                }
            }
        }
    }

    // =========================================================================
    // Transport callbacks
    // =========================================================================

    async fn on_transfer_event(&mut self, event: TransferEvent) {
        let TransferEvent { handle, kind } = event;
        match kind {
            TransferEventKind::Progress(fraction) => {
                let Some(job) = self.active.get_mut(&handle) else {
                    tracing::debug!(handle = %handle, "Progress for unknown transfer");
                    return;
                };
                if job.throttle.should_emit(fraction) {
                    self.bus
                        .publish(AssetEvent::progress(job.asset.id().clone(), fraction));
                } else {
                    self.bus.record_progress(job.asset.id(), fraction);
                }
            }
            TransferEventKind::LocationChosen(location) => {
                if let Some(job) = self.active.get_mut(&handle) {
                    tracing::debug!(
                        asset_id = %job.asset.id(),
                        location = %location.display(),
                        "Transfer location chosen"
                    );
                    job.location = Some(location);
                } else {
                    tracing::debug!(handle = %handle, "Location for unknown transfer");
                }
            }
            TransferEventKind::Terminal(outcome) => {
                let Some(job) = self.active.shift_remove(&handle) else {
                    tracing::debug!(handle = %handle, "Terminal callback for unknown transfer");
                    return;
                };
                self.finish(job, outcome).await;
                // Advance regardless of how finishing went
                self.admit().await;
            }
        }
    }

    async fn finish(&self, job: ActiveJob, outcome: TransferOutcome) {
        let id = job.asset.id().clone();
        match outcome {
            TransferOutcome::Success if job.cancel_requested => {
                tracing::debug!(
                    asset_id = %id,
                    "Transfer finished after cancel was requested, discarding"
                );
                self.roll_back(&id, job.location.as_deref()).await;
            }
            TransferOutcome::Success => match job.location {
                Some(location) => self.complete(&id, &location).await,
                None => {
                    tracing::error!(
                        target: "medialoft.download",
                        asset_id = %id,
                        "Transport reported success without a location"
                    );
                    self.fail(&id, "transfer finished without reporting a location");
                }
            },
            TransferOutcome::Cancelled => {
                tracing::info!(target: "medialoft.download", asset_id = %id, "Transfer cancelled");
                self.roll_back(&id, job.location.as_deref()).await;
            }
            TransferOutcome::Failed(message) => {
                tracing::warn!(
                    target: "medialoft.download",
                    asset_id = %id,
                    error = %message,
                    "Transfer failed"
                );
                self.discard_partial(&id, job.location.as_deref()).await;
                self.fail(&id, &message);
            }
        }
    }

    async fn complete(&self, id: &AssetId, location: &Path) {
        match self.locations.put(id, location).await {
            Ok(()) => {
                tracing::info!(
                    target: "medialoft.download",
                    asset_id = %id,
                    location = %location.display(),
                    "Download completed"
                );
                self.bus.tracker().record_location(id, location);
                self.publish_state(id, DownloadState::Downloaded);
            }
            Err(e) => {
                tracing::warn!(
                    target: "medialoft.download",
                    asset_id = %id,
                    error = %e,
                    "Could not record completed download"
                );
                self.discard_partial(id, Some(location)).await;
                self.fail(id, &e.to_string());
            }
        }
    }

    /// Cancellation cleanup: artifact and record go, state settles.
    async fn roll_back(&self, id: &AssetId, location: Option<&Path>) {
        self.discard_partial(id, location).await;
        if let Err(e) = self.locations.remove(id).await {
            tracing::warn!(asset_id = %id, error = %e, "Could not remove location record");
        }
        self.publish_state(id, self.settled_state(id));
    }

    fn fail(&self, id: &AssetId, message: &str) {
        self.publish_state(id, self.settled_state(id));
        self.bus
            .publish(AssetEvent::transfer_failed(id.clone(), message));
    }

    async fn discard_partial(&self, id: &AssetId, location: Option<&Path>) {
        let Some(location) = location else {
            return;
        };
        if let Err(e) = remove_artifact(location).await {
            tracing::warn!(
                asset_id = %id,
                location = %location.display(),
                error = %e,
                "Could not remove partial download"
            );
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    async fn enqueue(&mut self, asset: Asset) -> AssetResult<()> {
        let id = asset.id().clone();

        let live = self
            .active
            .values()
            .any(|job| job.asset.id() == &id && !job.cancel_requested);
        if live || self.queue.is_queued(&id) {
            tracing::debug!(asset_id = %id, "Already queued or transferring");
            self.publish_state(&id, DownloadState::Downloading);
            return Ok(());
        }

        let stale = match self.locations.resolve(&id).await? {
            Some(Resolution::Valid(path)) => {
                tracing::debug!(
                    asset_id = %id,
                    location = %path.display(),
                    "Already downloaded"
                );
                self.bus.tracker().record_location(&id, &path);
                self.publish_state(&id, DownloadState::Downloaded);
                return Ok(());
            }
            Some(Resolution::Stale { reason }) => Some(reason),
            None => None,
        };

        if let EnqueueOutcome::Queued { position } = self.queue.enqueue(DownloadJob::new(asset))? {
            tracing::info!(
                target: "medialoft.download",
                asset_id = %id,
                position,
                "Download queued"
            );
        }

        if let Some(reason) = stale {
            tracing::warn!(asset_id = %id, reason = %reason, "Replacing stale location record");
            if let Err(e) = self.locations.remove(&id).await {
                tracing::warn!(asset_id = %id, error = %e, "Could not remove stale record");
            }
        }

        self.publish_state(&id, DownloadState::Downloading);
        self.admit().await;
        Ok(())
    }

    async fn cancel(&mut self, id: &AssetId) -> AssetResult<()> {
        let live = self
            .active
            .iter()
            .find(|(_, job)| job.asset.id() == id && !job.cancel_requested)
            .map(|(handle, _)| handle.clone());

        if let Some(handle) = live {
            self.request_cancel(&handle).await?;
        }

        if self.queue.remove(id).is_some() {
            tracing::info!(target: "medialoft.download", asset_id = %id, "Queued download cancelled");
            if !self.is_active(id) {
                self.publish_state(id, DownloadState::NotDownloaded);
            }
        }
        Ok(())
    }

    async fn request_cancel(&mut self, handle: &TransferHandle) -> AssetResult<()> {
        self.transport.cancel_transfer(handle).await?;
        if let Some(job) = self.active.get_mut(handle) {
            job.cancel_requested = true;
            tracing::info!(
                target: "medialoft.download",
                asset_id = %job.asset.id(),
                handle = %handle,
                "Cancel requested, awaiting transport confirmation"
            );
        }
        Ok(())
    }

    async fn cancel_all(&mut self) -> AssetResult<()> {
        let live: Vec<TransferHandle> = self
            .active
            .iter()
            .filter(|(_, job)| !job.cancel_requested)
            .map(|(handle, _)| handle.clone())
            .collect();

        let mut first_error = None;
        for handle in live {
            if let Err(e) = self.request_cancel(&handle).await {
                tracing::warn!(handle = %handle, error = %e, "Cancel failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        for job in self.queue.drain() {
            if !self.is_active(job.id()) {
                self.publish_state(job.id(), DownloadState::NotDownloaded);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    async fn delete(&mut self, id: &AssetId) -> AssetResult<()> {
        if self.queue.is_queued(id) || self.is_active(id) {
            return Err(AssetError::deletion_failed(
                id,
                "a download for this asset is in progress",
            ));
        }

        let resolution = self
            .locations
            .resolve(id)
            .await
            .map_err(|e| AssetError::deletion_failed(id, e.to_string()))?;

        match resolution {
            Some(Resolution::Valid(path)) => {
                remove_artifact(&path)
                    .await
                    .map_err(|e| AssetError::deletion_failed(id, e.to_string()))?;
                self.locations
                    .remove(id)
                    .await
                    .map_err(|e| AssetError::deletion_failed(id, e.to_string()))?;
                tracing::info!(
                    target: "medialoft.download",
                    asset_id = %id,
                    location = %path.display(),
                    "Deleted local copy"
                );
                self.publish_state(id, DownloadState::NotDownloaded);
            }
            Some(Resolution::Stale { reason }) => {
                self.locations
                    .remove(id)
                    .await
                    .map_err(|e| AssetError::deletion_failed(id, e.to_string()))?;
                tracing::info!(asset_id = %id, reason = %reason, "Dropped stale location record");
                self.publish_state(id, DownloadState::NotDownloaded);
            }
            None => {
                tracing::debug!(asset_id = %id, "Nothing to delete");
            }
        }
        Ok(())
    }

    async fn local_location(&self, id: &AssetId) -> AssetResult<Option<PathBuf>> {
        match self.locations.resolve(id).await? {
            None => Ok(None),
            Some(Resolution::Valid(path)) => Ok(Some(path)),
            Some(Resolution::Stale { reason }) => {
                tracing::warn!(asset_id = %id, reason = %reason, "Location record is stale");
                self.bus.tracker().mark_stale(id, reason.clone());
                Err(AssetError::stale(id, reason))
            }
        }
    }

    async fn restore(&mut self) -> AssetResult<()> {
        if self.restored {
            tracing::debug!("Restoration already done");
            return Ok(());
        }

        let transfers = self
            .transport
            .in_flight_transfers(self.sink.clone())
            .await?;

        let count = transfers.len();
        for transfer in transfers {
            if self.active.contains_key(&transfer.handle) {
                continue;
            }
            let asset = transfer.asset();
            // The running transfer supersedes a fresh request for the same asset
            self.queue.remove(asset.id());
            tracing::info!(
                target: "medialoft.download",
                asset_id = %asset.id(),
                handle = %transfer.handle,
                "Re-attached in-flight transfer"
            );
            let id = asset.id().clone();
            self.active
                .insert(transfer.handle, ActiveJob::new(asset, self.progress_interval));
            self.publish_state(&id, DownloadState::Downloading);
        }

        self.restored = true;
        self.bus.publish(AssetEvent::RestorationCompleted);
        tracing::info!(target: "medialoft.download", count, "Restoration completed");

        self.admit().await;
        Ok(())
    }
}
