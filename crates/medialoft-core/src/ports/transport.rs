//! Transfer transport port.
//!
//! The transport is the OS-level (or library-level) subsystem that actually
//! streams an asset's bytes, picks variants, and reports progress. The engine
//! only drives it through this narrow contract.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::asset::{Asset, AssetId};
use crate::errors::TransportError;

/// Opaque identifier of one transfer job inside the transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransferHandle(String);

impl TransferHandle {
    /// Create a handle from the transport's own task identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a transfer ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// All data is on disk at the location reported via `location_chosen`.
    Success,
    /// The transfer was aborted, usually because the engine asked for it.
    Cancelled,
    /// The transfer failed for any other reason.
    Failed(String),
}

/// Callback payload delivered by the transport.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferEventKind {
    /// Completed fraction of the transfer.
    Progress(f64),
    /// The transport decided where the artifact will be written.
    LocationChosen(PathBuf),
    /// The transfer reached a terminal outcome.
    Terminal(TransferOutcome),
}

/// A callback from the transport, tagged with the job it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferEvent {
    /// The job this callback is about.
    pub handle: TransferHandle,
    /// What happened.
    pub kind: TransferEventKind,
}

/// Callback channel handed to the transport.
///
/// Callbacks may be invoked from any thread; they are queued and applied on
/// the engine's scheduler task, never inline. Sending never blocks.
#[derive(Clone, Debug)]
pub struct TransferSink {
    tx: mpsc::UnboundedSender<TransferEvent>,
}

impl TransferSink {
    /// Create a sink and the receiver the scheduler drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransferEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report progress for a job.
    pub fn progress(&self, handle: &TransferHandle, fraction: f64) {
        self.send(handle, TransferEventKind::Progress(fraction));
    }

    /// Report where a job writes its artifact.
    pub fn location_chosen(&self, handle: &TransferHandle, location: impl Into<PathBuf>) {
        self.send(handle, TransferEventKind::LocationChosen(location.into()));
    }

    /// Report the terminal outcome of a job.
    pub fn terminal(&self, handle: &TransferHandle, outcome: TransferOutcome) {
        self.send(handle, TransferEventKind::Terminal(outcome));
    }

    fn send(&self, handle: &TransferHandle, kind: TransferEventKind) {
        let event = TransferEvent {
            handle: handle.clone(),
            kind,
        };
        if self.tx.send(event).is_err() {
            tracing::debug!(handle = %handle, "Dropping transfer callback, scheduler is gone");
        }
    }
}

/// A transfer that was already running when the process started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InFlightTransfer {
    /// The transport's handle for the job.
    pub handle: TransferHandle,
    /// Asset id recovered from the job's description.
    pub asset_id: AssetId,
    /// Manifest locator the job is fetching.
    pub source_locator: String,
}

impl InFlightTransfer {
    /// Rebuild the asset this transfer belongs to.
    #[must_use]
    pub fn asset(&self) -> Asset {
        Asset::new(self.asset_id.clone(), self.source_locator.clone())
    }
}

/// Port for the external transfer subsystem.
///
/// Implementations must deliver exactly one `Terminal` callback for every
/// handle returned by `start_transfer` or `in_flight_transfers`, including
/// after `cancel_transfer` (with `TransferOutcome::Cancelled`).
#[async_trait]
pub trait TransferTransport: Send + Sync {
    /// Begin transferring `asset`, reporting through `sink`.
    async fn start_transfer(
        &self,
        asset: &Asset,
        sink: TransferSink,
    ) -> Result<TransferHandle, TransportError>;

    /// Ask the transport to abort a job. Completion is still reported through
    /// the sink.
    async fn cancel_transfer(&self, handle: &TransferHandle) -> Result<(), TransportError>;

    /// List jobs left running by a previous process and route their future
    /// callbacks to `sink`.
    async fn in_flight_transfers(
        &self,
        sink: TransferSink,
    ) -> Result<Vec<InFlightTransfer>, TransportError>;
}
