//! Queue item types (internal implementation).

use std::time::Instant;

use medialoft_core::{Asset, AssetId};

/// A download request waiting for admission.
#[derive(Clone, Debug)]
pub struct DownloadJob {
    /// The asset to transfer.
    pub asset: Asset,
    /// When this job was queued (for ordering/debugging).
    pub enqueued_at: Instant,
}

impl DownloadJob {
    /// Create a new job stamped with the current time.
    pub fn new(asset: Asset) -> Self {
        Self {
            asset,
            enqueued_at: Instant::now(),
        }
    }

    /// The id of the asset this job transfers.
    pub const fn id(&self) -> &AssetId {
        self.asset.id()
    }
}

/// Result of offering a job to the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended at this 1-based pending position.
    Queued { position: usize },
    /// A job for the same asset id is already pending.
    AlreadyQueued,
}
