//! Queue snapshot DTO for UI lists.

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;

/// Point-in-time view of the download queue.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Assets currently transferring, in admission order.
    pub active: Vec<AssetId>,
    /// Assets waiting for admission, in FIFO order.
    pub pending: Vec<AssetId>,
    /// Maximum number of pending jobs.
    pub max_size: u32,
}

impl QueueSnapshot {
    /// Whether nothing is active or pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.pending.is_empty()
    }

    /// 1-based position of an asset (active items first), if present.
    #[must_use]
    pub fn position_of(&self, id: &AssetId) -> Option<usize> {
        self.active
            .iter()
            .chain(self.pending.iter())
            .position(|candidate| candidate == id)
            .map(|idx| idx + 1)
    }
}
