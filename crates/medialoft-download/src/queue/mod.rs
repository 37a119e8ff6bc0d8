//! Download queue management.
//!
//! This module provides a pure state machine for the pending part of the
//! download queue. No I/O is performed here; the scheduler task handles
//! admission and transport calls.
//!
//! # Design
//!
//! - Pure synchronous state machine (no async, no IO, no tracing)
//! - Strict FIFO: admission always considers jobs in enqueue order
//! - At most one pending job per asset id

mod types;

use std::collections::VecDeque;

use medialoft_core::{AssetError, AssetId};

pub use types::{DownloadJob, EnqueueOutcome};

/// Pending download jobs in FIFO order.
///
/// This is a sync type with no internal locking; the scheduler task owns it.
pub struct DownloadQueue {
    pending: VecDeque<DownloadJob>,
    max_size: u32,
}

impl DownloadQueue {
    /// Create a new download queue with the specified max size.
    pub const fn new(max_size: u32) -> Self {
        Self {
            pending: VecDeque::new(),
            max_size,
        }
    }

    /// Get the maximum queue size.
    pub const fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Get the number of pending jobs.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Check if an asset id is currently pending.
    pub fn is_queued(&self, id: &AssetId) -> bool {
        self.pending.iter().any(|job| job.id() == id)
    }

    /// Pending asset ids in FIFO order.
    pub fn pending_ids(&self) -> Vec<AssetId> {
        self.pending.iter().map(|job| job.id().clone()).collect()
    }

    /// Append a job, unless one for the same asset is already pending.
    pub fn enqueue(&mut self, job: DownloadJob) -> Result<EnqueueOutcome, AssetError> {
        if self.is_queued(job.id()) {
            return Ok(EnqueueOutcome::AlreadyQueued);
        }
        if self.pending.len() >= self.max_size as usize {
            return Err(AssetError::queue_full(self.max_size));
        }

        self.pending.push_back(job);
        Ok(EnqueueOutcome::Queued {
            position: self.pending.len(),
        })
    }

    /// Take the first job whose asset is not blocked.
    ///
    /// `is_blocked` reports assets that still have a transfer awaiting its
    /// terminal callback. A blocked job keeps its place; later jobs for
    /// other assets may be admitted ahead of it.
    pub fn next_admissible(
        &mut self,
        mut is_blocked: impl FnMut(&AssetId) -> bool,
    ) -> Option<DownloadJob> {
        let index = self.pending.iter().position(|job| !is_blocked(job.id()))?;
        self.pending.remove(index)
    }

    /// Remove the pending job for an asset, if any.
    pub fn remove(&mut self, id: &AssetId) -> Option<DownloadJob> {
        let index = self.pending.iter().position(|job| job.id() == id)?;
        self.pending.remove(index)
    }

    /// Remove and return every pending job in FIFO order.
    pub fn drain(&mut self) -> Vec<DownloadJob> {
        self.pending.drain(..).collect()
    }
}

impl Default for DownloadQueue {
    fn default() -> Self {
        Self::new(64)
    }
}
