//! Error types for asset operations.
//!
//! `AssetError` is designed to be serializable and not depend on external
//! error types like `std::io::Error`. For I/O errors, we capture the kind
//! and message as strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::AssetId;

/// Error type for caller-facing asset manager operations.
///
/// Designed to be serializable across UI boundaries without depending on
/// non-serializable types like `std::io::Error`.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssetError {
    /// The transport reported a failed transfer.
    #[error("Transfer failed: {message}")]
    TransferFailed {
        /// Cause reported by the transport.
        message: String,
    },

    /// A recorded location no longer resolves to an artifact on disk.
    #[error("Stale location reference for {asset_id}: {reason}")]
    StaleLocationReference {
        /// The asset whose record is stale.
        asset_id: AssetId,
        /// Why resolution failed.
        reason: String,
    },

    /// Removing a downloaded asset failed; its state was left unchanged.
    #[error("Failed to delete {asset_id}: {message}")]
    DeletionFailed {
        /// The asset that could not be deleted.
        asset_id: AssetId,
        /// Detailed error message.
        message: String,
    },

    /// Queue is full, cannot add more downloads.
    #[error("Queue full: maximum {max_size} pending downloads allowed")]
    QueueFull {
        /// Maximum number of pending jobs.
        max_size: u32,
    },

    /// The manager has been stopped (or its scheduler exited).
    #[error("Asset manager is not running")]
    NotRunning,

    /// The location store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message.
        message: String,
    },

    /// The transport rejected a start/cancel/enumerate request.
    #[error("Transport error: {message}")]
    Transport {
        /// Detailed error message.
        message: String,
    },

    /// I/O error during file operations.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "`NotFound`", "`PermissionDenied`").
        kind: String,
        /// Detailed error message.
        message: String,
    },
}

impl AssetError {
    /// Create a transfer failed error.
    pub fn transfer_failed(message: impl Into<String>) -> Self {
        Self::TransferFailed {
            message: message.into(),
        }
    }

    /// Create a stale location reference error.
    pub fn stale(asset_id: &AssetId, reason: impl Into<String>) -> Self {
        Self::StaleLocationReference {
            asset_id: asset_id.clone(),
            reason: reason.into(),
        }
    }

    /// Create a deletion failed error.
    pub fn deletion_failed(asset_id: &AssetId, message: impl Into<String>) -> Self {
        Self::DeletionFailed {
            asset_id: asset_id.clone(),
            message: message.into(),
        }
    }

    /// Create a queue full error.
    #[must_use]
    pub const fn queue_full(max_size: u32) -> Self {
        Self::QueueFull { max_size }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    ///
    /// This captures the error kind name and message for serialization.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Check if this is a stale location reference.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleLocationReference { .. })
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::TransferFailed { message } => format!("Download failed: {message}"),
            Self::StaleLocationReference { asset_id, .. } => {
                format!("The offline copy of '{asset_id}' is missing. Download it again.")
            }
            Self::DeletionFailed { asset_id, message } => {
                format!("Could not remove '{asset_id}': {message}. Try again.")
            }
            Self::QueueFull { max_size } => {
                format!(
                    "Download queue is full (max {max_size} items). Wait for a download to complete."
                )
            }
            Self::NotRunning => "Downloads are not available right now.".to_string(),
            Self::Storage { message } => format!("Storage problem: {message}"),
            Self::Transport { message } => format!("Download service problem: {message}"),
            Self::Io { message, .. } => format!("File operation failed: {message}"),
        }
    }
}

impl From<RepositoryError> for AssetError {
    fn from(err: RepositoryError) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<TransportError> for AssetError {
    fn from(err: TransportError) -> Self {
        Self::transport(err.to_string())
    }
}

/// Convenience result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Domain-specific errors for location store operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx errors).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Storage backend error (database, filesystem, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors reported by a `TransferTransport` implementation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The transport refused to start or cancel a transfer.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The handle does not belong to a transfer the transport knows about.
    #[error("Unknown transfer handle: {0}")]
    UnknownHandle(String),

    /// The underlying transfer subsystem is unavailable.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}
