//! Asset events - discriminated union for everything observers can see.

use serde::{Deserialize, Serialize};

use crate::asset::{AssetId, DownloadState};

/// Single discriminated union for all asset manager events.
///
/// UI layers handle this as a tagged union:
///
/// ```typescript
/// type AssetEvent =
///   | { type: "state_changed"; asset_id: string; state: "not_downloaded" | "downloading" | "downloaded" }
///   | { type: "progress_updated"; asset_id: string; fraction: number }
///   | { type: "transfer_failed"; asset_id: string; error: string }
///   | { type: "restoration_completed" };
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetEvent {
    /// The download state of an asset changed (or was re-asserted).
    StateChanged {
        /// The asset.
        asset_id: AssetId,
        /// Its new state.
        state: DownloadState,
    },

    /// Transfer progress for an active asset, relayed from the transport.
    ProgressUpdated {
        /// The asset.
        asset_id: AssetId,
        /// Completed fraction in `[0, 1]`.
        fraction: f64,
    },

    /// A transfer ended with an error other than cancellation.
    TransferFailed {
        /// The asset.
        asset_id: AssetId,
        /// Error message describing what went wrong.
        error: String,
    },

    /// In-flight transfers from a previous process have been re-attached.
    RestorationCompleted,
}

impl AssetEvent {
    /// Create a state changed event.
    pub fn state_changed(asset_id: impl Into<AssetId>, state: DownloadState) -> Self {
        Self::StateChanged {
            asset_id: asset_id.into(),
            state,
        }
    }

    /// Create a progress event. The fraction is clamped to `[0, 1]`.
    pub fn progress(asset_id: impl Into<AssetId>, fraction: f64) -> Self {
        Self::ProgressUpdated {
            asset_id: asset_id.into(),
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Create a transfer failed event.
    pub fn transfer_failed(asset_id: impl Into<AssetId>, error: impl Into<String>) -> Self {
        Self::TransferFailed {
            asset_id: asset_id.into(),
            error: error.into(),
        }
    }

    /// The asset this event is about, if any.
    #[must_use]
    pub const fn asset_id(&self) -> Option<&AssetId> {
        match self {
            Self::StateChanged { asset_id, .. }
            | Self::ProgressUpdated { asset_id, .. }
            | Self::TransferFailed { asset_id, .. } => Some(asset_id),
            Self::RestorationCompleted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(
            AssetEvent::progress("a", 1.7),
            AssetEvent::ProgressUpdated {
                asset_id: AssetId::new("a"),
                fraction: 1.0
            }
        );
        assert_eq!(
            AssetEvent::progress("a", -0.2),
            AssetEvent::progress("a", 0.0)
        );
    }

    #[test]
    fn test_event_wire_format() {
        let event = AssetEvent::state_changed("track-1", DownloadState::Downloading);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["asset_id"], "track-1");
        assert_eq!(json["state"], "downloading");

        let json = serde_json::to_value(AssetEvent::RestorationCompleted).unwrap();
        assert_eq!(json["type"], "restoration_completed");
    }

    #[test]
    fn test_asset_id_accessor() {
        assert_eq!(
            AssetEvent::transfer_failed("b", "timeout").asset_id(),
            Some(&AssetId::new("b"))
        );
        assert!(AssetEvent::RestorationCompleted.asset_id().is_none());
    }
}
