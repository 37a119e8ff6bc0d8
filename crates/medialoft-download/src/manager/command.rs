//! Messages from manager handles to the scheduler task.

use std::path::PathBuf;

use tokio::sync::oneshot;

use medialoft_core::{Asset, AssetId, AssetResult, QueueSnapshot};

pub enum Command {
    Enqueue {
        asset: Asset,
        respond_to: oneshot::Sender<AssetResult<()>>,
    },
    Cancel {
        id: AssetId,
        respond_to: oneshot::Sender<AssetResult<()>>,
    },
    CancelAll {
        respond_to: oneshot::Sender<AssetResult<()>>,
    },
    Delete {
        id: AssetId,
        respond_to: oneshot::Sender<AssetResult<()>>,
    },
    LocalLocation {
        id: AssetId,
        respond_to: oneshot::Sender<AssetResult<Option<PathBuf>>>,
    },
    ActiveAsset {
        id: AssetId,
        respond_to: oneshot::Sender<Option<Asset>>,
    },
    Snapshot {
        respond_to: oneshot::Sender<QueueSnapshot>,
    },
    Restore {
        respond_to: oneshot::Sender<AssetResult<()>>,
    },
}
