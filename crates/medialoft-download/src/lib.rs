//! Offline asset download manager.
//!
//! Serializes download requests into a FIFO queue, drives an external
//! `TransferTransport`, persists completed downloads' locations through a
//! `LocationStorePort`, and reports every transition as an `AssetEvent`.
//!
//! - `queue` - pure FIFO state machine for pending jobs
//! - `tracker` - non-blocking per-asset state and progress reads
//! - `bus` - per-manager publish/subscribe
//! - `locations` - location store facade that captures/resolves tokens
//! - `manager` - the `AssetManager` service and its scheduler task

// Re-export core types for convenience
pub use medialoft_core::{
    Asset, AssetError, AssetEvent, AssetEventEmitterPort, AssetId, AssetManagerConfig,
    AssetManagerPort, AssetResult, DownloadState, InFlightTransfer, LocationStorePort,
    NoopAssetEmitter, QueueSnapshot, TransferHandle, TransferOutcome, TransferSink,
    TransferTransport, TransportError,
};

// Internal modules (pub(crate) to keep implementation private)
pub(crate) mod bus;
pub(crate) mod progress;
pub(crate) mod queue;
pub(crate) mod tracker;

mod locations;
mod manager;

pub use bus::EventSubscription;
pub use locations::PersistentLocations;
pub use manager::{AssetManager, AssetManagerDeps, build_asset_manager};
