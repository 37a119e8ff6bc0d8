//! Core domain types and ports for medialoft.
//!
//! This crate holds the pure data model of the offline asset manager
//! (assets, download states, location tokens, events, errors) and the
//! trait seams the engine depends on:
//!
//! - `TransferTransport` - the external subsystem that moves bytes
//! - `LocationStorePort` - durable asset id → location token records
//! - `AssetEventEmitterPort` - outbound event delivery
//! - `AssetManagerPort` - the caller-facing manager API
//!
//! Implementations live in `medialoft-db` (storage) and
//! `medialoft-download` (queue, scheduler, state tracker, event bus).

pub mod asset;
pub mod errors;
pub mod events;
pub mod location;
pub mod paths;
pub mod ports;
pub mod queue;

// Re-export commonly used types for convenience
pub use asset::{Asset, AssetId, DownloadState};
pub use errors::{AssetError, AssetResult, RepositoryError, TransportError};
pub use events::AssetEvent;
pub use location::{ArtifactKind, LocationError, LocationToken, Resolution, StoredLocation};
pub use paths::{PathError, data_root, database_path};
pub use ports::{
    AssetEventEmitterPort, AssetManagerConfig, AssetManagerPort, InFlightTransfer,
    LocationStorePort, NoopAssetEmitter, TransferEvent, TransferEventKind, TransferHandle,
    TransferOutcome, TransferSink, TransferTransport,
};
pub use queue::QueueSnapshot;
