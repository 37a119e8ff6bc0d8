//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the asset engine expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` types in any signature
//! - The transfer transport is an external collaborator: the engine starts,
//!   cancels and enumerates transfers, and receives callbacks through a
//!   `TransferSink`, but never fetches bytes itself

pub mod asset_manager;
pub mod event_emitter;
pub mod location_store;
pub mod transport;

pub use asset_manager::{AssetManagerConfig, AssetManagerPort};
pub use event_emitter::{AssetEventEmitterPort, NoopAssetEmitter};
pub use location_store::LocationStorePort;
pub use transport::{
    InFlightTransfer, TransferEvent, TransferEventKind, TransferHandle, TransferOutcome,
    TransferSink, TransferTransport,
};
