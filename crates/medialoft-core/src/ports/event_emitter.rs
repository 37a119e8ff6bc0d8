//! Asset event emitter port.
//!
//! This port abstracts outbound event emission, allowing the asset manager
//! to forward events to a host (UI bridge, IPC, logging) without coupling to
//! transport details.

use crate::events::AssetEvent;

/// Port for emitting asset events to the host application.
///
/// Implementations handle the actual event delivery (channels, IPC, UI
/// bindings).
pub trait AssetEventEmitterPort: Send + Sync {
    /// Emit an asset event.
    ///
    /// Called from a dedicated blocking thread, one event at a time in
    /// publish order. A slow implementation delays only later deliveries to
    /// itself, never the engine.
    fn emit(&self, event: AssetEvent);

    /// Clone this emitter into a boxed trait object.
    ///
    /// This enables cloning of `Arc<dyn AssetEventEmitterPort>` without
    /// requiring the underlying type to implement Clone.
    fn clone_box(&self) -> Box<dyn AssetEventEmitterPort>;
}

/// A no-op asset event emitter for tests and headless contexts.
#[derive(Debug, Clone, Default)]
pub struct NoopAssetEmitter;

impl NoopAssetEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AssetEventEmitterPort for NoopAssetEmitter {
    fn emit(&self, _event: AssetEvent) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn AssetEventEmitterPort> {
        Box::new(self.clone())
    }
}
