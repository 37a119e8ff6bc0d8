//! Location store port definition.
//!
//! One durable record per asset id, mapping it to a `LocationToken`.
//!
//! # Design
//!
//! - Records are written only for completed downloads
//! - Absence of a record is never an error (first run, never downloaded)
//! - An undecodable record is reported per record, never as a failed call
//! - Resolution against the filesystem happens in the engine, not here

use async_trait::async_trait;

use crate::asset::AssetId;
use crate::errors::RepositoryError;
use crate::location::{LocationToken, StoredLocation};

/// Port for persisting asset locations across restarts.
///
/// This trait is implemented by `medialoft-db` and injected into the asset
/// manager.
#[async_trait]
pub trait LocationStorePort: Send + Sync {
    /// Record (or overwrite) the location token for an asset.
    async fn put(&self, asset_id: &AssetId, token: &LocationToken) -> Result<(), RepositoryError>;

    /// Load the record for an asset, if any.
    async fn token(&self, asset_id: &AssetId) -> Result<Option<StoredLocation>, RepositoryError>;

    /// Delete the record for an asset. Removing a missing record succeeds.
    async fn remove(&self, asset_id: &AssetId) -> Result<(), RepositoryError>;

    /// Load every record, ordered by asset id.
    async fn list(&self) -> Result<Vec<(AssetId, StoredLocation)>, RepositoryError>;
}
