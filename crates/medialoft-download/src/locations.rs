//! Persistent location store facade.
//!
//! Pairs a `LocationStorePort` with the configured downloads root so the
//! scheduler deals in plain paths while the store keeps resolvable tokens.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use medialoft_core::{
    AssetError, AssetId, AssetResult, LocationError, LocationStorePort, LocationToken, Resolution,
};

pub struct PersistentLocations {
    store: Arc<dyn LocationStorePort>,
    root: PathBuf,
}

impl PersistentLocations {
    pub fn new(store: Arc<dyn LocationStorePort>, root: PathBuf) -> Self {
        Self { store, root }
    }

    /// Durably record where an asset's artifact lives, replacing any prior
    /// record.
    pub async fn put(&self, id: &AssetId, location: &Path) -> AssetResult<()> {
        let token = LocationToken::capture(location, &self.root).map_err(|e| match e {
            LocationError::Missing(path) => AssetError::transfer_failed(format!(
                "reported location {} does not exist",
                path.display()
            )),
            other => AssetError::storage(other.to_string()),
        })?;
        self.store.put(id, &token).await?;
        Ok(())
    }

    /// Resolve the record for an asset. `None` when never recorded.
    pub async fn resolve(&self, id: &AssetId) -> AssetResult<Option<Resolution>> {
        let token = self.store.token(id).await?;
        Ok(token.map(|t| t.resolve(&self.root)))
    }

    /// Resolve the record for an asset to a currently valid path.
    ///
    /// Returns `None` if never recorded or no longer resolvable.
    pub async fn get(&self, id: &AssetId) -> AssetResult<Option<PathBuf>> {
        Ok(self.resolve(id).await?.and_then(Resolution::into_path))
    }

    /// Delete the record for an asset. Idempotent.
    pub async fn remove(&self, id: &AssetId) -> AssetResult<()> {
        self.store.remove(id).await?;
        Ok(())
    }

    /// Resolve every record.
    pub async fn entries(&self) -> AssetResult<Vec<(AssetId, Resolution)>> {
        let records = self.store.list().await?;
        Ok(records
            .into_iter()
            .map(|(id, token)| {
                let resolution = token.resolve(&self.root);
                (id, resolution)
            })
            .collect())
    }
}
