//! `SQLite` implementation of the `LocationStorePort` trait.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use medialoft_core::{AssetId, LocationStorePort, LocationToken, RepositoryError, StoredLocation};

/// `SQLite` implementation of the `LocationStorePort` trait.
///
/// Stores one row per asset id with the location token as a JSON blob.
/// A blob that no longer decodes is returned as `StoredLocation::Unreadable`
/// so one bad row never hides the others.
pub struct SqliteLocationRepository {
    pool: SqlitePool,
}

impl SqliteLocationRepository {
    /// Create a new `SQLite` location repository.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn decode(asset_id: &str, json: &str) -> StoredLocation {
    match LocationToken::from_json(json) {
        Ok(token) => StoredLocation::Token(token),
        Err(e) => {
            tracing::warn!(asset_id, error = %e, "Unreadable location record");
            StoredLocation::Unreadable {
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl LocationStorePort for SqliteLocationRepository {
    async fn put(&self, asset_id: &AssetId, token: &LocationToken) -> Result<(), RepositoryError> {
        let json = token
            .to_json()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO asset_locations (asset_id, token, recorded_at)
            VALUES (?, ?, ?)
            ON CONFLICT(asset_id) DO UPDATE SET
                token = excluded.token,
                recorded_at = excluded.recorded_at
            ",
        )
        .bind(asset_id.as_str())
        .bind(&json)
        .bind(token.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn token(&self, asset_id: &AssetId) -> Result<Option<StoredLocation>, RepositoryError> {
        let row = sqlx::query("SELECT token FROM asset_locations WHERE asset_id = ?")
            .bind(asset_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(row.map(|r| {
            let json: String = r.get("token");
            decode(asset_id.as_str(), &json)
        }))
    }

    async fn remove(&self, asset_id: &AssetId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM asset_locations WHERE asset_id = ?")
            .bind(asset_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<(AssetId, StoredLocation)>, RepositoryError> {
        let rows = sqlx::query("SELECT asset_id, token FROM asset_locations ORDER BY asset_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|r| {
                let id: String = r.get("asset_id");
                let json: String = r.get("token");
                let record = decode(&id, &json);
                (AssetId::new(id), record)
            })
            .collect())
    }
}
