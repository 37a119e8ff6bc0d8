//! Resolvable location references for downloaded artifacts.
//!
//! A `LocationToken` is what gets persisted per asset. It is not a raw path:
//! it remembers where the artifact sat relative to the downloads root as well
//! as its absolute path and kind at record time, so resolution keeps working
//! after the root directory is re-mounted or relocated, and a missing or
//! replaced artifact is detected as stale instead of being trusted.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape of a downloaded artifact on disk.
///
/// HLS downloads are usually directory bundles; single-file exports are files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A regular file.
    File,
    /// A directory bundle.
    Directory,
}

impl ArtifactKind {
    fn of(metadata: &std::fs::Metadata) -> Self {
        if metadata.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }
}

/// Errors raised while capturing or decoding a location token.
#[derive(Debug, Error)]
pub enum LocationError {
    /// Nothing exists at the location being recorded.
    #[error("No artifact at {0}")]
    Missing(PathBuf),

    /// The location could not be inspected.
    #[error("Cannot inspect {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// The persisted token could not be encoded or decoded.
    #[error("Invalid location token: {0}")]
    Encoding(String),
}

/// Durable, resolvable reference to a downloaded artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationToken {
    /// Path relative to the downloads root, when the artifact lived under it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<PathBuf>,
    /// Absolute path at record time.
    pub absolute_path: PathBuf,
    /// File or directory bundle.
    pub kind: ArtifactKind,
    /// When the token was captured.
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of resolving a token against the current environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The artifact exists at this path with the recorded kind.
    Valid(PathBuf),
    /// The artifact can no longer be found.
    Stale {
        /// Human-readable explanation.
        reason: String,
    },
}

impl Resolution {
    /// Get the resolved path, discarding staleness details.
    #[must_use]
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Valid(path) => Some(path),
            Self::Stale { .. } => None,
        }
    }

    /// Check if resolution failed.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// A location record as read back from the store.
///
/// A row whose token cannot be decoded is still a record: it resolves as
/// stale so it can be surfaced and removed like any other dead reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredLocation {
    /// A decodable token.
    Token(LocationToken),
    /// The record exists but its token is unreadable.
    Unreadable {
        /// Why decoding failed.
        reason: String,
    },
}

impl StoredLocation {
    /// Resolve the record against the current downloads root.
    pub fn resolve(&self, root: &Path) -> Resolution {
        match self {
            Self::Token(token) => token.resolve(root),
            Self::Unreadable { reason } => Resolution::Stale {
                reason: format!("unreadable location record: {reason}"),
            },
        }
    }
}

impl From<LocationToken> for StoredLocation {
    fn from(token: LocationToken) -> Self {
        Self::Token(token)
    }
}

impl LocationToken {
    /// Capture a token for an artifact that currently exists at `location`.
    ///
    /// `root` is the downloads directory; artifacts outside it are recorded
    /// by absolute path only.
    pub fn capture(location: &Path, root: &Path) -> Result<Self, LocationError> {
        let metadata = std::fs::metadata(location).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LocationError::Missing(location.to_path_buf())
            } else {
                LocationError::Io {
                    path: location.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        })?;

        let relative_path = location
            .strip_prefix(root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf);

        Ok(Self {
            relative_path,
            absolute_path: location.to_path_buf(),
            kind: ArtifactKind::of(&metadata),
            recorded_at: Utc::now(),
        })
    }

    /// Resolve the token to a currently valid path.
    ///
    /// The root-relative path under the *current* root wins over the recorded
    /// absolute path. A candidate only counts when it exists with the
    /// recorded kind.
    pub fn resolve(&self, root: &Path) -> Resolution {
        let candidates = self
            .relative_path
            .as_ref()
            .map(|rel| root.join(rel))
            .into_iter()
            .chain(std::iter::once(self.absolute_path.clone()));

        let mut tried = Vec::new();
        for candidate in candidates {
            match std::fs::metadata(&candidate) {
                Ok(meta) if ArtifactKind::of(&meta) == self.kind => {
                    return Resolution::Valid(candidate);
                }
                Ok(_) => tried.push(format!("{} (kind changed)", candidate.display())),
                Err(_) => tried.push(candidate.display().to_string()),
            }
        }

        Resolution::Stale {
            reason: format!("no {:?} artifact at {}", self.kind, tried.join(" or ")),
        }
    }

    /// Encode the token for storage.
    pub fn to_json(&self) -> Result<String, LocationError> {
        serde_json::to_string(self).map_err(|e| LocationError::Encoding(e.to_string()))
    }

    /// Decode a stored token.
    pub fn from_json(s: &str) -> Result<Self, LocationError> {
        serde_json::from_str(s).map_err(|e| LocationError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_missing_location() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.movpkg");

        let err = LocationToken::capture(&missing, dir.path()).unwrap_err();
        assert!(matches!(err, LocationError::Missing(p) if p == missing));
    }

    #[test]
    fn test_capture_records_relative_path_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("track-1.movpkg");
        std::fs::create_dir(&bundle).unwrap();

        let token = LocationToken::capture(&bundle, dir.path()).unwrap();
        assert_eq!(token.relative_path, Some(PathBuf::from("track-1.movpkg")));
        assert_eq!(token.kind, ArtifactKind::Directory);
        assert_eq!(token.resolve(dir.path()), Resolution::Valid(bundle));
    }

    #[test]
    fn test_resolve_survives_root_relocation() {
        let old_root = tempfile::tempdir().unwrap();
        let file = old_root.path().join("track-2.ts");
        std::fs::write(&file, b"segment").unwrap();
        let token = LocationToken::capture(&file, old_root.path()).unwrap();

        // Simulate the downloads root being moved somewhere else.
        let new_root = tempfile::tempdir().unwrap();
        std::fs::rename(&file, new_root.path().join("track-2.ts")).unwrap();

        assert_eq!(
            token.resolve(new_root.path()),
            Resolution::Valid(new_root.path().join("track-2.ts"))
        );
    }

    #[test]
    fn test_resolve_detects_stale_and_kind_change() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("track-3");
        std::fs::write(&file, b"x").unwrap();
        let token = LocationToken::capture(&file, dir.path()).unwrap();

        std::fs::remove_file(&file).unwrap();
        assert!(token.resolve(dir.path()).is_stale());

        // Same name, different kind: not the artifact we recorded.
        std::fs::create_dir(&file).unwrap();
        let resolution = token.resolve(dir.path());
        assert!(resolution.is_stale());
        assert!(resolution.into_path().is_none());
    }

    #[test]
    fn test_outside_root_uses_absolute_path() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let file = elsewhere.path().join("export.mp4");
        std::fs::write(&file, b"x").unwrap();

        let token = LocationToken::capture(&file, root.path()).unwrap();
        assert!(token.relative_path.is_none());
        assert_eq!(token.resolve(root.path()), Resolution::Valid(file));
    }

    #[test]
    fn test_json_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a");
        std::fs::write(&file, b"x").unwrap();
        let token = LocationToken::capture(&file, dir.path()).unwrap();

        let decoded = LocationToken::from_json(&token.to_json().unwrap()).unwrap();
        assert_eq!(decoded, token);
        assert!(matches!(
            LocationToken::from_json("{not json"),
            Err(LocationError::Encoding(_))
        ));
    }

    #[test]
    fn test_unreadable_record_resolves_stale() {
        let dir = tempfile::tempdir().unwrap();
        let record = StoredLocation::Unreadable {
            reason: "key must be a string".into(),
        };

        match record.resolve(dir.path()) {
            Resolution::Stale { reason } => assert!(reason.contains("key must be a string")),
            Resolution::Valid(path) => panic!("resolved to {}", path.display()),
        }
    }
}
