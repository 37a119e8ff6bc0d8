//! Asset identity and download state.
//!
//! Pure data types with no I/O dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable, caller-assigned identifier of a streamable asset.
///
/// The manager never mints ids; it only consumes the ones callers hand in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create an asset id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A streamable media resource (an HLS manifest and everything it references).
///
/// Immutable once constructed. Two assets are equal when their ids are equal,
/// regardless of the source locator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Asset {
    id: AssetId,
    source_locator: String,
}

impl Asset {
    /// Create a new asset from its id and manifest locator (URL/URI).
    pub fn new(id: impl Into<AssetId>, source_locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_locator: source_locator.into(),
        }
    }

    /// The stable asset id.
    #[must_use]
    pub const fn id(&self) -> &AssetId {
        &self.id
    }

    /// The manifest locator the transport fetches from.
    #[must_use]
    pub fn source_locator(&self) -> &str {
        &self.source_locator
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Asset {}

impl Hash for Asset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// UI-visible download state of an asset.
///
/// Queued and actively transferring jobs are both reported as `Downloading`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// No local copy and no job queued or running.
    #[default]
    NotDownloaded,
    /// A job is queued or transferring.
    Downloading,
    /// A resolvable local copy exists.
    Downloaded,
}

impl DownloadState {
    /// Convert to string representation for storage and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotDownloaded => "not_downloaded",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
        }
    }

    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "downloading" => Self::Downloading,
            "downloaded" => Self::Downloaded,
            // "not_downloaded" or unknown values default to NotDownloaded
            _ => Self::NotDownloaded,
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
